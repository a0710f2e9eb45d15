// SPDX-License-Identifier: MPL-2.0

//! The wallpaper session: one playlist, one saved snapshot, and the probes
//! and launcher that connect them to the running system.
//!
//! Every mutating operation updates the in-memory state first and then
//! rewrites the snapshot. Failures are logged where they happen and reported
//! to callers as `false` or `None`.

use lwe_session_config::{Config, Preset, RenderSettings, WallpaperId};
use tracing::{debug, error, info};

use crate::{
    launcher::Launcher,
    playlist::PlaylistEngine,
    probe::ProcessQuery,
    reconcile::{Reconciler, Reconciliation},
    store::Store,
};

/// Volume restored when leaving silent mode.
const UNMUTED_VOLUME: u8 = 50;

pub struct Session {
    store: Store,
    playlist: PlaylistEngine,
    query: ProcessQuery,
    launcher: Launcher,
    reconciler: Reconciler,
}

impl Session {
    pub fn new(
        store: Store,
        mut playlist: PlaylistEngine,
        query: ProcessQuery,
        launcher: Launcher,
    ) -> Self {
        playlist.load_from(store.snapshot());
        Self {
            store,
            playlist,
            query,
            launcher,
            reconciler: Reconciler::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let store = Store::load(config.state_file(), config.default_settings.clone());
        debug!(path = %store.path().display(), "session state loaded");
        Self::new(
            store,
            PlaylistEngine::default(),
            ProcessQuery::from_config(config),
            Launcher::from_config(config),
        )
    }

    pub fn reconcile_on_startup(&mut self) -> Reconciliation {
        self.reconciler
            .reconcile(&mut self.store, &mut self.playlist, &mut self.query)
    }

    /// The wallpaper known to be showing.
    ///
    /// Nothing is reported before startup reconciliation has confirmed it.
    pub fn current_wallpaper(&self) -> Option<&WallpaperId> {
        if !self.reconciler.is_reconciled() {
            return None;
        }
        self.store.current_wallpaper()
    }

    pub fn is_playlist_active(&self) -> bool {
        self.playlist.is_playing()
    }

    pub fn playlist(&self) -> &PlaylistEngine {
        &self.playlist
    }

    pub fn settings(&self) -> &RenderSettings {
        self.store.settings()
    }

    pub fn recent(&self) -> &[WallpaperId] {
        &self.store.snapshot().recent
    }

    pub fn content_root(&self) -> &std::path::Path {
        self.launcher.content_root()
    }

    /// Shows the next playlist entry.
    pub fn advance(&mut self, random: bool) -> Option<WallpaperId> {
        let next = self.playlist.advance(random);
        self.show_entry(next)
    }

    /// Shows the previous playlist entry. Does nothing while shuffling.
    pub fn retreat(&mut self) -> Option<WallpaperId> {
        let previous = self.playlist.retreat();
        self.show_entry(previous)
    }

    /// Starts the playlist on its next entry, or stops it.
    pub fn toggle_play(&mut self, random: bool) -> Option<WallpaperId> {
        if self.playlist.is_empty() && !self.playlist.is_playing() {
            debug!("nothing to play");
            return None;
        }

        let first = self.playlist.toggle_play(random);
        self.show_entry(first)
    }

    /// Shows `id` outside playlist control, keeping the current settings.
    pub fn select(&mut self, id: &WallpaperId) -> bool {
        let settings = self.store.settings().clone();
        let shown = self.show(id, settings);
        if shown {
            if let Some(index) = self.playlist.index_of(id) {
                self.playlist.seek(index);
            }
        }
        self.persist();
        shown
    }

    pub fn add(&mut self, id: WallpaperId) -> bool {
        let added = self.playlist.add(id);
        if added {
            self.persist();
        }
        added
    }

    pub fn remove(&mut self, id: &WallpaperId) -> bool {
        let removed = self.playlist.remove(id);
        if removed {
            self.persist();
        }
        removed
    }

    pub fn remove_at(&mut self, index: usize) -> Option<WallpaperId> {
        let removed = self.playlist.remove_at(index);
        if removed.is_some() {
            self.persist();
        }
        removed
    }

    pub fn clear_playlist(&mut self) {
        self.playlist.clear();
        self.persist();
    }

    pub fn set_random(&mut self, random: bool) {
        self.playlist.set_random(random);
        self.persist();
    }

    pub fn save_playlist(&mut self, name: &str) -> bool {
        self.persist_if(|playlist| playlist.save_playlist(name))
    }

    pub fn delete_playlist(&mut self, name: &str) -> bool {
        self.persist_if(|playlist| playlist.delete_playlist(name))
    }

    pub fn load_playlist(&mut self, name: &str) -> bool {
        self.persist_if(|playlist| playlist.load_playlist(name))
    }

    pub fn set_timer_interval(&mut self, secs: u64) {
        self.playlist.set_timer_interval(secs);
        self.playlist.clear_custom_timer();
        self.persist();
    }

    pub fn set_custom_timer(&mut self, secs: u64, label: &str) {
        self.playlist.set_custom_timer(secs, label);
        self.persist();
    }

    pub fn clear_custom_timer(&mut self) {
        self.playlist.clear_custom_timer();
        self.persist();
    }

    pub fn set_volume(&mut self, volume: u8) -> bool {
        self.adjust(|settings| settings.volume = volume)
    }

    pub fn set_fps(&mut self, fps: u16) -> bool {
        self.adjust(|settings| settings.fps = fps)
    }

    pub fn toggle_auto_mute(&mut self) -> bool {
        self.adjust(|settings| settings.noautomute = !settings.noautomute)
    }

    pub fn toggle_audio_processing(&mut self) -> bool {
        self.adjust(|settings| settings.no_audio_processing = !settings.no_audio_processing)
    }

    pub fn toggle_mouse(&mut self) -> bool {
        self.adjust(|settings| settings.disable_mouse = !settings.disable_mouse)
    }

    pub fn apply_preset(&mut self, preset: Preset) -> bool {
        self.adjust(|settings| *settings = preset.apply(settings.clone()))
    }

    /// Relaunches the current wallpaper muted, or unmuted if it already is.
    pub fn toggle_silent(&mut self) -> bool {
        let settings = self.store.settings().clone();
        let volume = if settings.is_silent() { UNMUTED_VOLUME } else { 0 };
        self.restart_with_settings(settings.volume(volume))
    }

    /// Relaunches the current wallpaper with `settings`.
    pub fn restart_with_settings(&mut self, settings: RenderSettings) -> bool {
        let Some(current) = self.current_wallpaper().cloned() else {
            debug!("no wallpaper to restart");
            return false;
        };

        let shown = self.show(&current, settings.clamped());
        self.persist();
        shown
    }

    /// Changes settings of the running wallpaper without relaunching it.
    ///
    /// The renderer has no control channel, so the change applies on the
    /// next launch.
    fn adjust(&mut self, change: impl FnOnce(&mut RenderSettings)) -> bool {
        if self.current_wallpaper().is_none() {
            debug!("no running wallpaper to adjust");
            return false;
        }

        let settings = self.store.settings_mut();
        change(settings);
        *settings = settings.clone().clamped();
        self.persist();
        true
    }

    /// Launches `id` and records it as the current wallpaper.
    fn show(&mut self, id: &WallpaperId, settings: RenderSettings) -> bool {
        match self.launcher.launch(id, &settings, &mut self.query) {
            Ok(pid) => {
                debug!(wallpaper = %id, pid, "now showing");
                self.store.set_current_wallpaper(Some(id.clone()));
                *self.store.settings_mut() = settings;
                self.store.record_recent(id);
                true
            }
            Err(err) => {
                error!(wallpaper = %id, "{err}");
                false
            }
        }
    }

    /// Shows a playlist entry picked by the engine and persists the new position.
    fn show_entry(&mut self, entry: Option<WallpaperId>) -> Option<WallpaperId> {
        let settings = self.store.settings().clone();
        let shown = entry.filter(|id| self.show(id, settings));
        self.persist();
        shown
    }

    fn persist_if(&mut self, change: impl FnOnce(&mut PlaylistEngine) -> bool) -> bool {
        let changed = change(&mut self.playlist);
        if changed {
            self.persist();
        }
        changed
    }

    fn persist(&mut self) {
        self.store.persist(&self.playlist);
    }

    /// Collects wallpaper processes that have exited since the last launch.
    pub fn reap_children(&mut self) -> usize {
        self.launcher.reap()
    }

    /// Forgets a wallpaper whose asset directory disappeared.
    pub fn forget(&mut self, id: &WallpaperId) {
        if self.remove(id) {
            info!(wallpaper = %id, "removed deleted wallpaper from the playlist");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use rand::{SeedableRng, rngs::StdRng};
    use tempfile::TempDir;

    use super::*;
    use crate::probe::fake::FakeWorld;

    fn id(s: &str) -> WallpaperId {
        WallpaperId::new(s).unwrap()
    }

    struct Fixture {
        dir: TempDir,
        world: FakeWorld,
        session: Session,
    }

    /// A session whose content root holds a scene for each of `scenes` and
    /// whose renderer is `true`, so launches succeed without showing anything.
    fn fixture(scenes: &[&str], renderer: &str) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("content");
        for scene in scenes {
            fs::create_dir_all(root.join(scene)).unwrap();
            fs::write(root.join(scene).join("project.json"), "{}").unwrap();
        }

        let world = FakeWorld::new();
        let session = Session::new(
            Store::load(dir.path().join("state.json"), RenderSettings::default()),
            PlaylistEngine::with_rng(StdRng::seed_from_u64(9)),
            world.query(),
            Launcher::new(renderer, "mpvpaper", "", root),
        );
        Fixture {
            dir,
            world,
            session,
        }
    }

    fn saved(dir: &Path) -> lwe_session_config::state::Snapshot {
        Store::load(dir.join("state.json"), RenderSettings::default())
            .snapshot()
            .clone()
    }

    #[test]
    fn toggle_play_on_empty_playlist_is_a_no_op() {
        let mut f = fixture(&[], "true");
        f.session.reconcile_on_startup();
        assert_eq!(f.session.toggle_play(false), None);
        assert!(!f.session.is_playlist_active());
    }

    #[test]
    fn toggle_play_starts_and_stops() {
        let mut f = fixture(&["42"], "true");
        f.session.reconcile_on_startup();
        assert!(f.session.add(id("42")));

        assert_eq!(f.session.toggle_play(false), Some(id("42")));
        assert!(f.session.is_playlist_active());
        assert_eq!(f.session.current_wallpaper(), Some(&id("42")));

        assert_eq!(f.session.toggle_play(false), None);
        assert!(!f.session.is_playlist_active());
        assert_eq!(f.session.playlist().cursor(), 0);

        let saved = saved(f.dir.path());
        assert!(!saved.is_playing);
        assert_eq!(saved.current_index, 0);
    }

    #[test]
    fn advance_launches_and_persists() {
        let mut f = fixture(&["1", "2", "3"], "true");
        f.world.spawn_renderer(600, "1");
        f.session.reconcile_on_startup();
        for s in ["1", "2", "3"] {
            f.session.add(id(s));
        }

        assert_eq!(f.session.advance(false), Some(id("2")));
        assert_eq!(f.session.retreat(), Some(id("1")));
        assert_eq!(f.world.terminated(), vec![600]);

        let saved = saved(f.dir.path());
        assert_eq!(saved.current_index, 0);
        assert_eq!(saved.current_wallpaper(), Some(&id("1")));
        assert_eq!(saved.recent, vec![id("2"), id("1")]);
        assert_eq!(f.session.recent(), saved.recent.as_slice());
    }

    #[test]
    fn failed_launch_reports_nothing() {
        let mut f = fixture(&["1"], "/nonexistent/linux-wallpaperengine");
        f.session.reconcile_on_startup();
        f.session.add(id("1"));
        f.session.add(id("2"));

        assert_eq!(f.session.advance(false), None);
        assert!(!f.session.select(&id("1")));
        assert_eq!(f.session.current_wallpaper(), None);
    }

    #[test]
    fn current_wallpaper_needs_reconciliation() {
        let mut f = fixture(&["5"], "true");
        f.session.add(id("5"));
        f.session.select(&id("5"));
        assert_eq!(f.session.current_wallpaper(), None);

        f.world.spawn_renderer(10, "5");
        f.session.reconcile_on_startup();
        assert_eq!(f.session.current_wallpaper(), Some(&id("5")));
    }

    #[test]
    fn dynamic_controls_need_a_running_wallpaper() {
        let mut f = fixture(&["7"], "true");
        f.session.reconcile_on_startup();
        assert!(!f.session.set_volume(10));
        assert!(!f.session.toggle_silent());

        assert!(f.session.select(&id("7")));
        assert!(f.session.set_volume(250));
        assert_eq!(f.session.settings().volume, 100);
        assert!(f.session.set_fps(5));
        assert_eq!(f.session.settings().fps, 10);
        assert!(f.session.toggle_mouse());
        assert!(f.session.settings().disable_mouse);

        assert!(f.session.apply_preset(Preset::Gaming));
        assert_eq!((f.session.settings().volume, f.session.settings().fps), (20, 144));
        assert!(f.session.settings().disable_mouse);

        assert!(f.session.toggle_silent());
        assert!(f.session.settings().is_silent());
        assert!(f.session.toggle_silent());
        assert_eq!(f.session.settings().volume, UNMUTED_VOLUME);

        let saved = saved(f.dir.path());
        assert_eq!(saved.wallpaper_state.last_settings.volume, UNMUTED_VOLUME);
    }

    #[test]
    fn playlist_edits_are_persisted() {
        let mut f = fixture(&[], "true");
        f.session.reconcile_on_startup();
        assert!(f.session.add(id("1")));
        assert!(!f.session.add(id("1")));
        assert!(f.session.add(id("2")));
        assert!(f.session.save_playlist("both"));
        assert!(f.session.remove(&id("1")));
        f.session.set_custom_timer(120, "2 minutes");

        let saved = saved(f.dir.path());
        assert_eq!(saved.current_playlist, vec![id("2")]);
        assert_eq!(saved.playlists["both"], vec![id("1"), id("2")]);
        assert_eq!(saved.timer_interval, 120);
        assert_eq!(saved.custom_timer_text.as_deref(), Some("2 minutes"));

        assert!(f.session.load_playlist("both"));
        assert_eq!(f.session.playlist().sequence(), &[id("1"), id("2")]);
        f.session.forget(&id("2"));
        f.session.clear_playlist();
        assert!(saved_is_empty(f.dir.path()));
    }

    fn saved_is_empty(dir: &Path) -> bool {
        saved(dir).current_playlist.is_empty()
    }
}
