// SPDX-License-Identifier: MPL-2.0

//! Playlist and session daemon for animated wallpapers.
//!
//! The renderer runs as a detached process. This crate decides what should be
//! showing, starts it, remembers it across restarts and, on startup,
//! reconciles what it remembers with what is actually running.

pub mod content_source;
pub mod launcher;
pub mod lock;
pub mod playlist;
pub mod probe;
pub mod reconcile;
pub mod session;
pub mod store;

use std::time::Duration;

use calloop::{
    LoopHandle, RegistrationToken,
    signals::{Signal, Signals},
    timer::{TimeoutAction, Timer},
};
use lwe_session_config::{Preset, WallpaperId};
use notify::RecommendedWatcher;
use tracing::{debug, warn};

pub use crate::session::Session;

/// A user action, from a signal or any other control surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Next,
    Previous,
    TogglePlay,
    Select(WallpaperId),
    Add(WallpaperId),
    Remove(WallpaperId),
    RemoveAt(usize),
    ClearPlaylist,
    SetRandom(bool),
    /// seconds between automatic advances
    SetInterval(u64),
    SetCustomTimer { secs: u64, label: String },
    ClearCustomTimer,
    SavePlaylist(String),
    LoadPlaylist(String),
    DeletePlaylist(String),
    SetVolume(u8),
    SetFps(u16),
    ToggleAutoMute,
    ToggleAudioProcessing,
    ToggleMouse,
    ToggleSilent,
    ApplyPreset(Preset),
    Quit,
}

/// Event loop state: the session plus the sources driving it.
pub struct App {
    pub session: Session,
    loop_handle: LoopHandle<'static, App>,
    advance_timer: Option<RegistrationToken>,
    _watcher: Option<RecommendedWatcher>,
    exit: bool,
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(token) = self.advance_timer.take() {
            self.loop_handle.remove(token);
        }
    }
}

impl App {
    /// Wraps `session` and starts watching its content root.
    pub fn new(session: Session, loop_handle: LoopHandle<'static, App>) -> Self {
        let watcher = content_source::content_source(&loop_handle, session.content_root());
        Self {
            session,
            loop_handle,
            advance_timer: None,
            _watcher: watcher,
            exit: false,
        }
    }

    pub fn exit_requested(&self) -> bool {
        self.exit
    }

    /// Reconciles the session with the running system after `delay`.
    pub fn schedule_reconcile(&self, delay: Duration) -> eyre::Result<()> {
        self.loop_handle
            .insert_source(Timer::from_duration(delay), |_, _, app: &mut App| {
                let span = tracing::debug_span!("App::reconcile");
                let _handle = span.enter();

                app.session.reconcile_on_startup();
                app.sync_timer(true);
                TimeoutAction::Drop
            })
            .map(|_| {})
            .map_err(|err| eyre::eyre!("{}", err))
    }

    /// SIGINT and SIGTERM quit, SIGUSR1 skips ahead, SIGUSR2 toggles playback.
    pub fn watch_signals(&self) -> eyre::Result<()> {
        let signals = Signals::new(&[
            Signal::SIGINT,
            Signal::SIGTERM,
            Signal::SIGUSR1,
            Signal::SIGUSR2,
        ])?;

        self.loop_handle
            .insert_source(signals, |event, _, app: &mut App| {
                let request = match event.signal() {
                    Signal::SIGUSR1 => Request::Next,
                    Signal::SIGUSR2 => Request::TogglePlay,
                    _ => Request::Quit,
                };
                app.handle(request);
            })
            .map(|_| {})
            .map_err(|err| eyre::eyre!("{}", err))
    }

    pub fn handle(&mut self, request: Request) {
        debug!(?request, "handling request");

        let restart_timer = match request {
            Request::Next => {
                let random = self.session.playlist().is_random();
                self.session.advance(random);
                true
            }
            Request::Previous => {
                self.session.retreat();
                true
            }
            Request::TogglePlay => {
                let random = self.session.playlist().is_random();
                self.session.toggle_play(random);
                true
            }
            Request::Select(id) => {
                self.session.select(&id);
                false
            }
            Request::Add(id) => {
                self.session.add(id);
                false
            }
            Request::Remove(id) => {
                self.session.remove(&id);
                false
            }
            Request::RemoveAt(index) => {
                self.session.remove_at(index);
                false
            }
            Request::ClearPlaylist => {
                self.session.clear_playlist();
                false
            }
            Request::SetRandom(random) => {
                self.session.set_random(random);
                false
            }
            Request::SetInterval(secs) => {
                self.session.set_timer_interval(secs);
                true
            }
            Request::SetCustomTimer { secs, label } => {
                self.session.set_custom_timer(secs, &label);
                true
            }
            Request::ClearCustomTimer => {
                self.session.clear_custom_timer();
                false
            }
            Request::SavePlaylist(name) => {
                self.session.save_playlist(&name);
                false
            }
            Request::LoadPlaylist(name) => {
                self.session.load_playlist(&name);
                false
            }
            Request::DeletePlaylist(name) => {
                self.session.delete_playlist(&name);
                false
            }
            Request::SetVolume(volume) => {
                self.session.set_volume(volume);
                false
            }
            Request::SetFps(fps) => {
                self.session.set_fps(fps);
                false
            }
            Request::ToggleAutoMute => {
                self.session.toggle_auto_mute();
                false
            }
            Request::ToggleAudioProcessing => {
                self.session.toggle_audio_processing();
                false
            }
            Request::ToggleMouse => {
                self.session.toggle_mouse();
                false
            }
            Request::ToggleSilent => {
                self.session.toggle_silent();
                false
            }
            Request::ApplyPreset(preset) => {
                self.session.apply_preset(preset);
                false
            }
            Request::Quit => {
                self.exit = true;
                false
            }
        };

        self.sync_timer(restart_timer);
    }

    /// Keeps the auto-advance timer registered exactly while the playlist plays.
    fn sync_timer(&mut self, restart: bool) {
        let playing = self.session.is_playlist_active();
        if !playing || restart {
            if let Some(token) = self.advance_timer.take() {
                self.loop_handle.remove(token);
            }
        }

        if playing && self.advance_timer.is_none() {
            self.register_timer();
        }
    }

    fn register_timer(&mut self) {
        let interval = Duration::from_secs(self.session.playlist().timer_interval());
        self.advance_timer = self
            .loop_handle
            .insert_source(Timer::from_duration(interval), |_, _, app: &mut App| {
                let span = tracing::debug_span!("App::advance_timer");
                let _handle = span.enter();

                app.session.reap_children();

                if !app.session.is_playlist_active() {
                    app.advance_timer = None;
                    return TimeoutAction::Drop;
                }

                let random = app.session.playlist().is_random();
                if app.session.advance(random).is_none() {
                    warn!("automatic advance showed no wallpaper");
                }

                TimeoutAction::ToDuration(Duration::from_secs(
                    app.session.playlist().timer_interval(),
                ))
            })
            .ok();
    }
}
