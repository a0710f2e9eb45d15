// SPDX-License-Identifier: MPL-2.0

//! In-memory playlist: an ordered set of wallpapers, a cursor and the
//! play/shuffle mode that drives automatic advancing.

use std::collections::{BTreeMap, VecDeque};

use lwe_session_config::{WallpaperId, state::Snapshot};
use rand::{SeedableRng, rngs::StdRng, seq::IndexedRandom};
use tracing::debug;

/// Random picks that are skipped when choosing the next shuffled wallpaper.
const SHUFFLE_AVOID: usize = 5;
/// Random picks remembered at most.
const SHUFFLE_HISTORY: usize = 10;

#[derive(Debug)]
pub struct PlaylistEngine {
    sequence: Vec<WallpaperId>,
    cursor: usize,
    is_playing: bool,
    is_random: bool,
    timer_interval: u64,
    custom_timer_text: Option<String>,
    shuffle_history: VecDeque<WallpaperId>,
    playlists: BTreeMap<String, Vec<WallpaperId>>,
    rng: StdRng,
}

impl Default for PlaylistEngine {
    fn default() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }
}

impl PlaylistEngine {
    pub fn with_rng(rng: StdRng) -> Self {
        let defaults = Snapshot::default();
        Self {
            sequence: Vec::new(),
            cursor: 0,
            is_playing: false,
            is_random: false,
            timer_interval: defaults.timer_interval,
            custom_timer_text: None,
            shuffle_history: VecDeque::with_capacity(SHUFFLE_HISTORY),
            playlists: BTreeMap::new(),
            rng,
        }
    }

    /// Replaces the in-memory state with what was persisted.
    ///
    /// Duplicate entries are dropped and an out of range cursor is reset,
    /// since the file may have been edited by hand.
    pub fn load_from(&mut self, snapshot: &Snapshot) {
        self.sequence = dedup(&snapshot.current_playlist);
        self.cursor = snapshot.current_index;
        self.is_playing = snapshot.is_playing;
        self.is_random = snapshot.is_random;
        self.timer_interval = snapshot.timer_interval.max(1);
        self.custom_timer_text = snapshot.custom_timer_text.clone();
        self.playlists = snapshot.playlists.clone();
        self.shuffle_history.clear();

        if self.cursor >= self.sequence.len() {
            if !self.sequence.is_empty() {
                debug!(
                    cursor = self.cursor,
                    len = self.sequence.len(),
                    "persisted cursor out of range, resetting"
                );
            }
            self.cursor = 0;
        }
        self.normalize();
    }

    /// Copies the playlist part of the state into `snapshot`.
    pub fn write_to(&self, snapshot: &mut Snapshot) {
        snapshot.current_playlist = self.sequence.clone();
        snapshot.current_index = self.cursor;
        snapshot.is_playing = self.is_playing;
        snapshot.is_random = self.is_random;
        snapshot.timer_interval = self.timer_interval;
        snapshot.custom_timer_text = self.custom_timer_text.clone();
        snapshot.playlists = self.playlists.clone();
    }

    pub fn sequence(&self) -> &[WallpaperId] {
        &self.sequence
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_random(&self) -> bool {
        self.is_random
    }

    pub fn timer_interval(&self) -> u64 {
        self.timer_interval
    }

    pub fn custom_timer_text(&self) -> Option<&str> {
        self.custom_timer_text.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Wallpaper under the cursor.
    pub fn current(&self) -> Option<&WallpaperId> {
        self.sequence.get(self.cursor)
    }

    pub fn index_of(&self, id: &WallpaperId) -> Option<usize> {
        self.sequence.iter().position(|entry| entry == id)
    }

    pub fn contains(&self, id: &WallpaperId) -> bool {
        self.index_of(id).is_some()
    }

    /// Appends `id` unless it is already part of the playlist.
    pub fn add(&mut self, id: WallpaperId) -> bool {
        if self.contains(&id) {
            debug!(wallpaper = %id, "already in playlist");
            return false;
        }
        self.sequence.push(id);
        true
    }

    pub fn remove_at(&mut self, index: usize) -> Option<WallpaperId> {
        if index >= self.sequence.len() {
            return None;
        }

        let removed = self.sequence.remove(index);
        if index <= self.cursor && self.cursor > 0 {
            self.cursor -= 1;
        }
        if self.cursor >= self.sequence.len() {
            self.cursor = 0;
        }
        self.shuffle_history.retain(|picked| picked != &removed);
        self.normalize();
        Some(removed)
    }

    pub fn remove(&mut self, id: &WallpaperId) -> bool {
        self.index_of(id)
            .and_then(|index| self.remove_at(index))
            .is_some()
    }

    /// Moves the cursor to the next wallpaper, sequentially or shuffled.
    pub fn advance(&mut self, random: bool) -> Option<WallpaperId> {
        if self.sequence.is_empty() {
            return None;
        }

        if random {
            self.cursor = self.pick_random();
        } else {
            self.cursor = (self.cursor + 1) % self.sequence.len();
        }
        self.current().cloned()
    }

    /// Moves the cursor back by one. Does nothing in shuffle mode.
    pub fn retreat(&mut self) -> Option<WallpaperId> {
        if self.sequence.is_empty() || self.is_random {
            return None;
        }

        let len = self.sequence.len();
        self.cursor = (self.cursor + len - 1) % len;
        self.current().cloned()
    }

    /// Starts playback on the next wallpaper, or stops it if already playing.
    ///
    /// Returns the wallpaper to show when playback starts.
    pub fn toggle_play(&mut self, random: bool) -> Option<WallpaperId> {
        if self.is_playing {
            self.stop();
            return None;
        }
        if self.sequence.is_empty() {
            return None;
        }

        self.is_random = random;
        self.is_playing = true;
        self.advance(random)
    }

    pub fn stop(&mut self) {
        self.is_playing = false;
    }

    /// Points the cursor at `index` if it is in range.
    pub fn seek(&mut self, index: usize) -> bool {
        if index >= self.sequence.len() {
            return false;
        }
        self.cursor = index;
        true
    }

    pub fn clear(&mut self) {
        self.sequence.clear();
        self.cursor = 0;
        self.shuffle_history.clear();
        self.is_playing = false;
    }

    pub fn set_random(&mut self, random: bool) {
        self.is_random = random;
    }

    pub fn set_timer_interval(&mut self, secs: u64) {
        self.timer_interval = secs.max(1);
    }

    pub fn set_custom_timer(&mut self, secs: u64, label: impl Into<String>) {
        self.set_timer_interval(secs);
        self.custom_timer_text = Some(label.into());
    }

    pub fn clear_custom_timer(&mut self) {
        self.custom_timer_text = None;
    }

    /// Stores a copy of the current sequence under `name`.
    pub fn save_playlist(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.sequence.is_empty() {
            return false;
        }
        self.playlists
            .insert(name.to_owned(), self.sequence.clone());
        true
    }

    pub fn delete_playlist(&mut self, name: &str) -> bool {
        self.playlists.remove(name).is_some()
    }

    /// Replaces the current sequence with a saved playlist.
    pub fn load_playlist(&mut self, name: &str) -> bool {
        let Some(saved) = self.playlists.get(name) else {
            return false;
        };

        self.sequence = dedup(saved);
        self.cursor = 0;
        self.shuffle_history.clear();
        self.normalize();
        true
    }

    pub fn playlist_names(&self) -> impl Iterator<Item = &str> {
        self.playlists.keys().map(String::as_str)
    }

    fn pick_random(&mut self) -> usize {
        let recent: Vec<&WallpaperId> = self
            .shuffle_history
            .iter()
            .rev()
            .take(SHUFFLE_AVOID)
            .collect();

        let mut candidates: Vec<usize> = (0..self.sequence.len())
            .filter(|&index| !recent.contains(&&self.sequence[index]))
            .collect();

        if candidates.is_empty() {
            self.shuffle_history.clear();
            candidates = (0..self.sequence.len()).collect();
        }

        let index = candidates
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(self.cursor);

        self.shuffle_history.push_back(self.sequence[index].clone());
        while self.shuffle_history.len() > SHUFFLE_HISTORY {
            self.shuffle_history.pop_front();
        }
        index
    }

    fn normalize(&mut self) {
        if self.sequence.is_empty() {
            self.cursor = 0;
            self.is_playing = false;
        }
    }
}

fn dedup(ids: &[WallpaperId]) -> Vec<WallpaperId> {
    let mut out: Vec<WallpaperId> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(id.clone());
        }
    }
    out
}
