// SPDX-License-Identifier: MPL-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{RenderSettings, WallpaperId};

/// Seconds between automatic playlist advances when nothing was configured.
pub const DEFAULT_TIMER_INTERVAL: u64 = 60;
/// Number of previously shown wallpapers that are remembered.
pub const RECENT_LIMIT: usize = 20;

/// The last wallpaper this application launched and how.
#[derive(Default, Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct WallpaperState {
    pub current_wallpaper: Option<WallpaperId>,
    pub last_settings: RenderSettings,
}

/// Everything that survives a restart, written as one JSON document.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
#[must_use]
pub struct Snapshot {
    pub current_playlist: Vec<WallpaperId>,
    pub current_index: usize,
    pub is_playing: bool,
    pub is_random: bool,
    /// seconds between automatic advances
    pub timer_interval: u64,
    /// label shown for a user-defined interval
    pub custom_timer_text: Option<String>,
    /// previously shown wallpapers, most recent last
    pub recent: Vec<WallpaperId>,
    /// saved playlists by name
    pub playlists: BTreeMap<String, Vec<WallpaperId>>,
    pub wallpaper_state: WallpaperState,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            current_playlist: Vec::new(),
            current_index: 0,
            is_playing: false,
            is_random: false,
            timer_interval: DEFAULT_TIMER_INTERVAL,
            custom_timer_text: None,
            recent: Vec::new(),
            playlists: BTreeMap::new(),
            wallpaper_state: WallpaperState::default(),
        }
    }
}

impl Snapshot {
    /// Starts from defaults but with the given render settings.
    pub fn with_settings(settings: RenderSettings) -> Self {
        Self {
            wallpaper_state: WallpaperState {
                current_wallpaper: None,
                last_settings: settings,
            },
            ..Self::default()
        }
    }

    /// Moves `id` to the most recent end of the recency list.
    pub fn record_recent(&mut self, id: &WallpaperId) {
        self.recent.retain(|recent| recent != id);
        self.recent.push(id.clone());
        if self.recent.len() > RECENT_LIMIT {
            let excess = self.recent.len() - RECENT_LIMIT;
            self.recent.drain(..excess);
        }
    }

    #[must_use]
    pub fn current_wallpaper(&self) -> Option<&WallpaperId> {
        self.wallpaper_state.current_wallpaper.as_ref()
    }
}
