// SPDX-License-Identifier: MPL-2.0

use std::ops::RangeInclusive;

use derive_setters::Setters;
use serde::{Deserialize, Serialize};

/// Volume accepted by the renderer, in percent.
pub const VOLUME_RANGE: RangeInclusive<u8> = 0..=100;
/// Frame rates accepted by the renderer.
pub const FPS_RANGE: RangeInclusive<u16> = 10..=144;

/// Parameters the renderer is started with.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Setters)]
#[serde(default)]
#[must_use]
pub struct RenderSettings {
    /// output the wallpaper is drawn on
    #[setters(into)]
    pub screen: String,
    /// audio volume in percent
    pub volume: u8,
    /// frame rate cap
    pub fps: u16,
    /// keep playing audio when other applications play sound
    pub noautomute: bool,
    /// disable audio reactive effects
    pub no_audio_processing: bool,
    /// ignore mouse input
    pub disable_mouse: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            screen: String::from("eDP-1"),
            volume: 50,
            fps: 60,
            noautomute: false,
            no_audio_processing: false,
            disable_mouse: false,
        }
    }
}

impl RenderSettings {
    /// Pins volume and fps into the ranges the renderer accepts.
    pub fn clamped(mut self) -> Self {
        self.volume = self.volume.clamp(*VOLUME_RANGE.start(), *VOLUME_RANGE.end());
        self.fps = self.fps.clamp(*FPS_RANGE.start(), *FPS_RANGE.end());
        self
    }

    #[must_use]
    pub fn is_silent(&self) -> bool {
        self.volume == 0
    }
}

/// Named bundles of volume and frame rate.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Performance,
    Quality,
    Silent,
    Gaming,
}

impl Preset {
    #[must_use]
    pub fn volume(self) -> u8 {
        match self {
            Preset::Performance => 30,
            Preset::Quality => 70,
            Preset::Silent => 0,
            Preset::Gaming => 20,
        }
    }

    #[must_use]
    pub fn fps(self) -> u16 {
        match self {
            Preset::Performance | Preset::Silent => 30,
            Preset::Quality => 60,
            Preset::Gaming => 144,
        }
    }

    /// Applies the preset on top of `settings`, leaving screen and toggles alone.
    pub fn apply(self, settings: RenderSettings) -> RenderSettings {
        settings.volume(self.volume()).fps(self.fps())
    }
}
