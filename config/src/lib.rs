// SPDX-License-Identifier: MPL-2.0

mod id;
mod settings;
pub mod state;

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

pub use id::{LOCAL_PREFIXES, WallpaperId};
pub use settings::{FPS_RANGE, Preset, RenderSettings, VOLUME_RANGE};

pub const NAME: &str = "lwe-session";
/// Steam application id of Wallpaper Engine; workshop content lives under it.
pub const WORKSHOP_APP_ID: &str = "431960";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Ron {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("no user config directory could be determined")]
    NoConfigDir,
}

/// Daemon configuration, read once at startup from `config.ron`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
#[must_use]
pub struct Config {
    /// renderer binary, either a path or a name looked up on `PATH`
    pub renderer: PathBuf,
    /// directory holding one sub-directory per wallpaper
    pub content_root: Option<PathBuf>,
    /// where the session snapshot is stored
    pub state_file: Option<PathBuf>,
    /// video wallpaper tool used for plain media assets
    pub media_tool: String,
    /// value passed to the media tool's `-o` flag
    pub media_tool_options: String,
    /// wallpaper daemon whose `query` subcommand reports the shown image
    pub compositor_tool: String,
    /// upper bound for each external query, in seconds
    pub probe_timeout_secs: u64,
    /// pause before startup reconciliation, in milliseconds
    pub reconcile_delay_ms: u64,
    /// settings used when no previous session was recorded
    pub default_settings: RenderSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            renderer: PathBuf::from("linux-wallpaperengine"),
            content_root: None,
            state_file: None,
            media_tool: String::from("mpvpaper"),
            media_tool_options: String::from("loop=inf --no-audio --really-quiet --panscan=1.0"),
            compositor_tool: String::from("swww"),
            probe_timeout_secs: 5,
            reconcile_delay_ms: 500,
            default_settings: RenderSettings::default(),
        }
    }
}

impl Config {
    /// Location of the config file.
    ///
    /// # Errors
    ///
    /// Fails if the user config directory cannot be determined.
    pub fn path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(NAME).join("config.ron"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Loads the config file, returning defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Loads a config from an explicit path.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(why) if why.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        ron::from_str(&contents).map_err(|source| ConfigError::Ron {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The configured content root, or the first Steam workshop directory that exists.
    #[must_use]
    pub fn content_root(&self) -> PathBuf {
        if let Some(root) = &self.content_root {
            return root.clone();
        }

        let candidates = default_content_roots();
        candidates
            .iter()
            .find(|root| root.is_dir())
            .or_else(|| candidates.first())
            .cloned()
            .unwrap_or_else(|| PathBuf::from(WORKSHOP_APP_ID))
    }

    /// The configured state file, or `<config dir>/lwe-session/state.json`.
    #[must_use]
    pub fn state_file(&self) -> PathBuf {
        if let Some(path) = &self.state_file {
            return path.clone();
        }

        dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(NAME)
            .join("state.json")
    }

    /// Lock file guarding against a second daemon instance.
    #[must_use]
    pub fn lock_file(&self) -> PathBuf {
        dirs::runtime_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(format!("{NAME}.lock"))
    }

    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs.max(1))
    }

    #[must_use]
    pub fn reconcile_delay(&self) -> Duration {
        Duration::from_millis(self.reconcile_delay_ms)
    }
}

fn default_content_roots() -> Vec<PathBuf> {
    let Some(home) = dirs::home_dir() else {
        return Vec::new();
    };

    [".steam/steam", ".local/share/Steam"]
        .into_iter()
        .map(|steam| {
            home.join(steam)
                .join("steamapps/workshop/content")
                .join(WORKSHOP_APP_ID)
        })
        .collect()
}
