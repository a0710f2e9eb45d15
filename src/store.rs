// SPDX-License-Identifier: MPL-2.0

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use lwe_session_config::{RenderSettings, WallpaperId, state::Snapshot};
use tracing::{debug, error, warn};

use crate::playlist::PlaylistEngine;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode session state: {0}")]
    Json(#[from] serde_json::Error),
}

/// The session snapshot and the file it lives in.
///
/// The file is always read and written as a whole.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    snapshot: Snapshot,
}

impl Store {
    /// Reads the snapshot at `path`, falling back to a default snapshot with
    /// `defaults` as render settings if the file is missing or unreadable.
    pub fn load(path: impl Into<PathBuf>, defaults: RenderSettings) -> Self {
        let path = path.into();
        let snapshot = match read(&path) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                debug!(path = %path.display(), "no saved session");
                Snapshot::with_settings(defaults)
            }
            Err(why) => {
                warn!(?why, "discarding saved session");
                Snapshot::with_settings(defaults)
            }
        };

        Self { path, snapshot }
    }

    /// Writes the whole snapshot, creating parent directories as needed.
    pub fn save(&self) -> Result<(), StoreError> {
        let io_err = |source: io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(&self.snapshot)?;
        fs::write(&self.path, json).map_err(io_err)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.snapshot.wallpaper_state.last_settings
    }

    pub fn settings_mut(&mut self) -> &mut RenderSettings {
        &mut self.snapshot.wallpaper_state.last_settings
    }

    pub fn current_wallpaper(&self) -> Option<&WallpaperId> {
        self.snapshot.current_wallpaper()
    }

    pub fn set_current_wallpaper(&mut self, id: Option<WallpaperId>) {
        self.snapshot.wallpaper_state.current_wallpaper = id;
    }

    pub fn record_recent(&mut self, id: &WallpaperId) {
        self.snapshot.record_recent(id);
    }

    /// Copies the playlist state into the snapshot.
    pub fn commit(&mut self, playlist: &PlaylistEngine) {
        playlist.write_to(&mut self.snapshot);
    }

    /// Commits `playlist` and writes the file. A failed write is logged and
    /// otherwise ignored; the in-memory state stays authoritative.
    pub fn persist(&mut self, playlist: &PlaylistEngine) {
        self.commit(playlist);
        if let Err(err) = self.save() {
            error!("{err}");
        }
    }
}

fn read(path: &Path) -> Result<Option<Snapshot>, StoreError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(why) if why.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    Ok(Some(serde_json::from_str(&contents)?))
}
