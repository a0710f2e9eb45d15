// SPDX-License-Identifier: MPL-2.0

//! Startup reconciliation of the remembered session with what is actually
//! running.
//!
//! The renderer outlives this daemon, so after a restart the saved state may
//! describe a wallpaper that has since died, or miss one that was started by
//! hand. Only live evidence is trusted. The remembered wallpaper counts only
//! if a probe still sees it, and without any evidence nothing is considered
//! active.

use std::fmt;

use lwe_session_config::WallpaperId;
use tracing::{debug, info, warn};

use crate::{playlist::PlaylistEngine, probe::ProcessQuery, store::Store};

/// What startup concluded is showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// The live wallpaper belongs to the playlist, which keeps playing.
    ResumedPlaylist { wallpaper: WallpaperId, index: usize },
    /// A wallpaper runs outside playlist control.
    Manual {
        wallpaper: WallpaperId,
        in_playlist: bool,
        /// the saved session claimed the playlist was playing
        stopped_playlist: bool,
    },
    Nothing,
}

impl Reconciliation {
    pub fn wallpaper(&self) -> Option<&WallpaperId> {
        match self {
            Reconciliation::ResumedPlaylist { wallpaper, .. }
            | Reconciliation::Manual { wallpaper, .. } => Some(wallpaper),
            Reconciliation::Nothing => None,
        }
    }
}

impl fmt::Display for Reconciliation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reconciliation::ResumedPlaylist { wallpaper, .. } => {
                write!(f, "resumed playlist at {wallpaper}")
            }
            Reconciliation::Manual {
                wallpaper,
                stopped_playlist: true,
                ..
            } => write!(
                f,
                "detected manual wallpaper {wallpaper} (playlist paused, it is not part of the playlist)"
            ),
            Reconciliation::Manual { wallpaper, .. } => {
                write!(f, "detected manual wallpaper {wallpaper} (playlist paused)")
            }
            Reconciliation::Nothing => f.write_str("no active wallpaper detected"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Unknown,
    Detecting,
    Reconciled(Reconciliation),
}

#[derive(Debug, Default)]
pub struct Reconciler {
    phase: Phase,
}

impl Reconciler {
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_reconciled(&self) -> bool {
        matches!(self.phase, Phase::Reconciled(_))
    }

    /// Decides what is showing, corrects `playlist` and `store` to match and
    /// persists the result.
    pub fn reconcile(
        &mut self,
        store: &mut Store,
        playlist: &mut PlaylistEngine,
        query: &mut ProcessQuery,
    ) -> Reconciliation {
        self.phase = Phase::Detecting;

        let outcome = match live_wallpaper(store, query) {
            Some(wallpaper) => {
                let index = playlist.index_of(&wallpaper);
                let outcome = match (playlist.is_playing(), index) {
                    (true, Some(index)) => {
                        playlist.seek(index);
                        Reconciliation::ResumedPlaylist {
                            wallpaper: wallpaper.clone(),
                            index,
                        }
                    }
                    (true, None) => {
                        warn!(wallpaper = %wallpaper, "saved session was playing a playlist that does not contain the live wallpaper, stopping it");
                        playlist.stop();
                        Reconciliation::Manual {
                            wallpaper: wallpaper.clone(),
                            in_playlist: false,
                            stopped_playlist: true,
                        }
                    }
                    (false, index) => Reconciliation::Manual {
                        wallpaper: wallpaper.clone(),
                        in_playlist: index.is_some(),
                        stopped_playlist: false,
                    },
                };
                store.set_current_wallpaper(Some(wallpaper));
                outcome
            }
            None => {
                if let Some(stale) = store.current_wallpaper() {
                    debug!(wallpaper = %stale, "discarding wallpaper that is no longer running");
                }
                store.set_current_wallpaper(None);
                playlist.stop();
                Reconciliation::Nothing
            }
        };

        store.persist(playlist);
        info!("{outcome}");
        self.phase = Phase::Reconciled(outcome.clone());
        outcome
    }
}

/// The remembered wallpaper if it is still running, otherwise whatever the
/// probes find first.
fn live_wallpaper(store: &Store, query: &mut ProcessQuery) -> Option<WallpaperId> {
    if let Some(remembered) = store.current_wallpaper() {
        if query.verify_identifier_has_live_process(remembered) {
            debug!(wallpaper = %remembered, "remembered wallpaper is still running");
            return Some(remembered.clone());
        }
    }

    query.detect().map(|evidence| {
        debug!(
            wallpaper = %evidence.wallpaper,
            source = %evidence.source,
            pid = ?evidence.pid,
            "live wallpaper detected"
        );
        evidence.wallpaper
    })
}
