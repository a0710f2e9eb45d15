// SPDX-License-Identifier: MPL-2.0

use std::{fmt, io, time::Duration};

use lwe_session_config::WallpaperId;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("{0} is not installed")]
    ToolMissing(String),
    #[error("{tool} did not answer within {timeout:?}")]
    Timeout { tool: String, timeout: Duration },
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// One row of the process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub cmd: Vec<String>,
}

/// Where a live wallpaper was seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceSource {
    Renderer,
    MediaTool,
    Compositor,
}

impl fmt::Display for EvidenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EvidenceSource::Renderer => "renderer process",
            EvidenceSource::MediaTool => "media tool process",
            EvidenceSource::Compositor => "compositor query",
        })
    }
}

/// A wallpaper that is showing right now, as observed from outside.
///
/// Never persisted; recomputed on every probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveEvidence {
    pub wallpaper: WallpaperId,
    pub source: EvidenceSource,
    /// owning process, absent for compositor queries
    pub pid: Option<u32>,
}
