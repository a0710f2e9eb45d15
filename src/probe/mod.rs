// SPDX-License-Identifier: MPL-2.0

//! Finding out which wallpaper is actually showing.
//!
//! Three independent probes are consulted: the renderer's process, the video
//! wallpaper tool's process, and the compositor's own query command. Every
//! probe is fail-soft; an error is logged once and counts as "nothing seen".

mod compositor;
#[cfg(test)]
pub mod fake;
mod scan;
mod table;
mod types;

use lwe_session_config::{Config, WallpaperId};
use tracing::{debug, warn};

pub use compositor::{CommandQuery, CompositorQuery};
pub use scan::Matcher;
pub use table::{ProcessTable, SystemTable};
pub use types::{EvidenceSource, LiveEvidence, ProbeError, ProcessInfo};

pub struct ProcessQuery {
    table: Box<dyn ProcessTable>,
    compositor: Box<dyn CompositorQuery>,
    matcher: Matcher,
    own_pid: u32,
}

impl ProcessQuery {
    pub fn new(
        table: impl ProcessTable + 'static,
        compositor: impl CompositorQuery + 'static,
        matcher: Matcher,
    ) -> Self {
        Self {
            table: Box::new(table),
            compositor: Box::new(compositor),
            matcher,
            own_pid: std::process::id(),
        }
    }

    /// Probes backed by the live system and the configured tools.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            SystemTable::default(),
            CommandQuery::new(config.compositor_tool.clone(), config.probe_timeout()),
            Matcher::new(&config.renderer, &config.media_tool, config.content_root()),
        )
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// The most recently started renderer that names a wallpaper.
    pub fn find_renderer_process(&mut self) -> Option<LiveEvidence> {
        let processes = self.processes()?;
        processes
            .iter()
            .filter(|process| self.matcher.is_renderer(process))
            .filter_map(|process| {
                self.matcher
                    .renderer_identifier(&process.cmd)
                    .map(|id| (process.pid, id))
            })
            .max_by_key(|(pid, _)| *pid)
            .map(|(pid, wallpaper)| LiveEvidence {
                wallpaper,
                source: EvidenceSource::Renderer,
                pid: Some(pid),
            })
    }

    /// The most recently started media tool playing a wallpaper asset.
    pub fn find_media_tool_process(&mut self) -> Option<LiveEvidence> {
        let processes = self.processes()?;
        processes
            .iter()
            .filter(|process| self.matcher.is_media_tool(process))
            .filter_map(|process| {
                self.matcher
                    .media_identifier(&process.cmd)
                    .map(|id| (process.pid, id))
            })
            .max_by_key(|(pid, _)| *pid)
            .map(|(pid, wallpaper)| LiveEvidence {
                wallpaper,
                source: EvidenceSource::MediaTool,
                pid: Some(pid),
            })
    }

    pub fn find_compositor_wallpaper(&mut self) -> Option<LiveEvidence> {
        let output = match self.compositor.query() {
            Ok(output) => output,
            Err(why) => {
                debug!(%why, "compositor probe gave no evidence");
                return None;
            }
        };

        self.matcher
            .text_identifier(&output)
            .map(|wallpaper| LiveEvidence {
                wallpaper,
                source: EvidenceSource::Compositor,
                pid: None,
            })
    }

    /// Runs the probes in priority order and returns the first hit.
    pub fn detect(&mut self) -> Option<LiveEvidence> {
        self.find_renderer_process()
            .or_else(|| self.find_media_tool_process())
            .or_else(|| self.find_compositor_wallpaper())
    }

    /// Whether any probe currently sees `id` showing.
    ///
    /// Every matching process is considered, not only the most recent one.
    pub fn verify_identifier_has_live_process(&mut self, id: &WallpaperId) -> bool {
        let seen_in_processes = self.processes().is_some_and(|processes| {
            processes.iter().any(|process| {
                let found = if self.matcher.is_renderer(process) {
                    self.matcher.renderer_identifier(&process.cmd)
                } else if self.matcher.is_media_tool(process) {
                    self.matcher.media_identifier(&process.cmd)
                } else {
                    None
                };
                found.as_ref() == Some(id)
            })
        });

        seen_in_processes
            || self
                .find_compositor_wallpaper()
                .is_some_and(|evidence| &evidence.wallpaper == id)
    }

    /// Every renderer or media tool process other than this one.
    pub fn wallpaper_pids(&mut self) -> Vec<u32> {
        self.processes()
            .unwrap_or_default()
            .into_iter()
            .filter(|process| {
                self.matcher.is_renderer(process) || self.matcher.is_media_tool(process)
            })
            .map(|process| process.pid)
            .collect()
    }

    pub fn terminate(&mut self, pid: u32) -> bool {
        self.table.terminate(pid)
    }

    fn processes(&mut self) -> Option<Vec<ProcessInfo>> {
        match self.table.snapshot() {
            Ok(processes) => Some(
                processes
                    .into_iter()
                    .filter(|process| process.pid != self.own_pid)
                    .collect(),
            ),
            Err(why) => {
                warn!(%why, "process table probe gave no evidence");
                None
            }
        }
    }
}
