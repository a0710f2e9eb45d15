// SPDX-License-Identifier: MPL-2.0

//! Starting wallpapers as detached processes.
//!
//! The spawned process is never waited on. It is put in its own process
//! group so it keeps running after this daemon exits; later questions about
//! whether it still runs go through [`ProcessQuery`].

mod detection;
#[cfg(test)]
mod tests;

use std::{
    ffi::OsStr,
    io,
    os::unix::process::CommandExt,
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
};

use lwe_session_config::{Config, RenderSettings, WallpaperId};
use nix::sys::signal::{SigSet, SigmaskHow, pthread_sigmask};
use tracing::{debug, info, warn};

use crate::probe::ProcessQuery;

use detection::{find_media, has_project};

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("wallpaper {0} does not exist")]
    UnknownWallpaper(WallpaperId),
    #[error("{0} was not found")]
    BinaryNotFound(String),
    #[error("not allowed to run {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("failed to start {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Which program shows a given asset directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Renderer,
    /// a plain video or GIF, looped by the media tool
    MediaTool(PathBuf),
}

#[derive(Debug)]
pub struct Launcher {
    renderer: PathBuf,
    media_tool: String,
    media_tool_options: String,
    content_root: PathBuf,
    /// spawned children, held only so they can be reaped once they exit
    children: Vec<Child>,
}

impl Launcher {
    pub fn new(
        renderer: impl Into<PathBuf>,
        media_tool: impl Into<String>,
        media_tool_options: impl Into<String>,
        content_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            renderer: renderer.into(),
            media_tool: media_tool.into(),
            media_tool_options: media_tool_options.into(),
            content_root: content_root.into(),
            children: Vec::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.renderer.clone(),
            config.media_tool.clone(),
            config.media_tool_options.clone(),
            config.content_root(),
        )
    }

    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    pub fn asset_dir(&self, id: &WallpaperId) -> PathBuf {
        self.content_root.join(id.as_str())
    }

    pub fn backend(&self, dir: &Path) -> Backend {
        if has_project(dir) {
            return Backend::Renderer;
        }

        find_media(dir).map_or(Backend::Renderer, Backend::MediaTool)
    }

    /// Builds the invocation that shows `id` with `settings`.
    pub fn command(
        &self,
        id: &WallpaperId,
        settings: &RenderSettings,
    ) -> Result<Command, LaunchError> {
        let dir = self.asset_dir(id);
        if !dir.is_dir() {
            return Err(LaunchError::UnknownWallpaper(id.clone()));
        }

        let settings = settings.clone().clamped();
        let command = match self.backend(&dir) {
            Backend::Renderer => {
                let mut command = Command::new(resolve(self.renderer.as_os_str())?);
                command
                    .arg("--screen-root")
                    .arg(&settings.screen)
                    .arg("--bg")
                    .arg(&dir)
                    .arg("--volume")
                    .arg(settings.volume.to_string())
                    .arg("--fps")
                    .arg(settings.fps.to_string());
                if settings.noautomute {
                    command.arg("--noautomute");
                }
                if settings.no_audio_processing {
                    command.arg("--no-audio-processing");
                }
                if settings.disable_mouse {
                    command.arg("--disable-mouse");
                }
                command
            }
            Backend::MediaTool(file) => {
                let output = if settings.screen.is_empty() {
                    "*"
                } else {
                    settings.screen.as_str()
                };
                let mut command = Command::new(resolve(OsStr::new(&self.media_tool))?);
                command
                    .arg("-o")
                    .arg(&self.media_tool_options)
                    .arg(output)
                    .arg(file);
                command
            }
        };

        Ok(command)
    }

    /// Replaces whatever wallpaper is running with `id`.
    ///
    /// Returns the pid of the new process, which is not kept.
    pub fn launch(
        &mut self,
        id: &WallpaperId,
        settings: &RenderSettings,
        query: &mut ProcessQuery,
    ) -> Result<u32, LaunchError> {
        let mut command = self.command(id, settings)?;
        self.reap();

        for pid in query.wallpaper_pids() {
            if query.terminate(pid) {
                debug!(pid, "stopped previous wallpaper process");
            } else {
                warn!(pid, "failed to stop previous wallpaper process");
            }
        }

        let program = PathBuf::from(command.get_program());
        unblock_signals(&mut command);
        let child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0)
            .spawn()
            .map_err(|source| match source.kind() {
                io::ErrorKind::PermissionDenied => LaunchError::PermissionDenied(program.clone()),
                io::ErrorKind::NotFound => {
                    LaunchError::BinaryNotFound(program.display().to_string())
                }
                _ => LaunchError::Spawn {
                    program: program.clone(),
                    source,
                },
            })?;

        let pid = child.id();
        info!(wallpaper = %id, pid, program = %program.display(), "wallpaper started");
        self.children.push(child);
        Ok(pid)
    }

    /// Collects the exit status of finished children so none linger as
    /// zombies. Returns how many are still running.
    ///
    /// Whether a wallpaper is showing is never decided from this list.
    pub fn reap(&mut self) -> usize {
        self.children.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                debug!(pid = child.id(), %status, "reaped wallpaper process");
                false
            }
            Ok(None) => true,
            Err(why) => {
                warn!(pid = child.id(), ?why, "cannot reap wallpaper process");
                false
            }
        });
        self.children.len()
    }
}

/// Clears the signal mask in the child before exec.
///
/// The event loop blocks the signals it listens for, and a blocked SIGTERM
/// would be inherited by everything started from here.
pub(crate) fn unblock_signals(command: &mut Command) {
    // SAFETY: pthread_sigmask is async-signal-safe and touches no memory
    // shared with the parent.
    unsafe {
        command.pre_exec(|| {
            pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&SigSet::empty()), None)
                .map_err(io::Error::from)
        });
    }
}

fn resolve(program: &OsStr) -> Result<PathBuf, LaunchError> {
    which::which(program).map_err(|why| {
        debug!(?why, "binary lookup failed");
        LaunchError::BinaryNotFound(program.to_string_lossy().into_owned())
    })
}
