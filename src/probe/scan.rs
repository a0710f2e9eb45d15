// SPDX-License-Identifier: MPL-2.0

//! Pulling wallpaper identifiers out of command lines and tool output.

use std::path::{Path, PathBuf};

use lwe_session_config::{WORKSHOP_APP_ID, WallpaperId};

use super::ProcessInfo;

/// Renderer flags whose value names the wallpaper.
const BACKGROUND_FLAGS: &[&str] = &["--bg", "--dir", "--background"];

/// Names used to recognise wallpaper processes in the process table.
#[derive(Debug, Clone)]
pub struct Matcher {
    pub renderer: String,
    pub media_tool: String,
    pub content_root: PathBuf,
}

impl Matcher {
    pub fn new(renderer: &Path, media_tool: &str, content_root: PathBuf) -> Self {
        let renderer = renderer
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| renderer.to_string_lossy().into_owned());
        Self {
            renderer,
            media_tool: media_tool.to_owned(),
            content_root,
        }
    }

    pub fn is_renderer(&self, process: &ProcessInfo) -> bool {
        runs(process, &self.renderer)
    }

    /// The video wallpaper tool, or a bare `mpv` started for a wallpaper.
    pub fn is_media_tool(&self, process: &ProcessInfo) -> bool {
        runs(process, &self.media_tool)
            || (process.name == "mpv"
                && process
                    .cmd
                    .iter()
                    .any(|arg| arg.to_lowercase().contains("wallpaper")))
    }

    /// Identifier a renderer was started with.
    ///
    /// The value of a background flag wins; otherwise any argument that is a
    /// path into the content root is used.
    pub fn renderer_identifier(&self, cmd: &[String]) -> Option<WallpaperId> {
        let mut args = cmd.iter().skip(1);
        while let Some(arg) = args.next() {
            let value = if BACKGROUND_FLAGS.contains(&arg.as_str()) {
                args.next().map(String::as_str)
            } else {
                BACKGROUND_FLAGS.iter().find_map(|flag| {
                    arg.strip_prefix(flag)
                        .and_then(|rest| rest.strip_prefix('='))
                })
            };

            if let Some(id) = value.and_then(|value| self.value_identifier(value)) {
                return Some(id);
            }
        }

        cmd.iter()
            .skip(1)
            .find_map(|arg| self.path_identifier(Path::new(arg)))
    }

    /// Identifier of the asset a media tool is playing.
    pub fn media_identifier(&self, cmd: &[String]) -> Option<WallpaperId> {
        cmd.iter()
            .skip(1)
            .find_map(|arg| self.path_identifier(Path::new(arg)))
    }

    /// First identifier found in free-text output such as a compositor query.
    pub fn text_identifier(&self, text: &str) -> Option<WallpaperId> {
        text.lines()
            .flat_map(str::split_whitespace)
            .filter(|token| token.contains('/'))
            .find_map(|token| {
                let token = token.trim_matches(|c| matches!(c, '"' | '\'' | ',' | ';'));
                self.path_identifier(Path::new(token))
            })
    }

    /// A flag value: a bare identifier or a path to an asset directory.
    fn value_identifier(&self, value: &str) -> Option<WallpaperId> {
        let value = value.trim_end_matches('/');
        if let Some(id) = WallpaperId::parse(value) {
            return Some(id);
        }

        let path = Path::new(value);
        self.path_identifier(path).or_else(|| {
            path.file_name()
                .and_then(|name| name.to_str())
                .and_then(WallpaperId::parse)
        })
    }

    /// The asset directory a path points into, if it is under the content
    /// root or any workshop content directory.
    pub fn path_identifier(&self, path: &Path) -> Option<WallpaperId> {
        if let Ok(rest) = path.strip_prefix(&self.content_root) {
            if let Some(id) = rest
                .iter()
                .next()
                .and_then(|segment| segment.to_str())
                .and_then(WallpaperId::parse)
            {
                return Some(id);
            }
        }

        let segments: Vec<&str> = path.iter().filter_map(|s| s.to_str()).collect();
        segments
            .windows(2)
            .find(|pair| pair[0] == WORKSHOP_APP_ID)
            .and_then(|pair| WallpaperId::parse(pair[1]))
    }
}

/// Whether `process` is an instance of `program`.
///
/// Kernel process names are truncated, so the executable in argv[0] counts as well.
fn runs(process: &ProcessInfo, program: &str) -> bool {
    if program.is_empty() {
        return false;
    }

    process.name.contains(program)
        || process.cmd.first().is_some_and(|argv0| {
            Path::new(argv0)
                .file_name()
                .is_some_and(|name| name.to_string_lossy().contains(program))
        })
}
