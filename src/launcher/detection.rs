// SPDX-License-Identifier: MPL-2.0

//! File type detection for wallpaper asset directories.
//!
//! A directory holding a `project.json` is a scene for the renderer. Anything
//! else is inspected for a video or GIF that the media tool can loop.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

/// Manifest the renderer reads from every wallpaper project.
pub const PROJECT_MANIFEST: &str = "project.json";

/// Video container extensions that may contain playable video.
/// These are checked case-insensitively.
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4",  // MPEG-4 container (typically H.264/H.265 codec)
    "webm", // WebM container (VP8/VP9/AV1)
    "mkv",  // Matroska container (any codec)
    "avi",  // AVI container (legacy format)
    "mov",  // QuickTime container (typically H.264)
    "m4v",  // MPEG-4 Video (Apple variant of MP4)
    "ogv",  // Ogg Video container (Theora codec)
];

/// How deep to look for media inside an asset directory.
const MEDIA_SEARCH_DEPTH: usize = 2;

/// Check if a path points to a video or GIF file.
#[must_use]
pub fn is_animated_file(path: &Path) -> bool {
    is_gif_file(path) || is_video_file(path)
}

/// Check if a path points to a GIF file.
#[must_use]
pub fn is_gif_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gif"))
}

/// Check if a path points to a video file.
#[must_use]
pub fn is_video_file(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };

    let ext_lower = ext.to_lowercase();
    VIDEO_EXTENSIONS.contains(&ext_lower.as_str())
}

#[must_use]
pub fn has_project(dir: &Path) -> bool {
    dir.join(PROJECT_MANIFEST).is_file()
}

/// First video or GIF inside `dir`, in file name order.
#[must_use]
pub fn find_media(dir: &Path) -> Option<PathBuf> {
    let media = WalkDir::new(dir)
        .max_depth(MEDIA_SEARCH_DEPTH)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .find(|path| is_animated_file(path));

    if let Some(path) = &media {
        debug!(path = %path.display(), "media asset found");
    }
    media
}
