// SPDX-License-Identifier: MPL-2.0

use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Serialize};

/// Prefixes of identifiers synthesized for locally imported media.
pub const LOCAL_PREFIXES: &[&str] = &["custom_", "gif_"];

/// Opaque token naming one wallpaper asset directory.
///
/// Workshop items use their numeric folder name, imported media use a
/// `custom_<hash>` or `gif_<hash>` token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct WallpaperId(String);

impl WallpaperId {
    /// Wraps any non-empty string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_owned()))
    }

    /// Parses a path segment that looks like an asset folder name.
    ///
    /// Accepts a purely numeric name or a `custom_*` / `gif_*` token with a
    /// non-empty suffix.
    #[must_use]
    pub fn parse(segment: &str) -> Option<Self> {
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            return Some(Self(segment.to_owned()));
        }

        LOCAL_PREFIXES
            .iter()
            .filter_map(|prefix| segment.strip_prefix(prefix))
            .any(|rest| !rest.is_empty() && !rest.contains(['/', ' ']))
            .then(|| Self(segment.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WallpaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for WallpaperId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for WallpaperId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
