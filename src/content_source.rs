// SPDX-License-Identifier: MPL-2.0

use std::path::Path;

use calloop::{LoopHandle, channel};
use lwe_session_config::WallpaperId;
use notify::{
    RecommendedWatcher, RecursiveMode, Watcher,
    event::{ModifyKind, RenameMode},
};
use tracing::{debug, info, warn};

use crate::App;

/// A wallpaper appearing in or vanishing from the content root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentChange {
    Added(WallpaperId),
    Removed(WallpaperId),
}

/// Watches the content root and feeds asset directory changes into the loop.
///
/// The returned watcher must be kept alive for events to arrive.
pub fn content_source(handle: &LoopHandle<'static, App>, root: &Path) -> Option<RecommendedWatcher> {
    let (notify_tx, notify_rx) = channel::sync_channel(20);
    let watched_root = root.to_path_buf();

    let inserted = handle.insert_source(
        notify_rx,
        move |e: channel::Event<notify::Event>, _, state: &mut App| match e {
            channel::Event::Msg(event) => {
                for change in changes(&watched_root, &event) {
                    match change {
                        ContentChange::Added(id) => {
                            info!(wallpaper = %id, "new wallpaper available");
                        }
                        ContentChange::Removed(id) => state.session.forget(&id),
                    }
                }
            }
            channel::Event::Closed => {
                debug!("content watcher closed");
            }
        },
    );
    if let Err(err) = inserted {
        warn!("{err}");
        return None;
    }

    let watcher = RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                let _ = notify_tx.send(event);
            }
            Err(why) => warn!(?why, "content watcher error"),
        },
        notify::Config::default(),
    );

    let mut watcher = match watcher {
        Ok(watcher) => watcher,
        Err(why) => {
            warn!(?why, "failed to create content watcher");
            return None;
        }
    };

    if let Err(why) = watcher.watch(root, RecursiveMode::NonRecursive) {
        warn!(?why, path = %root.display(), "cannot watch content root");
        return None;
    }

    Some(watcher)
}

/// Asset directories directly under `root` that an event created or removed.
pub fn changes(root: &Path, event: &notify::Event) -> Vec<ContentChange> {
    let make: fn(WallpaperId) -> ContentChange = match event.kind {
        notify::EventKind::Create(_)
        | notify::EventKind::Modify(ModifyKind::Name(RenameMode::To)) => ContentChange::Added,
        notify::EventKind::Remove(_)
        | notify::EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            ContentChange::Removed
        }
        _ => return Vec::new(),
    };

    event
        .paths
        .iter()
        .filter(|path| path.parent() == Some(root))
        .filter_map(|path| path.file_name()?.to_str())
        .filter_map(WallpaperId::parse)
        .map(make)
        .collect()
}
