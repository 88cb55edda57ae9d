// src/watch.rs

//! Filesystem watching for watch-enabled commands.
//!
//! This is a thin bridge from the blocking `notify` callback into the async
//! world: events are forwarded over an unbounded channel and interpreted by
//! the scheduler's restart loop.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// Handle for a filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive
/// for as long as needed. Dropping this handle stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch the given paths and forward every filesystem event to `event_tx`.
///
/// Directories are watched one level deep, matching the semantics of
/// declaring the directory itself as a watch path.
pub fn spawn_path_watcher(
    paths: &[String],
    event_tx: mpsc::UnboundedSender<Event>,
) -> Result<WatcherHandle> {
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let _ = event_tx.send(event);
            }
            Err(err) => {
                eprintln!("drover: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    for path in paths {
        let path: PathBuf = Path::new(path).to_path_buf();
        watcher
            .watch(&path, RecursiveMode::NonRecursive)
            .with_context(|| format!("watching path {path:?}"))?;
    }

    Ok(WatcherHandle { _inner: watcher })
}
