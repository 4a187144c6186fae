//! Change notification backends for follow mode.
//!
//! Event mode registers a `notify` watcher on the file's parent directory, so
//! appends, truncation, removal, and recreation of the file all produce
//! wakeups. Poll mode (`--poll`) ticks on a fixed interval instead. Spurious
//! wakeups are fine in both modes; the follower re-checks the file on every
//! one.

use crate::error::Result;
use log::warn;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Interval, MissedTickBehavior};

use super::WatchOptions;

/// Wakes the follower when its file may have changed.
pub(crate) enum ChangeNotifier {
    Events {
        /// Keeps the backend watch registered; dropped with the notifier.
        _watcher: RecommendedWatcher,
        rx: mpsc::UnboundedReceiver<()>,
        /// Sleep period once the event channel is gone.
        fallback: Duration,
    },
    Poll {
        interval: Interval,
    },
}

impl ChangeNotifier {
    pub(crate) fn new(path: &Path, options: &WatchOptions) -> Result<Self> {
        if options.poll {
            let mut interval = time::interval(options.poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            return Ok(Self::Poll { interval });
        }

        // Watch the parent directory, not the file itself: removal and
        // recreation events for the file arrive on the directory watch, and
        // the file may not exist yet in reopen mode.
        let dir = watch_root(path);
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher =
            notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
                if event.is_ok() {
                    // Send failure means the follower is gone; nothing to do.
                    let _ = tx.send(());
                }
            })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        Ok(Self::Events {
            _watcher: watcher,
            rx,
            fallback: options.poll_interval,
        })
    }

    /// Suspend until the file may have changed.
    pub(crate) async fn wait(&mut self) {
        match self {
            Self::Events { rx, fallback, .. } => {
                if rx.recv().await.is_none() {
                    // Backend went away; degrade to polling instead of
                    // returning instantly from a closed channel forever.
                    warn!("filesystem event stream closed; falling back to interval polling");
                    time::sleep(*fallback).await;
                }
            }
            Self::Poll { interval } => {
                interval.tick().await;
            }
        }
    }
}

/// Directory whose events cover `path`. Relative bare filenames watch the
/// current directory.
fn watch_root(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
