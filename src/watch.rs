//! File watching: follow files from a byte offset and emit line events.
//!
//! Each watched file gets one follower task that reads complete lines,
//! suspends on a change notifier at end-of-file when following, and ends its
//! stream on stop, on exhaustion, or on a fatal error. The consuming side sees
//! only a [`LineStream`]; everything else stays inside the follower.

pub mod follower;
pub mod notifier;

use crate::error::{Result, TailfanError};
use async_trait::async_trait;
use self::follower::Follower;
use self::notifier::ChangeNotifier;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Channel capacity between a follower task and its printer. Deep enough to
/// absorb bursts, shallow enough to backpressure a runaway producer.
const EVENT_BUFFER: usize = 256;

/// Options controlling how a file is followed.
#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    /// Keep streaming after end-of-file is reached.
    pub follow: bool,
    /// Tolerate the file being absent or replaced; implies follow.
    pub reopen: bool,
    /// Interval polling instead of filesystem event notification.
    pub poll: bool,
    /// Tick period for poll mode; also the degraded fallback in event mode.
    pub poll_interval: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            follow: false,
            reopen: false,
            poll: false,
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// A line read from a watched file, or the error that ended its stream.
///
/// An error is always the final event; the channel closes right after it.
#[derive(Debug)]
pub enum LineEvent {
    Line(String),
    Error(TailfanError),
}

/// Anything that lazily yields line events.
///
/// The seam between watchers and printers; tests substitute scripted sources.
#[async_trait]
pub trait LineSource: Send {
    /// Next event, or `None` once the stream has ended.
    async fn next_event(&mut self) -> Option<LineEvent>;
}

/// Receiving half of a follower task's event stream.
pub struct LineStream {
    rx: mpsc::Receiver<LineEvent>,
}

#[async_trait]
impl LineSource for LineStream {
    async fn next_event(&mut self) -> Option<LineEvent> {
        self.rx.recv().await
    }
}

/// Clonable stop broadcaster shared by every watcher in a session.
///
/// Triggering is idempotent and safe from any task; a watcher whose stream
/// already ended simply never observes it.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request every subscribed watcher to stop.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Subscription handed to each follower task.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Factory for follower tasks.
pub struct FileWatcher;

impl FileWatcher {
    /// Start following `path` from `start_offset` and return the event stream.
    ///
    /// The change notifier is constructed here, before the task spawns, so a
    /// broken notification backend fails the whole startup instead of
    /// surfacing later as a mid-run stream error. Non-follow opens never need
    /// a notifier and cannot fail at this point; a missing file becomes the
    /// stream's first (and only) event instead.
    pub fn open(
        path: &Path,
        start_offset: u64,
        options: WatchOptions,
        stop: watch::Receiver<bool>,
    ) -> Result<LineStream> {
        let notifier = if options.follow {
            Some(ChangeNotifier::new(path, &options)?)
        } else {
            None
        };

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let follower = Follower::new(path.to_path_buf(), start_offset, options, notifier, tx, stop);
        tokio::spawn(follower.run());

        Ok(LineStream { rx })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tokio::time::{timeout, Duration};

    const TIMEOUT_MS: u64 = 2000;

    /// Poll mode with a short interval keeps these tests independent of the
    /// platform notification backend.
    fn test_options(follow: bool, reopen: bool) -> WatchOptions {
        WatchOptions {
            follow,
            reopen,
            poll: true,
            poll_interval: Duration::from_millis(20),
        }
    }

    fn create_test_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write test data");
        file.flush().expect("Failed to flush test data");
        file
    }

    async fn next_line(stream: &mut LineStream) -> Option<String> {
        let event = timeout(Duration::from_millis(TIMEOUT_MS), stream.next_event())
            .await
            .expect("stream event timed out")?;
        match event {
            LineEvent::Line(text) => Some(text),
            LineEvent::Error(err) => panic!("unexpected stream error: {err}"),
        }
    }

    #[tokio::test]
    async fn test_reads_whole_file_without_follow() {
        let file = create_test_file("one\ntwo\nthree\n");
        let stop = Shutdown::new();
        let mut stream =
            FileWatcher::open(file.path(), 0, test_options(false, false), stop.subscribe())
                .unwrap();

        assert_eq!(next_line(&mut stream).await.as_deref(), Some("one"));
        assert_eq!(next_line(&mut stream).await.as_deref(), Some("two"));
        assert_eq!(next_line(&mut stream).await.as_deref(), Some("three"));
        assert!(next_line(&mut stream).await.is_none(), "stream should end");
    }

    #[tokio::test]
    async fn test_honors_start_offset() {
        let file = create_test_file("skipped\nkept\n");
        let stop = Shutdown::new();
        let mut stream =
            FileWatcher::open(file.path(), 8, test_options(false, false), stop.subscribe())
                .unwrap();

        assert_eq!(next_line(&mut stream).await.as_deref(), Some("kept"));
        assert!(next_line(&mut stream).await.is_none());
    }

    #[tokio::test]
    async fn test_emits_unterminated_final_line_when_not_following() {
        let file = create_test_file("done\npartial");
        let stop = Shutdown::new();
        let mut stream =
            FileWatcher::open(file.path(), 0, test_options(false, false), stop.subscribe())
                .unwrap();

        assert_eq!(next_line(&mut stream).await.as_deref(), Some("done"));
        assert_eq!(next_line(&mut stream).await.as_deref(), Some("partial"));
        assert!(next_line(&mut stream).await.is_none());
    }

    #[tokio::test]
    async fn test_strips_crlf_terminators() {
        let file = create_test_file("first\r\nsecond\n");
        let stop = Shutdown::new();
        let mut stream =
            FileWatcher::open(file.path(), 0, test_options(false, false), stop.subscribe())
                .unwrap();

        assert_eq!(next_line(&mut stream).await.as_deref(), Some("first"));
        assert_eq!(next_line(&mut stream).await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_missing_file_errors_without_reopen() {
        let dir = tempfile::TempDir::new().expect("create temp dir");
        let missing = dir.path().join("absent.log");
        let stop = Shutdown::new();
        let mut stream =
            FileWatcher::open(&missing, 0, test_options(false, false), stop.subscribe()).unwrap();

        match timeout(Duration::from_millis(TIMEOUT_MS), stream.next_event())
            .await
            .expect("stream event timed out")
        {
            Some(LineEvent::Error(TailfanError::FileNotFound { .. })) => {}
            other => panic!("expected FileNotFound event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_follow_streams_appended_lines_then_stops() {
        let file = create_test_file("start\n");
        let stop = Shutdown::new();
        let mut stream =
            FileWatcher::open(file.path(), 0, test_options(true, false), stop.subscribe())
                .unwrap();

        assert_eq!(next_line(&mut stream).await.as_deref(), Some("start"));

        let mut handle = file.reopen().expect("reopen temp file for append");
        use std::io::Seek;
        handle.seek(std::io::SeekFrom::End(0)).unwrap();
        handle.write_all(b"appended\n").unwrap();
        handle.flush().unwrap();

        assert_eq!(next_line(&mut stream).await.as_deref(), Some("appended"));

        stop.trigger();
        assert!(
            next_line(&mut stream).await.is_none(),
            "stream should end promptly after stop"
        );
    }

    #[tokio::test]
    async fn test_follow_holds_partial_line_until_terminated() {
        let file = create_test_file("whole\npar");
        let stop = Shutdown::new();
        let mut stream =
            FileWatcher::open(file.path(), 0, test_options(true, false), stop.subscribe())
                .unwrap();

        assert_eq!(next_line(&mut stream).await.as_deref(), Some("whole"));

        let mut handle = file.reopen().expect("reopen temp file for append");
        use std::io::Seek;
        handle.seek(std::io::SeekFrom::End(0)).unwrap();
        handle.write_all(b"tial\n").unwrap();
        handle.flush().unwrap();

        assert_eq!(next_line(&mut stream).await.as_deref(), Some("partial"));
        stop.trigger();
    }

    #[tokio::test]
    async fn test_truncation_rereads_from_start() {
        let file = create_test_file("old one\nold two\n");
        let stop = Shutdown::new();
        let mut stream =
            FileWatcher::open(file.path(), 0, test_options(true, false), stop.subscribe())
                .unwrap();

        assert_eq!(next_line(&mut stream).await.as_deref(), Some("old one"));
        assert_eq!(next_line(&mut stream).await.as_deref(), Some("old two"));

        // Shrink the file below the follower's read position.
        std::fs::write(file.path(), b"new\n").unwrap();

        assert_eq!(next_line(&mut stream).await.as_deref(), Some("new"));
        stop.trigger();
    }

    #[tokio::test]
    async fn test_reopen_waits_for_creation() {
        let dir = tempfile::TempDir::new().expect("create temp dir");
        let path = dir.path().join("later.log");
        let stop = Shutdown::new();
        let mut stream =
            FileWatcher::open(&path, 0, test_options(true, true), stop.subscribe()).unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;
        std::fs::write(&path, b"born\n").unwrap();

        assert_eq!(next_line(&mut stream).await.as_deref(), Some("born"));
        stop.trigger();
        assert!(next_line(&mut stream).await.is_none());
    }

    #[tokio::test]
    async fn test_stop_while_waiting_for_missing_file() {
        let dir = tempfile::TempDir::new().expect("create temp dir");
        let path = dir.path().join("never.log");
        let stop = Shutdown::new();
        let mut stream =
            FileWatcher::open(&path, 0, test_options(true, true), stop.subscribe()).unwrap();

        stop.trigger();
        assert!(
            next_line(&mut stream).await.is_none(),
            "stream should end without events"
        );
    }

    #[tokio::test]
    async fn test_trigger_is_idempotent() {
        let stop = Shutdown::new();
        stop.trigger();
        stop.trigger();
        let cloned = stop.clone();
        cloned.trigger();
        assert!(*stop.subscribe().borrow());
    }
}
