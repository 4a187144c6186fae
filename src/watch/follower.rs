//! Follower task: reads lines from a byte offset and streams them until
//! end-of-file, stop, or a fatal error.
//!
//! Reaching end-of-file is not an error while following; the task suspends on
//! its change notifier and re-checks the file on every wakeup. Truncation and
//! replacement are detected by the size falling below the read position, which
//! restarts the read from offset 0; removal ends the stream unless reopen mode
//! is waiting for the file to come back.

use crate::error::{Result, TailfanError};
use log::debug;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::sync::{mpsc, watch};

use super::notifier::ChangeNotifier;
use super::{LineEvent, WatchOptions};

/// Reads one file and forwards its lines as events on an owned channel.
pub(crate) struct Follower {
    path: PathBuf,
    options: WatchOptions,
    notifier: Option<ChangeNotifier>,
    tx: mpsc::Sender<LineEvent>,
    stop: watch::Receiver<bool>,
    /// Byte position reached in the current incarnation of the file.
    position: u64,
}

/// Why a wait ended.
enum Wake {
    Changed,
    Stopped,
}

/// Result of re-checking the file after a wakeup.
enum FileCheck {
    Unchanged,
    Reopened(BufReader<File>),
    Stopped,
}

impl Follower {
    pub(crate) fn new(
        path: PathBuf,
        start_offset: u64,
        options: WatchOptions,
        notifier: Option<ChangeNotifier>,
        tx: mpsc::Sender<LineEvent>,
        stop: watch::Receiver<bool>,
    ) -> Self {
        Self {
            path,
            options,
            notifier,
            tx,
            stop,
            position: start_offset,
        }
    }

    /// Entry point for the spawned task. A fatal error becomes the stream's
    /// final event; the channel closing marks the end either way.
    pub(crate) async fn run(mut self) {
        if let Err(err) = self.stream().await {
            let _ = self.tx.send(LineEvent::Error(err)).await;
        }
    }

    async fn stream(&mut self) -> Result<()> {
        let mut reader = match self.open().await? {
            Some(reader) => reader,
            None => return Ok(()), // stopped while waiting for the file
        };

        // Accumulates one line across reads; an unterminated tail stays here
        // until its newline arrives (or EOF ends a non-follow run).
        let mut buf: Vec<u8> = Vec::new();

        loop {
            if self.stopped() {
                return Ok(());
            }

            let read = reader
                .read_until(b'\n', &mut buf)
                .await
                .map_err(|e| self.read_error(e))?;
            self.position += read as u64;

            if buf.last() == Some(&b'\n') {
                let line = take_line(&mut buf);
                if self.tx.send(LineEvent::Line(line)).await.is_err() {
                    return Ok(()); // consumer dropped the stream
                }
                continue;
            }

            // End of file, possibly with a partial final line in `buf`.
            if !self.options.follow {
                if !buf.is_empty() {
                    let line = take_line(&mut buf);
                    let _ = self.tx.send(LineEvent::Line(line)).await;
                }
                return Ok(());
            }

            match self.wait_for_change().await {
                Wake::Stopped => return Ok(()),
                Wake::Changed => match self.check_file().await? {
                    FileCheck::Unchanged => {}
                    FileCheck::Reopened(fresh) => {
                        reader = fresh;
                        buf.clear();
                    }
                    FileCheck::Stopped => return Ok(()),
                },
            }
        }
    }

    /// Open the file and seek to the starting offset. In reopen mode a
    /// missing file is waited for; returns `None` if stopped while waiting.
    async fn open(&mut self) -> Result<Option<BufReader<File>>> {
        match File::open(&self.path).await {
            Ok(mut file) => {
                if self.position > 0 {
                    file.seek(std::io::SeekFrom::Start(self.position))
                        .await
                        .map_err(|e| self.read_error(e))?;
                }
                Ok(Some(BufReader::new(file)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if !self.options.reopen {
                    return Err(TailfanError::file_not_found(&self.path));
                }
                debug!("{}: not found; waiting for creation", self.path.display());
                self.position = 0;
                self.open_when_present().await
            }
            Err(e) => Err(self.read_error(e)),
        }
    }

    /// Re-check the file after a change wakeup while at end-of-file.
    async fn check_file(&mut self) -> Result<FileCheck> {
        let len = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if !self.options.reopen {
                    return Err(TailfanError::file_not_found(&self.path));
                }
                debug!("{}: removed; waiting for recreation", self.path.display());
                return match self.open_when_present().await? {
                    Some(reader) => Ok(FileCheck::Reopened(reader)),
                    None => Ok(FileCheck::Stopped),
                };
            }
            Err(e) => return Err(self.read_error(e)),
        };

        if len >= self.position {
            // Same or grown file; the next read picks up where we left off.
            return Ok(FileCheck::Unchanged);
        }

        debug!(
            "{}: size fell from {} to {}; re-reading from the start",
            self.path.display(),
            self.position,
            len
        );
        match File::open(&self.path).await {
            Ok(file) => {
                self.position = 0;
                Ok(FileCheck::Reopened(BufReader::new(file)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // Removed between the stat and the open.
                if !self.options.reopen {
                    return Err(TailfanError::file_not_found(&self.path));
                }
                match self.open_when_present().await? {
                    Some(reader) => Ok(FileCheck::Reopened(reader)),
                    None => Ok(FileCheck::Stopped),
                }
            }
            Err(e) => Err(self.read_error(e)),
        }
    }

    /// Block until the file exists again, rechecking on every wakeup.
    /// Only reachable in reopen mode. Returns `None` when stopped.
    async fn open_when_present(&mut self) -> Result<Option<BufReader<File>>> {
        loop {
            match self.wait_for_change().await {
                Wake::Stopped => return Ok(None),
                Wake::Changed => match File::open(&self.path).await {
                    Ok(file) => {
                        self.position = 0;
                        return Ok(Some(BufReader::new(file)));
                    }
                    Err(e) if e.kind() == ErrorKind::NotFound => continue,
                    Err(e) => return Err(self.read_error(e)),
                },
            }
        }
    }

    /// Suspend until the file may have changed or stop is requested.
    async fn wait_for_change(&mut self) -> Wake {
        let notifier = match self.notifier.as_mut() {
            Some(notifier) => notifier,
            // Follow mode always carries a notifier; treat its absence as a
            // stop rather than spinning.
            None => return Wake::Stopped,
        };
        tokio::select! {
            changed = self.stop.changed() => {
                // A dropped sender counts as stop.
                let _ = changed;
                Wake::Stopped
            }
            _ = notifier.wait() => Wake::Changed,
        }
    }

    fn stopped(&self) -> bool {
        *self.stop.borrow()
    }

    fn read_error(&self, source: std::io::Error) -> TailfanError {
        TailfanError::file_error(format!("Failed to read {}", self.path.display()), source)
    }
}

/// Take the accumulated line out of `buf`, stripping the `\n` terminator and
/// a preceding `\r` if present.
fn take_line(buf: &mut Vec<u8>) -> String {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    let line = String::from_utf8_lossy(buf).into_owned();
    buf.clear();
    line
}
