//! Line formatting and the shared output sink.
//!
//! Every stream printer owns its precomputed header; the sink is the single
//! object shared between concurrent printers and guarantees that one formatted
//! line is written as one indivisible unit.

use crate::error::{Result, TailfanError};
use crate::watch::{LineEvent, LineSource};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Shared, serialized output sink.
pub struct Sink<W> {
    writer: Mutex<W>,
}

impl<W: AsyncWrite + Unpin + Send> Sink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Write one complete formatted line.
    ///
    /// The mutex spans both the write and the flush, so concurrent printers
    /// never interleave partial lines and every line is visible before the
    /// lock is released.
    pub async fn write_line(&self, line: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer
            .write_all(line)
            .await
            .map_err(|e| TailfanError::WriteError { source: e })?;
        writer
            .flush()
            .await
            .map_err(|e| TailfanError::WriteError { source: e })?;
        Ok(())
    }

    /// Recover the underlying writer once all printers are done.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

/// Consumes one file's line events and writes prefixed lines to the sink.
pub struct StreamPrinter {
    header: String,
}

impl StreamPrinter {
    /// `header` is the already-formatted prefix (possibly empty) prepended to
    /// every line of this stream.
    pub fn new(header: String) -> Self {
        Self { header }
    }

    /// Drain `source` into `sink`.
    ///
    /// Ends normally when the source is exhausted. An error event or a sink
    /// write failure ends this stream immediately and becomes the result;
    /// sibling streams are unaffected at this level.
    pub async fn run<S, W>(&self, mut source: S, sink: &Sink<W>) -> Result<()>
    where
        S: LineSource,
        W: AsyncWrite + Unpin + Send,
    {
        while let Some(event) = source.next_event().await {
            match event {
                LineEvent::Line(text) => {
                    let mut line = String::with_capacity(self.header.len() + text.len() + 1);
                    line.push_str(&self.header);
                    line.push_str(&text);
                    line.push('\n');
                    sink.write_line(line.as_bytes()).await?;
                }
                LineEvent::Error(err) => return Err(err),
            }
        }
        Ok(())
    }
}
