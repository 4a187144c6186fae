//! Session orchestration.
//!
//! A session turns the run configuration into one watcher + printer pair per
//! input file, all sharing a single output sink and a single stop broadcast.
//! Startup is synchronous and all-or-nothing so the shared filename column
//! width is known before any output; after that the per-file tasks are fully
//! independent until they finish or the stop broadcast reaches them.

use crate::color::{self, AnsiColor, ColorMode};
use crate::config::Config;
use crate::error::{Result, TailfanError};
use crate::position;
use crate::printer::{Sink, StreamPrinter};
use crate::watch::{FileWatcher, Shutdown};
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tokio::task::JoinSet;

/// One input file prepared for watching.
///
/// Immutable after construction; the follower owns all further state. Holds
/// the watcher's inputs by composition rather than wrapping the watcher type.
#[derive(Debug, Clone)]
pub struct WatchTarget {
    pub path: PathBuf,
    pub basename: String,
    /// Byte offset the stream starts from; 0 when the file is still to appear.
    pub start_offset: u64,
    /// `None` when color output is disabled.
    pub color: Option<AnsiColor>,
    /// Shared across all targets of a run so headers align.
    pub name_width: usize,
}

impl WatchTarget {
    /// Header prefix for this file's lines; empty when name printing is off.
    pub fn header(&self, print_names: bool) -> String {
        if !print_names {
            return String::new();
        }
        let padded = format!("{:>width$}", self.basename, width = self.name_width);
        match self.color {
            Some(color) => format!("{}: ", color.wrap(&padded)),
            None => format!("{}: ", padded),
        }
    }
}

/// Orchestrates one run of the utility.
pub struct Session {
    config: Config,
    shutdown: Shutdown,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            shutdown: Shutdown::new(),
        }
    }

    /// Stop handle for this session. The signal task uses it; tests and
    /// embedders may trigger it directly.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Run to completion against standard output.
    pub async fn run(self) -> Result<()> {
        self.run_with_sink(tokio::io::stdout()).await
    }

    /// Run with an injected sink.
    ///
    /// Returns `Ok(())` when every stream finished normally or the session was
    /// stopped; otherwise the first stream error, after all tasks have been
    /// joined.
    pub async fn run_with_sink<W>(self, writer: W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let targets = self.prepare_targets()?;

        // All-or-nothing startup: every watcher must open before any printer
        // task starts, so a bad path never produces partial output.
        let options = self.config.watch_options();
        let mut streams = Vec::with_capacity(targets.len());
        for target in &targets {
            streams.push(FileWatcher::open(
                &target.path,
                target.start_offset,
                options,
                self.shutdown.subscribe(),
            )?);
        }

        let signal_stop = self.shutdown.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            debug!("termination signal received; stopping all watchers");
            signal_stop.trigger();
        });

        let sink = Arc::new(Sink::new(writer));
        let print_names = self.config.print_names();
        let mut tasks: JoinSet<Result<()>> = JoinSet::new();
        for (target, stream) in targets.iter().zip(streams) {
            let printer = StreamPrinter::new(target.header(print_names));
            let sink = Arc::clone(&sink);
            tasks.spawn(async move { printer.run(stream, &sink).await });
        }

        // Join everything. The first failure wins and stops the siblings, but
        // every task still gets to drain and exit before we report.
        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let result = match joined {
                Ok(result) => result,
                Err(join_err) => Err(TailfanError::other(format!(
                    "printer task failed: {join_err}"
                ))),
            };
            if let Err(err) = result {
                if first_error.is_none() {
                    self.shutdown.trigger();
                    first_error = Some(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Initializing phase: shared column width, tail offsets, colors.
    ///
    /// Runs sequentially in input order. A missing file fails the whole run
    /// unless reopen mode substitutes a start offset of 0 and waits for it.
    fn prepare_targets(&self) -> Result<Vec<WatchTarget>> {
        if self.config.paths.is_empty() {
            return Err(TailfanError::invalid_argument(
                "at least one file path is required",
            ));
        }

        let name_width = self
            .config
            .paths
            .iter()
            .map(|path| basename(path).chars().count())
            .max()
            .unwrap_or(0);

        let lines = self.config.line_count();
        let mut targets = Vec::with_capacity(self.config.paths.len());
        for (index, path) in self.config.paths.iter().enumerate() {
            let start_offset = match position::tail_offset(path, lines) {
                Ok(offset) => offset,
                Err(TailfanError::FileNotFound { .. }) if self.config.reopen => 0,
                Err(err) => return Err(err),
            };
            let basename = basename(path);
            let color = match self.config.color_mode {
                ColorMode::Never => None,
                ColorMode::Auto => {
                    Some(color::resolve(&basename, index, self.config.consistent_color))
                }
            };
            targets.push(WatchTarget {
                path: path.clone(),
                basename,
                start_offset,
                color,
                name_width,
            });
        }
        Ok(targets)
    }
}

/// Display basename for a path; falls back to the full path text for paths
/// without a final component.
fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Resolve when a termination signal arrives: hang-up, interrupt, terminate,
/// or quit on unix; ctrl-c elsewhere.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        if let Err(err) = unix_signals().await {
            log::warn!("signal handler setup failed ({err}); falling back to ctrl-c");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[cfg(unix)]
async fn unix_signals() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = hangup.recv() => {}
        _ = interrupt.recv() => {}
        _ = terminate.recv() => {}
        _ = quit.recv() => {}
    }
    Ok(())
}
