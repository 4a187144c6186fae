//! Immutable run configuration, assembled once from the command line and
//! passed into the session by value. No process-wide mutable flag state.

use crate::color::ColorMode;
use crate::watch::WatchOptions;
use std::path::PathBuf;
use std::time::Duration;

/// Trailing line count used when `-n` asks for 0 lines or is absent.
pub const DEFAULT_LINES: u64 = 10;

/// Tick period for `--poll` mode and for the missing-file wait in reopen mode.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Everything one run needs to know, fixed at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Input files, in argument order. Order decides positional colors.
    pub paths: Vec<PathBuf>,
    /// Keep streaming after end-of-file (`-f`).
    pub follow: bool,
    /// Follow and tolerate missing or rotated files (`-F`); implies follow.
    pub reopen: bool,
    /// Interval polling instead of filesystem notification (`--poll`).
    pub poll: bool,
    /// Requested trailing line count; 0 means the default.
    pub lines: u64,
    /// Suppress filename headers even with multiple files (`-q`).
    pub quiet: bool,
    /// Whether headers may be colorized.
    pub color_mode: ColorMode,
    /// Hash-based instead of positional color assignment.
    pub consistent_color: bool,
}

impl Config {
    /// Effective trailing line count; a requested 0 means the default.
    pub fn line_count(&self) -> u64 {
        if self.lines == 0 {
            DEFAULT_LINES
        } else {
            self.lines
        }
    }

    /// Filename headers are printed for multi-file runs unless suppressed.
    pub fn print_names(&self) -> bool {
        self.paths.len() > 1 && !self.quiet
    }

    /// Watcher behavior for every file in this run.
    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            follow: self.follow || self.reopen,
            reopen: self.reopen,
            poll: self.poll,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            follow: false,
            reopen: false,
            poll: false,
            lines: DEFAULT_LINES,
            quiet: false,
            color_mode: ColorMode::Auto,
            consistent_color: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_lines_means_default() {
        let config = Config {
            lines: 0,
            ..Config::default()
        };
        assert_eq!(config.line_count(), DEFAULT_LINES);

        let config = Config {
            lines: 3,
            ..Config::default()
        };
        assert_eq!(config.line_count(), 3);
    }

    #[test]
    fn test_print_names_needs_multiple_files() {
        let one = Config {
            paths: vec![PathBuf::from("a.log")],
            ..Config::default()
        };
        assert!(!one.print_names());

        let two = Config {
            paths: vec![PathBuf::from("a.log"), PathBuf::from("b.log")],
            ..Config::default()
        };
        assert!(two.print_names());

        let quiet = Config {
            quiet: true,
            ..two
        };
        assert!(!quiet.print_names());
    }

    #[test]
    fn test_reopen_implies_follow() {
        let config = Config {
            reopen: true,
            ..Config::default()
        };
        let options = config.watch_options();
        assert!(options.follow);
        assert!(options.reopen);
    }
}
