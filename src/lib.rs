//! # tailfan - Multi-File Tail
//!
//! A terminal utility that prints the most recent lines of several files at
//! once and optionally keeps following them, prefixing every line with a
//! colorized filename header so interleaved output stays readable.
//!
//! ## Features
//!
//! - **Backward tail positioning**: the starting byte offset for the last N
//!   lines is located by scanning backward from end-of-file, so large files
//!   are never read in full
//! - **Follow and reopen modes**: keep streaming appended lines, surviving
//!   truncation and log rotation when asked to
//! - **Deterministic colors**: filename headers are colored from a fixed
//!   palette, either by input position or by a stable filename hash
//! - **Interleaving-safe output**: concurrent streams share one sink that
//!   writes whole lines only
//!
//! ## Architecture
//!
//! The library is organized into focused modules:
//!
//! - [`error`] - Centralized error types and handling
//! - [`position`] - Backward scan locating where the last N lines begin
//! - [`color`] - Filename color assignment over a fixed ANSI palette
//! - [`watch`] - Per-file follower tasks producing line events
//! - [`printer`] - Line formatting and the shared output sink
//! - [`app`] - Session orchestration and coordinated shutdown

// Core modules
pub mod error;
pub mod position;

// Per-file streaming
pub mod printer;
pub mod watch;

// Session coordination
pub mod app;
pub mod color;
pub mod config;

// Re-export commonly used types for convenience
pub use error::{Result, TailfanError};

// Public API surface for external usage
pub use app::Session;
pub use config::Config;
pub use watch::{FileWatcher, LineEvent, LineSource, Shutdown};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
