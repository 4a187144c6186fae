//! tailfan - Multi-File Tail
//!
//! Print the most recent lines of several files at once and keep following
//! them, with a colorized filename header per line when more than one file is
//! watched.

use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use tailfan::color::ColorMode;
use tailfan::{Config, Session};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging for development
    env_logger::init();

    // Parse command-line arguments
    let matches = Command::new("tailfan")
        .version(tailfan::VERSION)
        .about("Print the last lines of files and keep following them")
        .long_about(
            "tailfan tails several files at once, prefixing every line with a \
             colorized filename header so interleaved output stays readable. \
             Standard input is not supported.",
        )
        .arg(
            Arg::new("files")
                .help("Files to tail")
                .value_name("FILE")
                .required(true)
                .num_args(1..),
        )
        .arg(
            Arg::new("follow")
                .short('f')
                .action(ArgAction::SetTrue)
                .help("Keep streaming after end of file is reached"),
        )
        .arg(
            Arg::new("reopen")
                .short('F')
                .action(ArgAction::SetTrue)
                .help("Like -f, and keep trying to open a missing or rotated file"),
        )
        .arg(
            Arg::new("poll")
                .long("poll")
                .action(ArgAction::SetTrue)
                .help("Poll for changes instead of using filesystem notifications"),
        )
        .arg(
            Arg::new("lines")
                .short('n')
                .value_name("NUM")
                .value_parser(clap::value_parser!(u64))
                .default_value("10")
                .help("Number of trailing lines to print initially"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .action(ArgAction::SetTrue)
                .help("Suppress printing of filename headers"),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .action(ArgAction::SetTrue)
                .help("Disable ANSI color output"),
        )
        .arg(
            Arg::new("consistent-color")
                .long("consistent-color")
                .action(ArgAction::SetTrue)
                .help("Choose colors by filename hash, stable across runs"),
        )
        .get_matches();

    let paths: Vec<PathBuf> = matches
        .get_many::<String>("files")
        .expect("files argument is required")
        .map(PathBuf::from)
        .collect();

    let config = Config {
        paths,
        follow: matches.get_flag("follow"),
        reopen: matches.get_flag("reopen"),
        poll: matches.get_flag("poll"),
        lines: *matches.get_one::<u64>("lines").expect("lines has a default"),
        quiet: matches.get_flag("quiet"),
        color_mode: if matches.get_flag("no-color") {
            ColorMode::Never
        } else {
            ColorMode::Auto
        },
        consistent_color: matches.get_flag("consistent-color"),
    };

    // A setup failure or the first stream error surfaces here; anyhow prints
    // the diagnostic to stderr and the process exits nonzero.
    Session::new(config).run().await?;

    Ok(())
}
