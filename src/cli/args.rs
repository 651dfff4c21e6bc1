//! CLI argument parsing using clap.

use clap::{
    Args, Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Mirror directory trees as they change
#[derive(Parser, Debug)]
#[command(
    name = "watchcopy",
    version = env!("CARGO_PKG_VERSION"),
    about = "Mirror directory trees as they change",
    long_about = "Watch source directories recursively and copy every change into a destination tree.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize project
    #[command(about = "Set up .watchcopy directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings from .watchcopy/settings.toml")]
    Config,

    /// Watch and mirror
    #[command(
        about = "Watch source trees and copy changes to their destinations",
        after_help = "Examples:\n  watchcopy watch --from build/classes --to /srv/app/classes\n  watchcopy watch -Dwatchcopy.from[0]=build -Dwatchcopy.to[0]=/srv/app\n  watchcopy watch            # pairs from [[mirrors]] in settings.toml"
    )]
    Watch(WatchArgs),
}

#[derive(Args, Debug, Default, Clone)]
pub struct WatchArgs {
    /// Source directory (repeatable, paired with --to by position)
    #[arg(long, value_name = "DIR")]
    pub from: Vec<String>,

    /// Destination directory (repeatable, paired with --from by position)
    #[arg(long, value_name = "DIR")]
    pub to: Vec<String>,

    /// Indexed property, e.g. -Dwatchcopy.from[0]=build
    #[arg(short = 'D', value_name = "KEY=VALUE")]
    pub defines: Vec<String>,

    /// Upper bound for one wait on notifications, in seconds (overrides config)
    #[arg(long, value_name = "SECS")]
    pub poll_timeout: Option<u64>,

    /// Do not copy entries already inside newly created directories
    #[arg(long)]
    pub no_sync: bool,
}
