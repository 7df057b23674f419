use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[clap(version, about = "Captures camera snapshots and turns each night into a timelapse")]
pub struct MainArgs {
    /// The path to the config file
    #[clap(long, short)]
    pub config: PathBuf,

    /// The folder in which to write rolling log files
    #[clap(long, default_value = "logs")]
    pub log_dir: PathBuf,

    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
#[clap(rename_all = "kebab-case")]
pub enum Command {
    /// Capture snapshots, build the daily video and serve videos (default)
    Run,

    /// Take a single snapshot and exit
    Snapshot,

    /// Build the video for the most recent window right now
    Video {
        /// Do not send the notification email
        #[clap(long)]
        no_email: bool,
    },

    /// Print the videos currently on disk
    Videos,
}
