//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Fetch the video and audio streams of one asset and merge them into an MP4.
///
/// SOURCE is the URL of a JSON stream manifest. Flags override values from
/// the config file, which override built-in defaults.
#[derive(Parser, Debug)]
#[command(name = "avfetch")]
#[command(author, version, about)]
pub struct Args {
    /// Stream manifest URL
    pub source: Option<String>,

    /// Directory the per-asset folder is created in
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Attempts per stream, including the first (1-10) [default: 3]
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_attempts: Option<u32>,

    /// Delay between attempts in milliseconds (max 60000) [default: 2000]
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub retry_delay_ms: Option<u64>,

    /// Minimum preferred video height before falling back to 720p (144-4320) [default: 720]
    #[arg(long, value_parser = clap::value_parser!(u32).range(144..=4320))]
    pub resolution_floor: Option<u32>,

    /// Fetch video and audio concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Path to the ffmpeg executable [default: ffmpeg]
    #[arg(long, value_name = "PATH")]
    pub ffmpeg: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
