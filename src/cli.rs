//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Mirror a photo-gallery user's albums into a static HTML site.
///
/// Downloads album covers and photo thumbnails, renders an index page and one
/// page per album, and skips anything already up to date on disk.
#[derive(Parser, Debug)]
#[command(name = "picasa-dl")]
#[command(author, version, about)]
pub struct Args {
    /// User ID whose albums are mirrored [default: sample.user]
    pub user_id: Option<String>,

    /// Destination directory (created if missing) [default: current directory]
    #[arg(short, long, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Repeat the mirror every N seconds (0 runs once)
    #[arg(short, long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Collection feed prefix; the user ID is appended
    #[arg(long, value_name = "URL")]
    pub feed_url: Option<String>,

    /// Do not download the page stylesheet
    #[arg(long)]
    pub no_stylesheet: bool,

    /// Re-download existing images that fail to decode
    #[arg(long)]
    pub validate_images: bool,

    /// In-flight unit count above which spawning slows down (1-100000)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..=100_000))]
    pub max_in_flight: Option<u64>,

    /// Read settings from this file instead of the default config location
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
