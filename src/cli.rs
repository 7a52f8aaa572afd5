//! Command-line interface definitions for sunline.
//!
//! Global options can be given as flags or environment variables.

use clap::{Parser, Subcommand};

/// Command-line arguments for sunline.
///
/// # Examples
///
/// ```sh
/// # Crawl the camera network and show the best sunrise or sunset feed
/// sunline --gazetteer ./cities500.txt best
///
/// # Save a crawl once, then replay it
/// sunline crawl --output ./cams.json
/// sunline --locations ./cams.json sunset --json
///
/// # Keep one session open and look up repeatedly
/// sunline interactive
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// GeoNames style place dump (cities500.txt)
    #[arg(short, long, env = "SUNLINE_GAZETTEER", default_value = "cities500.txt")]
    pub gazetteer: String,

    /// Optional path to a config.yaml with crawler settings
    #[arg(short, long, env = "SUNLINE_CONFIG")]
    pub config: Option<String>,

    /// Replay a crawl saved with `crawl --output` instead of crawling
    #[arg(short, long)]
    pub locations: Option<String>,

    /// Print lookup results as JSON
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Camera closest to the current sunrise line
    Sunrise,
    /// Camera closest to the current sunset line
    Sunset,
    /// Whichever of sunrise or sunset has the closer camera
    Best,
    /// Crawl the camera network and save the raw camera list
    Crawl {
        /// Where to write the camera list JSON
        #[arg(short, long)]
        output: String,
    },
    /// Read `sunrise`, `sunset`, `best`, `reset` or `quit` from stdin
    Interactive,
}
