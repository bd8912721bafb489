//! Command-line interface for the scenario runner

use clap::Parser;
use std::path::PathBuf;

/// Run a scripted combat scenario and print the event log
#[derive(Parser, Debug)]
#[command(name = "combat_sim")]
#[command(about = "Headless tab-target combat scenario runner")]
#[command(version)]
pub struct Args {
    /// Scenario file to run
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,

    /// Combat constants (TOML); built-in defaults when omitted
    #[arg(long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Directory of ability and effect definitions
    #[arg(long, value_name = "DIR", default_value = "content")]
    pub content: PathBuf,

    /// Override the scenario's tick length in seconds
    #[arg(long)]
    pub tick: Option<f64>,

    /// Print events as JSON lines instead of debug text
    #[arg(long)]
    pub json: bool,
}

pub fn parse_args() -> Args {
    Args::parse()
}
