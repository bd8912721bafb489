//! combat_sim - run a combat scenario against the in-memory sandbox host
//!
//! ```text
//! combat_sim scenarios/duel.toml --config config/combat.toml --content content
//! ```

mod cli;
mod scenario;

use anyhow::{Context, Result};
use combat_core::CombatConfig;
use content_core::ContentRegistry;
use scenario::Scenario;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let args = cli::parse_args();
    init_logging();

    let config = match &args.config {
        Some(path) => CombatConfig::load_from_path(path)
            .with_context(|| format!("Failed to load combat config {}", path.display()))?,
        None => CombatConfig::default(),
    };
    let content = ContentRegistry::load(&args.content)
        .with_context(|| format!("Failed to load content from {}", args.content.display()))?;
    let scenario = Scenario::load_from_file(&args.scenario)
        .with_context(|| format!("Failed to load scenario {}", args.scenario.display()))?;

    let tick = args.tick.unwrap_or(scenario.tick);
    info!(
        scenario = %args.scenario.display(),
        duration = scenario.duration,
        tick,
        "Running scenario"
    );
    let log = scenario::run(&scenario, config, &content, tick)?;

    for entry in &log {
        if args.json {
            println!("{}", serde_json::to_string(entry).context("Failed to encode event")?);
        } else {
            println!("[{:>7.2}] {:?}", entry.time, entry.event);
        }
    }
    info!(events = log.len(), "Scenario finished");
    Ok(())
}
