//! Scripted scenarios: who is fighting, what they do and when
//!
//! A scenario is a TOML file listing entities and timed commands. The runner
//! spawns the entities in a `SandboxWorld`, then steps `CombatCore` at a fixed
//! tick, issuing each command once the clock reaches its timestamp.

use anyhow::{bail, Context, Result};
use combat_core::sandbox::SandboxWorld;
use combat_core::{CombatConfig, CombatCore, CombatEvent, CombatHost};
use combat_types::{CombatEntityId, Position, ResourceKind};
use content_core::ContentRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// Commands fire when the clock is within this of their timestamp
const COMMAND_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Simulated seconds to run
    pub duration: f64,
    #[serde(default = "default_tick")]
    pub tick: f64,
    pub entities: Vec<EntitySpec>,
    #[serde(default)]
    pub commands: Vec<Command>,
}

fn default_tick() -> f64 {
    0.1
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntitySpec {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub position: Position,
    pub health: f64,
    #[serde(default)]
    pub team: u8,
    #[serde(default)]
    pub resource: Option<ResourceKind>,
    #[serde(default)]
    pub target: Option<u64>,
    /// Ability ids, filling the action bar from slot 0
    #[serde(default)]
    pub abilities: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Command {
    /// Seconds since the scenario started
    pub at: f64,
    pub entity: u64,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Cast { slot: usize },
    Interrupt {
        #[serde(default)]
        lockout: Option<f64>,
    },
    Move { position: Position },
    Target { target: Option<u64> },
    Taunt { enemy: u64 },
    Kill,
}

/// One line of the combat log
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub time: f64,
    #[serde(flatten)]
    pub event: CombatEvent,
}

impl Scenario {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).context("Failed to read scenario file")?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let mut scenario: Scenario = toml::from_str(contents).context("Failed to parse scenario")?;
        scenario.validate()?;
        scenario
            .commands
            .sort_by(|a, b| a.at.total_cmp(&b.at));
        Ok(scenario)
    }

    fn validate(&self) -> Result<()> {
        if self.duration <= 0.0 {
            bail!("duration must be positive");
        }
        if self.tick <= 0.0 {
            bail!("tick must be positive");
        }
        if self.entities.is_empty() {
            bail!("scenario has no entities");
        }

        let mut ids = HashSet::new();
        for entity in &self.entities {
            if !ids.insert(entity.id) {
                bail!("duplicate entity id {}", entity.id);
            }
            if entity.health <= 0.0 {
                bail!("entity {} must start with positive health", entity.id);
            }
        }
        let known = |id: u64| ids.contains(&id);
        for entity in &self.entities {
            if let Some(target) = entity.target {
                if !known(target) {
                    bail!("entity {} targets unknown entity {}", entity.id, target);
                }
            }
        }
        for command in &self.commands {
            if !known(command.entity) {
                bail!("command at {}s references unknown entity {}", command.at, command.entity);
            }
            if command.at < 0.0 {
                bail!("command at {}s is scheduled before the start", command.at);
            }
            match command.action {
                Action::Taunt { enemy } if !known(enemy) => {
                    bail!("taunt at {}s references unknown entity {}", command.at, enemy);
                }
                Action::Target { target: Some(target) } if !known(target) => {
                    bail!("target at {}s references unknown entity {}", command.at, target);
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Build the world and core for a scenario, then run it to completion
pub fn run(
    scenario: &Scenario,
    config: CombatConfig,
    content: &ContentRegistry,
    tick: f64,
) -> Result<Vec<LogEntry>> {
    if tick <= 0.0 {
        bail!("tick must be positive");
    }

    let mut world = SandboxWorld::new();
    let mut core = CombatCore::new(config);

    for spec in &scenario.entities {
        let id = CombatEntityId(spec.id);
        world.spawn(id, spec.position, spec.health, spec.team);
        world.set_target(id, spec.target.map(CombatEntityId));
        core.register_entity(id, spec.resource);

        let bar = content
            .loadout(&spec.abilities)
            .with_context(|| format!("Invalid action bar for entity {}", spec.id))?;
        core.load_abilities(id, bar)
            .with_context(|| format!("Action bar too long for entity {}", spec.id))?;
        info!(
            entity = %id,
            name = spec.name.as_deref().unwrap_or("-"),
            abilities = spec.abilities.len(),
            "Spawned"
        );
    }

    let mut log = Vec::new();
    let mut dead = HashSet::new();
    let mut next_command = 0;
    let mut clock = 0.0;

    while clock < scenario.duration - COMMAND_EPSILON {
        while let Some(command) = scenario.commands.get(next_command) {
            if command.at > clock + COMMAND_EPSILON {
                break;
            }
            apply_command(&mut core, &mut world, command);
            next_command += 1;
        }
        // Command results carry the time they were issued
        record(&mut log, &mut core, clock);

        core.tick(tick, &mut world);
        clock += tick;
        reap_dead(&mut core, &world, &mut dead);
        record(&mut log, &mut core, clock);
    }

    if next_command < scenario.commands.len() {
        warn!(
            skipped = scenario.commands.len() - next_command,
            "Commands scheduled after the scenario ended"
        );
    }
    Ok(log)
}

fn record(log: &mut Vec<LogEntry>, core: &mut CombatCore, time: f64) {
    log.extend(
        core.drain_events()
            .into_iter()
            .map(|event| LogEntry { time, event }),
    );
}

fn apply_command(core: &mut CombatCore, world: &mut SandboxWorld, command: &Command) {
    let entity = CombatEntityId(command.entity);
    debug!(%entity, at = command.at, action = ?command.action, "Command");

    match &command.action {
        Action::Cast { slot } => {
            if let Err(error) = core.try_execute_ability(entity, *slot, world) {
                info!(%entity, slot, %error, "Ability rejected");
            }
        }
        Action::Interrupt { lockout } => {
            let interrupted = match lockout {
                Some(duration) => core.interrupt_with_lockout(entity, Some(*duration)),
                None => core.interrupt(entity),
            };
            if !interrupted {
                debug!(%entity, "Nothing to interrupt");
            }
        }
        Action::Move { position } => world.move_to(entity, *position),
        Action::Target { target } => world.set_target(entity, target.map(CombatEntityId)),
        Action::Taunt { enemy } => core.taunt(entity, CombatEntityId(*enemy)),
        Action::Kill => world.kill(entity),
    }
}

/// Run death handling once for every entity that has just died
fn reap_dead<H: CombatHost + ?Sized>(
    core: &mut CombatCore,
    world: &H,
    dead: &mut HashSet<CombatEntityId>,
) {
    let newly_dead: Vec<CombatEntityId> = core
        .abilities()
        .registered()
        .filter(|&id| !dead.contains(&id) && world.is_dead(id))
        .collect();
    for id in newly_dead {
        core.handle_death(id, world);
        dead.insert(id);
    }
}
