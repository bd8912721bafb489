//! End-to-end fights driven through `CombatCore` with content loaded from TOML

use combat_core::prelude::*;
use content_core::ContentRegistry;
use proptest::prelude::*;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

const ROGUE: CombatEntityId = CombatEntityId(1);
const MAGE: CombatEntityId = CombatEntityId(2);
const TROLL: CombatEntityId = CombatEntityId(10);

const ROGUE_CONTENT: &str = r#"
[[effects]]
id = "kidney_shot"
name = "Kidney Shot"
duration = 6.0
category = { type = "crowd_control", cc = "stun" }

[[effects]]
id = "rupture"
name = "Rupture"
duration = 8.0
category = { type = "damage_over_time", tick_damage = 10.0, tick_interval = 2.0 }

[[abilities]]
id = "sinister_strike"
name = "Sinister Strike"
range = 5.0
damage = 20.0
combo_points_generated = 1

[[abilities]]
id = "eviscerate"
name = "Eviscerate"
range = 5.0
damage = 50.0
consumes_combo_points = true

[[abilities]]
id = "kidney_shot"
name = "Kidney Shot"
range = 5.0
cooldown = 20.0
triggers_gcd = false
applies = ["kidney_shot"]

[[abilities]]
id = "rupture"
name = "Rupture"
range = 5.0
applies = ["rupture"]
"#;

const MAGE_CONTENT: &str = r#"
[[abilities]]
id = "pyroblast"
name = "Pyroblast"
range = 40.0
cast_time = 3.0
is_spell = true
cost = { kind = "mana", amount = 30.0 }
damage = 200.0
damage_type = "fire"

[[abilities]]
id = "blizzard"
name = "Blizzard"
range = 40.0
channel_ticks = 4
channel_tick_interval = 2.0
is_spell = true
cost = { kind = "mana", amount = 40.0 }
damage = 25.0
damage_type = "frost"
"#;

fn write_content(dir: &Path, name: &str, content: &str) {
    let path = dir.join(format!("{}.toml", name));
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
}

fn setup() -> (CombatCore, SandboxWorld) {
    let dir = TempDir::new().unwrap();
    write_content(dir.path(), "rogue", ROGUE_CONTENT);
    write_content(dir.path(), "mage", MAGE_CONTENT);
    let content = ContentRegistry::load(dir.path()).unwrap();

    let mut world = SandboxWorld::new();
    world.spawn(ROGUE, Position::new(2.0, 0.0, 0.0), 400.0, 0);
    world.spawn(MAGE, Position::new(0.0, 20.0, 0.0), 250.0, 0);
    world.spawn(TROLL, Position::default(), 10_000.0, 1);
    world.set_target(ROGUE, Some(TROLL));
    world.set_target(MAGE, Some(TROLL));

    let mut core = CombatCore::default();
    core.register_class(ROGUE, CharacterClass::Rogue);
    core.register_class(MAGE, CharacterClass::Mage);
    core.register_entity(TROLL, None);

    let rogue_bar = content
        .loadout(&["sinister_strike", "eviscerate", "kidney_shot", "rupture"])
        .unwrap();
    core.load_abilities(ROGUE, rogue_bar).unwrap();
    let mage_bar = content.loadout(&["pyroblast", "blizzard"]).unwrap();
    core.load_abilities(MAGE, mage_bar).unwrap();

    (core, world)
}

fn run(core: &mut CombatCore, world: &mut SandboxWorld, seconds: f64, step: f64) {
    let steps = (seconds / step).round() as usize;
    for _ in 0..steps {
        core.tick(step, world);
    }
}

fn troll_health(world: &SandboxWorld) -> f64 {
    world.entity(TROLL).unwrap().health
}

#[test]
fn test_builder_finisher_rotation() {
    let (mut core, mut world) = setup();

    for _ in 0..5 {
        core.try_execute_ability(ROGUE, 0, &mut world).unwrap();
        run(&mut core, &mut world, 1.5, 0.1);
    }
    assert_eq!(core.resources().combo_points(ROGUE), 5);

    // A sixth builder does not overflow the cap
    core.try_execute_ability(ROGUE, 0, &mut world).unwrap();
    run(&mut core, &mut world, 1.5, 0.1);
    assert_eq!(core.resources().combo_points(ROGUE), 5);

    let before = troll_health(&world);
    core.try_execute_ability(ROGUE, 1, &mut world).unwrap();
    // 50 × (1 + 5 × 0.2)
    assert!((before - troll_health(&world) - 100.0).abs() < 1e-9);
    assert_eq!(core.resources().combo_points(ROGUE), 0);
}

#[test]
fn test_stun_diminishes_to_immunity() {
    let (mut core, mut world) = setup();
    let expected = [6.0, 3.0, 1.5];

    for duration in expected {
        core.abilities_mut().reset_all_cooldowns(ROGUE);
        core.try_execute_ability(ROGUE, 2, &mut world).unwrap();
        let remaining = core.effects().remaining_duration(TROLL, "kidney_shot").unwrap();
        assert!((remaining - duration).abs() < 1e-9);
        run(&mut core, &mut world, 6.0, 0.5);
    }

    assert!(core.diminishing().is_immune(TROLL, CcCategory::Stun));
    core.abilities_mut().reset_all_cooldowns(ROGUE);
    let err = core.try_execute_ability(ROGUE, 2, &mut world).unwrap_err();
    assert_eq!(err, AbilityError::TargetImmune(CcCategory::Stun));
    assert_eq!(err.kind(), ErrorKind::TargetInvalid);
}

#[test]
fn test_dot_threat_goes_to_applier() {
    let (mut core, mut world) = setup();
    core.try_execute_ability(ROGUE, 3, &mut world).unwrap();
    run(&mut core, &mut world, 8.0, 0.5);

    // Four ticks of 10
    assert!((troll_health(&world) - 9960.0).abs() < 1e-9);
    assert!((core.threat().threat(ROGUE, TROLL) - 40.0).abs() < 1e-9);
    assert!(!core.effects().has_effect(TROLL, "rupture"));
}

#[test]
fn test_mage_pulls_aggro_after_update() {
    let (mut core, mut world) = setup();
    core.try_execute_ability(ROGUE, 0, &mut world).unwrap();
    core.tick(0.1, &mut world);
    assert_eq!(core.threat().current_target(TROLL), Some(ROGUE));

    core.try_execute_ability(MAGE, 0, &mut world).unwrap();
    run(&mut core, &mut world, 3.0, 0.1);
    assert!((core.threat().threat(MAGE, TROLL) - 200.0).abs() < 1e-9);

    // Threat lands with the cast, the switch on the following tick
    core.tick(0.1, &mut world);
    // 200 against 20 is far past the melee margin
    assert_eq!(core.threat().current_target(TROLL), Some(MAGE));
    let events = core.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        CombatEvent::AggroChanged {
            previous: Some(ROGUE),
            current: Some(MAGE),
            ..
        }
    )));
}

#[test]
fn test_kick_interrupts_pyroblast() {
    let (mut core, mut world) = setup();
    core.try_execute_ability(MAGE, 0, &mut world).unwrap();
    run(&mut core, &mut world, 2.0, 0.1);

    assert!(core.interrupt_with_lockout(MAGE, None));
    run(&mut core, &mut world, 2.0, 0.1);
    assert!((troll_health(&world) - 10_000.0).abs() < f64::EPSILON);
    let mana = core.resources().current(MAGE).unwrap();
    assert!((mana - 78.0).abs() < 1e-9);

    let err = core.try_execute_ability(MAGE, 1, &mut world).unwrap_err();
    assert!(matches!(err, AbilityError::LockedOut { .. }));
}

#[test]
fn test_draining_ability_queue_keeps_routing() {
    let (mut core, mut world) = setup();
    core.try_execute_ability(ROGUE, 0, &mut world).unwrap();
    assert!(!core.abilities_mut().drain_events().is_empty());

    run(&mut core, &mut world, 1.5, 0.1);
    assert!((core.threat().threat(ROGUE, TROLL) - 20.0).abs() < 1e-9);

    core.try_execute_ability(ROGUE, 0, &mut world).unwrap();
    core.abilities_mut().drain_events();
    core.tick(0.1, &mut world);
    assert!((core.threat().threat(ROGUE, TROLL) - 40.0).abs() < 1e-9);
    assert_eq!(core.resources().combo_points(ROGUE), 2);
}

#[test]
fn test_channel_with_coarse_ticks() {
    let (mut core, mut world) = setup();
    core.try_execute_ability(MAGE, 1, &mut world).unwrap();

    core.tick(5.0, &mut world);
    assert!(core.abilities().is_channeling(MAGE));
    assert!((troll_health(&world) - 9950.0).abs() < 1e-9);

    core.tick(5.0, &mut world);
    assert!(!core.abilities().is_channeling(MAGE));
    assert!((troll_health(&world) - 9900.0).abs() < 1e-9);
}

#[test]
fn test_death_interrupts_cast() {
    let (mut core, mut world) = setup();
    core.try_execute_ability(MAGE, 0, &mut world).unwrap();
    core.tick(1.0, &mut world);

    world.kill(MAGE);
    core.handle_death(MAGE, &world);
    assert!(!core.abilities().is_casting(MAGE));

    run(&mut core, &mut world, 3.0, 0.1);
    assert!((troll_health(&world) - 10_000.0).abs() < f64::EPSILON);
}

proptest! {
    /// Whatever the input sequence, a caster is never casting and channeling
    /// at once, and resources stay within bounds.
    #[test]
    fn prop_state_stays_consistent(
        actions in prop::collection::vec((0usize..2, 0.05f64..2.0, any::<bool>()), 1..40)
    ) {
        let (mut core, mut world) = setup();
        for (slot, delta, interrupt) in actions {
            let _ = core.try_execute_ability(MAGE, slot, &mut world);
            if interrupt {
                core.interrupt(MAGE);
            }
            core.tick(delta, &mut world);

            let state = core.abilities().cast_state(MAGE).unwrap();
            prop_assert!(!(state.is_casting() && state.is_channeling()));
            let mana = core.resources().current(MAGE).unwrap();
            prop_assert!((0.0..=100.0).contains(&mana));
            prop_assert!(core.abilities().gcd_remaining(MAGE) <= 1.5 + 1e-9);
        }
    }

    /// A GCD-affected ability never executes while the caster is on GCD, and
    /// the GCD runs out once its full duration has passed.
    #[test]
    fn prop_gcd_is_exclusive(
        steps in prop::collection::vec(
            (prop::sample::select(vec![0usize, 1, 3]), 0.05f64..1.0),
            1..40,
        )
    ) {
        let (mut core, mut world) = setup();
        let gcd = core.config().abilities.global_cooldown;
        let mut since_gcd: Option<f64> = None;

        for (slot, delta) in steps {
            let was_on_gcd = core.abilities().is_on_gcd(ROGUE);
            let result = core.try_execute_ability(ROGUE, slot, &mut world);
            if was_on_gcd {
                let blocked = matches!(result, Err(AbilityError::OnGcd { .. }));
                prop_assert!(blocked);
            }
            if result.is_ok() {
                prop_assert!((core.abilities().gcd_remaining(ROGUE) - gcd).abs() < 1e-9);
                since_gcd = Some(0.0);
            }

            core.tick(delta, &mut world);
            if let Some(elapsed) = since_gcd.as_mut() {
                *elapsed += delta;
                if *elapsed > gcd + 1e-6 {
                    prop_assert!(!core.abilities().is_on_gcd(ROGUE));
                } else if *elapsed < gcd - 1e-6 {
                    prop_assert!(core.abilities().is_on_gcd(ROGUE));
                }
            }
        }
    }

    /// A slot that is on cooldown never executes, and a second request right
    /// after a success is always rejected.
    #[test]
    fn prop_cooldown_blocks_repeat(delta in 0.0f64..19.9) {
        let (mut core, mut world) = setup();
        core.try_execute_ability(ROGUE, 2, &mut world).unwrap();
        if delta > 0.0 {
            core.tick(delta, &mut world);
        }
        let result = core.try_execute_ability(ROGUE, 2, &mut world);
        let is_on_cooldown = matches!(result, Err(AbilityError::OnCooldown { .. }));
        prop_assert!(is_on_cooldown);
    }
}
