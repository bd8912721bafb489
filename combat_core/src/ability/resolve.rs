use super::AbilityContext;
use crate::events::{CombatEvent, EventQueue};
use crate::world::CombatHost;
use combat_types::{AbilityDefinition, CombatEntityId, Polarity};
use tracing::debug;

/// Resolve an ability's payload once
///
/// Channels call this once per tick; `first_resolution` is true only for the
/// first, and gates effect application, dispels and combo-point generation.
/// Interrupt payloads are not handled here since they need the target's
/// cast state.
pub(crate) fn resolve_payload<H: CombatHost + ?Sized>(
    caster: CombatEntityId,
    target: CombatEntityId,
    ability: &AbilityDefinition,
    damage_multiplier: f64,
    first_resolution: bool,
    ctx: &mut AbilityContext<'_, H>,
    events: &mut EventQueue,
) {
    let payload = &ability.payload;
    let target_alive = !ctx.host.is_dead(target);
    let deals_damage = payload.damage > 0.0 && target != caster;

    if deals_damage && target_alive {
        let amount = payload.damage * damage_multiplier;
        let dealt = ctx
            .host
            .apply_damage(target, amount, payload.damage_type, caster);
        debug!(%caster, %target, ability = %ability.id, dealt, "Damage resolved");
        if dealt > 0.0 {
            events.push(CombatEvent::DamageResolved {
                source: caster,
                target,
                amount: dealt,
                damage_type: payload.damage_type,
                threat: dealt * payload.threat_multiplier,
            });
        }
    }

    if payload.healing > 0.0 && target_alive {
        let healed = ctx.host.apply_healing(target, payload.healing, caster);
        if healed > 0.0 {
            events.push(CombatEvent::HealingResolved {
                source: caster,
                target,
                amount: healed,
            });
        }
    }

    if !first_resolution {
        return;
    }

    for effect in &payload.applies {
        // Buffs riding on a damaging ability are self-buffs
        let recipient = match effect.polarity() {
            Polarity::Buff if deals_damage => caster,
            _ => target,
        };
        ctx.effects
            .apply_effect(recipient, effect, caster, ctx.diminishing);
    }

    if let Some(dispel) = payload.dispel {
        let removed = ctx.effects.dispel(target, dispel.polarity, dispel.count);
        debug!(%caster, %target, removed = removed.len(), "Dispel resolved");
    }

    if payload.combo_points_generated > 0 {
        ctx.resources
            .add_combo_points(caster, payload.combo_points_generated);
    }
}
