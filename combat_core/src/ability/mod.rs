//! Ability execution engine
//!
//! Owns every entity's action bar and [`CastState`]. Execution is validated in
//! full before any state changes, so a rejected request only emits an
//! `AbilityFailed` event. On success the cost is spent, the GCD and the slot
//! cooldown start, and the ability either resolves at once or begins a cast
//! or channel that `tick` carries to completion.

mod cast;
mod resolve;
mod slot;

pub use cast::{ActiveCast, ActiveChannel, CastState};
pub use slot::AbilitySlotState;

use crate::arena::EntityArena;
use crate::config::AbilityConstants;
use crate::diminishing::DrTracker;
use crate::effects::EffectEngine;
use crate::error::AbilityError;
use crate::events::{CombatEvent, EventQueue, InterruptReason};
use crate::resource::ResourceEngine;
use crate::world::CombatHost;
use crate::TIME_EPSILON;
use combat_types::{AbilityDefinition, CcCategory, CombatEntityId, Position, ResourceKind};
use resolve::resolve_payload;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Mutable access to the engines an ability fans out to
pub struct AbilityContext<'a, H: CombatHost + ?Sized> {
    pub host: &'a mut H,
    pub resources: &'a mut ResourceEngine,
    pub effects: &'a mut EffectEngine,
    pub diminishing: &'a mut DrTracker,
}

/// What a successful `try_execute_ability` started
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExecutionOutcome {
    /// Instant ability, already resolved
    Resolved,
    CastStarted { cast_time: f64 },
    ChannelStarted { ticks: u32 },
}

#[derive(Debug, Clone)]
struct CasterState {
    slots: Vec<AbilitySlotState>,
    cast: CastState,
    lockout_remaining: f64,
}

impl CasterState {
    fn new(slot_count: usize) -> Self {
        CasterState {
            slots: vec![AbilitySlotState::default(); slot_count],
            cast: CastState::Idle,
            lockout_remaining: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AbilityEngine {
    casters: EntityArena<CasterState>,
    config: AbilityConstants,
    /// Simulated time, used for last-used stamps
    clock: f64,
    events: EventQueue,
}

impl AbilityEngine {
    /// Create an engine with no casters; slot count and GCD come from `config`
    pub fn new(config: AbilityConstants) -> Self {
        AbilityEngine {
            casters: EntityArena::new(),
            config,
            clock: 0.0,
            events: EventQueue::new(),
        }
    }

    /// Give an entity an empty action bar (no-op if it already has one)
    pub fn register(&mut self, entity: CombatEntityId) {
        let slot_count = self.config.slot_count;
        self.casters
            .get_or_insert_with(entity, || CasterState::new(slot_count));
    }

    /// Drop an entity's action bar and cast state
    ///
    /// A cast in progress vanishes without an interrupt event.
    pub fn unregister(&mut self, entity: CombatEntityId) {
        self.casters.remove(entity);
    }

    /// Whether `entity` has an action bar
    pub fn is_registered(&self, entity: CombatEntityId) -> bool {
        self.casters.contains(entity)
    }

    /// Entities with an action bar
    pub fn registered(&self) -> impl Iterator<Item = CombatEntityId> + '_ {
        self.casters.ids()
    }

    /// Seconds of combat time this engine has ticked through
    pub fn clock(&self) -> f64 {
        self.clock
    }

    // ------------------------------------------------------------------
    // Action bar
    // ------------------------------------------------------------------

    fn slot_mut(
        &mut self,
        entity: CombatEntityId,
        slot: usize,
    ) -> Result<&mut AbilitySlotState, AbilityError> {
        let state = self
            .casters
            .get_mut(entity)
            .ok_or(AbilityError::UnknownEntity(entity))?;
        let slots = state.slots.len();
        state
            .slots
            .get_mut(slot)
            .ok_or(AbilityError::InvalidSlot { slot, slots })
    }

    /// Put an ability in a slot, resetting that slot's cooldown
    pub fn set_ability(
        &mut self,
        entity: CombatEntityId,
        slot: usize,
        ability: Arc<AbilityDefinition>,
    ) -> Result<(), AbilityError> {
        let slot_state = self.slot_mut(entity, slot)?;
        debug!(%entity, slot, ability = %ability.id, "Ability assigned");
        *slot_state = AbilitySlotState {
            ability: Some(ability),
            ..Default::default()
        };
        Ok(())
    }

    /// Empty a slot, returning whatever ability was in it
    pub fn clear_slot(
        &mut self,
        entity: CombatEntityId,
        slot: usize,
    ) -> Result<Option<Arc<AbilityDefinition>>, AbilityError> {
        let slot_state = self.slot_mut(entity, slot)?;
        Ok(std::mem::take(slot_state).ability)
    }

    /// Replace the whole action bar, filling slots in order
    pub fn load_abilities(
        &mut self,
        entity: CombatEntityId,
        abilities: Vec<Arc<AbilityDefinition>>,
    ) -> Result<(), AbilityError> {
        let state = self
            .casters
            .get_mut(entity)
            .ok_or(AbilityError::UnknownEntity(entity))?;
        if abilities.len() > state.slots.len() {
            return Err(AbilityError::InvalidSlot {
                slot: abilities.len() - 1,
                slots: state.slots.len(),
            });
        }
        for slot in state.slots.iter_mut() {
            *slot = AbilitySlotState::default();
        }
        for (slot, ability) in state.slots.iter_mut().zip(abilities) {
            slot.ability = Some(ability);
        }
        Ok(())
    }

    /// Ability assigned to `slot`, or `None` for an empty slot or unknown entity
    pub fn ability_in_slot(&self, entity: CombatEntityId, slot: usize) -> Option<&Arc<AbilityDefinition>> {
        self.slot_state(entity, slot)?.ability.as_ref()
    }

    /// Full slot state (ability and cooldown)
    pub fn slot_state(&self, entity: CombatEntityId, slot: usize) -> Option<&AbilitySlotState> {
        self.casters.get(entity)?.slots.get(slot)
    }

    /// Seconds until `slot` is off cooldown; 0 when ready or unknown
    pub fn cooldown_remaining(&self, entity: CombatEntityId, slot: usize) -> f64 {
        self.slot_state(entity, slot)
            .map_or(0.0, |s| s.cooldown_remaining)
    }

    /// Make every slot ready. The GCD is untouched.
    pub fn reset_all_cooldowns(&mut self, entity: CombatEntityId) {
        if let Some(state) = self.casters.get_mut(entity) {
            for slot in state.slots.iter_mut() {
                slot.cooldown_remaining = 0.0;
            }
        }
    }

    // ------------------------------------------------------------------
    // State queries
    // ------------------------------------------------------------------

    /// Current cast state; `None` for unregistered entities
    pub fn cast_state(&self, entity: CombatEntityId) -> Option<&CastState> {
        self.casters.get(entity).map(|s| &s.cast)
    }

    /// Seconds of GCD left, including a GCD carried by a cast or channel
    pub fn gcd_remaining(&self, entity: CombatEntityId) -> f64 {
        self.cast_state(entity).map_or(0.0, CastState::gcd_remaining)
    }

    /// True while any GCD time remains
    pub fn is_on_gcd(&self, entity: CombatEntityId) -> bool {
        self.gcd_remaining(entity) > 0.0
    }

    /// True while a cast bar is running
    pub fn is_casting(&self, entity: CombatEntityId) -> bool {
        self.cast_state(entity).is_some_and(CastState::is_casting)
    }

    /// True while a channel is running
    pub fn is_channeling(&self, entity: CombatEntityId) -> bool {
        self.cast_state(entity).is_some_and(CastState::is_channeling)
    }

    /// Seconds left on a spell lockout from `interrupt_with_lockout`
    ///
    /// Spells are rejected with `AbilityError::LockedOut` until this reaches 0.
    pub fn lockout_remaining(&self, entity: CombatEntityId) -> f64 {
        self.casters.get(entity).map_or(0.0, |s| s.lockout_remaining)
    }

    /// Lockout applied by `interrupt_with_lockout` when no duration is given
    pub fn default_lockout(&self) -> f64 {
        self.config.interrupt_lockout
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    /// Validate and start the ability in `slot`
    ///
    /// Every rejection leaves engine state untouched and emits `AbilityFailed`.
    pub fn try_execute_ability<H: CombatHost + ?Sized>(
        &mut self,
        caster: CombatEntityId,
        slot: usize,
        ctx: &mut AbilityContext<'_, H>,
    ) -> Result<ExecutionOutcome, AbilityError> {
        let result = self
            .validate(caster, slot, ctx)
            .and_then(|(ability, target)| self.execute(caster, slot, ability, target, ctx));

        if let Err(error) = &result {
            let ability = self.ability_in_slot(caster, slot).map(|a| a.id.clone());
            debug!(%caster, slot, %error, "Ability rejected");
            self.events.push(CombatEvent::AbilityFailed {
                entity: caster,
                ability,
                error: error.kind(),
                reason: error.to_string(),
            });
        }
        result
    }

    fn validate<H: CombatHost + ?Sized>(
        &self,
        caster: CombatEntityId,
        slot: usize,
        ctx: &AbilityContext<'_, H>,
    ) -> Result<(Arc<AbilityDefinition>, CombatEntityId), AbilityError> {
        let state = self
            .casters
            .get(caster)
            .ok_or(AbilityError::UnknownEntity(caster))?;
        let slot_state = state.slots.get(slot).ok_or(AbilityError::InvalidSlot {
            slot,
            slots: state.slots.len(),
        })?;
        let ability = slot_state
            .ability
            .clone()
            .ok_or(AbilityError::EmptySlot(slot))?;

        if ctx.host.is_dead(caster) {
            return Err(AbilityError::CasterDead);
        }
        if let Some(cc) = ctx.effects.incapacitating_cc(caster) {
            return Err(AbilityError::Incapacitated(cc));
        }
        if ability.is_spell {
            if ctx.effects.is_silenced(caster) {
                return Err(AbilityError::Silenced);
            }
            if state.lockout_remaining > 0.0 {
                return Err(AbilityError::LockedOut {
                    remaining: state.lockout_remaining,
                });
            }
        }
        match &state.cast {
            CastState::Casting(_) => return Err(AbilityError::AlreadyCasting),
            CastState::Channeling(_) => return Err(AbilityError::AlreadyChanneling),
            CastState::Idle | CastState::OnGcd { .. } => {}
        }
        if ability.triggers_gcd && state.cast.is_on_gcd() {
            return Err(AbilityError::OnGcd {
                remaining: state.cast.gcd_remaining(),
            });
        }
        if slot_state.is_on_cooldown() {
            return Err(AbilityError::OnCooldown {
                remaining: slot_state.cooldown_remaining,
            });
        }
        if let Some(cost) = &ability.cost {
            if !ctx.resources.can_afford(caster, cost) {
                return Err(AbilityError::InsufficientResource {
                    kind: cost.kind,
                    required: cost.amount,
                    available: ctx.resources.available(caster, cost.kind),
                });
            }
        }
        if ability.payload.consumes_combo_points && ctx.resources.combo_points(caster) == 0 {
            return Err(AbilityError::InsufficientResource {
                kind: ResourceKind::ComboPoints,
                required: 1.0,
                available: 0.0,
            });
        }

        let target = select_target(caster, &ability, ctx)?;
        Ok((ability, target))
    }

    fn execute<H: CombatHost + ?Sized>(
        &mut self,
        caster: CombatEntityId,
        slot: usize,
        ability: Arc<AbilityDefinition>,
        target: CombatEntityId,
        ctx: &mut AbilityContext<'_, H>,
    ) -> Result<ExecutionOutcome, AbilityError> {
        if let Some(cost) = &ability.cost {
            let spent = ctx.resources.spend(caster, cost);
            debug_assert!(spent, "cost was checked before execution");
        }
        let damage_multiplier = if ability.payload.consumes_combo_points {
            let points = ctx.resources.consume_all_combo_points(caster);
            ctx.resources.combo_point_damage_multiplier(points)
        } else {
            1.0
        };

        let now = self.clock;
        let Self {
            casters,
            config,
            events,
            ..
        } = self;
        let state = casters
            .get_mut(caster)
            .ok_or(AbilityError::UnknownEntity(caster))?;
        state.slots[slot].start_cooldown(now);

        let gcd_remaining = if ability.triggers_gcd {
            events.push(CombatEvent::GcdStarted {
                entity: caster,
                duration: config.global_cooldown,
            });
            config.global_cooldown
        } else {
            state.cast.gcd_remaining()
        };

        events.push(CombatEvent::AbilityExecuted {
            entity: caster,
            ability: ability.id.clone(),
            target: ability.requires_target.then_some(target),
        });
        let start_position = ctx.host.position(caster);

        if ability.is_channeled() {
            let ticks = ability.channel_ticks;
            info!(%caster, ability = %ability.id, ticks, "Channel started");
            events.push(CombatEvent::ChannelStarted {
                entity: caster,
                ability: ability.id.clone(),
                ticks,
            });
            state.cast = CastState::Channeling(ActiveChannel {
                ability,
                target,
                ticks_done: 0,
                ticks_total: ticks,
                elapsed: 0.0,
                gcd_remaining,
                start_position,
                damage_multiplier,
            });
            return Ok(ExecutionOutcome::ChannelStarted { ticks });
        }

        if ability.cast_time > 0.0 {
            let cast_time = ability.cast_time;
            info!(%caster, ability = %ability.id, cast_time, "Cast started");
            events.push(CombatEvent::CastStarted {
                entity: caster,
                ability: ability.id.clone(),
                cast_time,
            });
            state.cast = CastState::Casting(ActiveCast {
                ability,
                target,
                elapsed: 0.0,
                total: cast_time,
                gcd_remaining,
                start_position,
                damage_multiplier,
            });
            return Ok(ExecutionOutcome::CastStarted { cast_time });
        }

        state.cast = CastState::after_gcd(gcd_remaining);
        resolve_payload(caster, target, &ability, damage_multiplier, true, ctx, events);

        if let Some(lockout) = ability.payload.interrupt_lockout {
            if target != caster && self.casters.contains(target) {
                let interrupted = self.interrupt_with_lockout(target, lockout);
                debug!(%caster, %target, interrupted, "Interrupt resolved");
            }
        }
        Ok(ExecutionOutcome::Resolved)
    }

    // ------------------------------------------------------------------
    // Interrupts
    // ------------------------------------------------------------------

    /// Stop a cast bar without resolving it
    pub fn interrupt_cast(&mut self, entity: CombatEntityId) -> bool {
        self.interrupt_if(entity, CastState::is_casting, InterruptReason::Manual)
    }

    /// Stop a channel; ticks already resolved stay resolved
    pub fn interrupt_channel(&mut self, entity: CombatEntityId) -> bool {
        self.interrupt_if(entity, CastState::is_channeling, InterruptReason::Manual)
    }

    /// Stop whichever of cast or channel is running
    pub fn interrupt(&mut self, entity: CombatEntityId, reason: InterruptReason) -> bool {
        self.interrupt_if(entity, CastState::is_busy, reason)
    }

    /// Interrupt and lock the caster out of spells for `duration` seconds
    ///
    /// The lockout only lands when something was actually interrupted.
    pub fn interrupt_with_lockout(&mut self, entity: CombatEntityId, duration: f64) -> bool {
        if !self.interrupt_if(entity, CastState::is_busy, InterruptReason::Lockout) {
            return false;
        }
        if let Some(state) = self.casters.get_mut(entity) {
            state.lockout_remaining = state.lockout_remaining.max(duration);
            info!(%entity, duration, "Spell lockout started");
            self.events.push(CombatEvent::LockoutStarted { entity, duration });
        }
        true
    }

    fn interrupt_if(
        &mut self,
        entity: CombatEntityId,
        applies: impl Fn(&CastState) -> bool,
        reason: InterruptReason,
    ) -> bool {
        let Some(state) = self.casters.get_mut(entity) else {
            warn!(%entity, "Interrupt for unknown entity");
            return false;
        };
        if !applies(&state.cast) {
            return false;
        }
        let current = std::mem::take(&mut state.cast);
        state.cast = end_early(entity, current, reason, &mut self.events);
        true
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advance cooldowns, lockouts, GCDs, casts and channels
    pub fn tick<H: CombatHost + ?Sized>(&mut self, delta: f64, ctx: &mut AbilityContext<'_, H>) {
        self.clock += delta;

        for index in 0..self.casters.len() {
            let Some((caster, state)) = self.casters.get_index_mut(index) else {
                break;
            };
            for slot in state.slots.iter_mut() {
                slot.tick(delta);
            }
            if state.lockout_remaining > 0.0 {
                state.lockout_remaining -= delta;
                if state.lockout_remaining <= 0.0 {
                    state.lockout_remaining = 0.0;
                    self.events.push(CombatEvent::LockoutEnded { entity: caster });
                }
            }

            let current = std::mem::take(&mut state.cast);
            state.cast = advance(caster, current, delta, &self.config, ctx, &mut self.events);
            debug_assert!(!(state.cast.is_casting() && state.cast.is_channeling()));
        }
    }

    /// Events pushed since the last drain
    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    /// Take all pending events in emission order
    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        self.events.drain()
    }
}

/// Resolve the target for an ability, rejecting invalid ones
///
/// Abilities that do not need a target are self-cast.
fn select_target<H: CombatHost + ?Sized>(
    caster: CombatEntityId,
    ability: &AbilityDefinition,
    ctx: &AbilityContext<'_, H>,
) -> Result<CombatEntityId, AbilityError> {
    if !ability.requires_target {
        return Ok(caster);
    }
    let target = ctx
        .host
        .current_target(caster)
        .ok_or(AbilityError::NoTarget)?;
    if ctx.host.is_dead(target) {
        return Err(AbilityError::TargetDead);
    }
    if let Some(range) = ability.range {
        let distance = ctx
            .host
            .distance(caster, target)
            .unwrap_or(f64::INFINITY);
        if distance > range {
            return Err(AbilityError::OutOfRange { distance, range });
        }
    }
    if target != caster && !ctx.host.has_line_of_sight(caster, target) {
        return Err(AbilityError::NoLineOfSight);
    }

    // A pure crowd-control ability against a target immune to all of it
    let payload = &ability.payload;
    if payload.damage <= 0.0 && payload.healing <= 0.0 && !payload.applies.is_empty() {
        let categories: Option<Vec<CcCategory>> = payload
            .applies
            .iter()
            .map(|e| e.crowd_control_category())
            .collect();
        if let Some(categories) = categories {
            if categories
                .iter()
                .all(|&cc| ctx.diminishing.is_immune(target, cc))
            {
                return Err(AbilityError::TargetImmune(categories[0]));
            }
        }
    }
    Ok(target)
}

/// Why an in-progress cast or channel must stop this tick, if at all
fn interrupt_reason<H: CombatHost + ?Sized>(
    caster: CombatEntityId,
    ability: &AbilityDefinition,
    start_position: Option<Position>,
    config: &AbilityConstants,
    ctx: &AbilityContext<'_, H>,
) -> Option<InterruptReason> {
    if ctx.host.is_dead(caster) {
        return Some(InterruptReason::CasterDied);
    }
    if let Some(cc) = ctx.effects.incapacitating_cc(caster) {
        return Some(InterruptReason::CrowdControl(cc));
    }
    if ability.is_spell && ctx.effects.is_silenced(caster) {
        return Some(InterruptReason::CrowdControl(CcCategory::Silence));
    }
    if !ability.castable_while_moving {
        if let (Some(start), Some(now)) = (start_position, ctx.host.position(caster)) {
            if start.distance(&now) > config.movement_interrupt_threshold {
                return Some(InterruptReason::Movement);
            }
        }
    }
    None
}

/// Count a GCD down, emitting `GcdEnded` when it reaches zero
fn tick_gcd(entity: CombatEntityId, remaining: f64, delta: f64, events: &mut EventQueue) -> f64 {
    if remaining <= 0.0 {
        return 0.0;
    }
    let left = remaining - delta;
    if left <= TIME_EPSILON {
        events.push(CombatEvent::GcdEnded { entity });
        0.0
    } else {
        left
    }
}

/// Abort a cast or channel without resolving anything further
fn end_early(
    entity: CombatEntityId,
    state: CastState,
    reason: InterruptReason,
    events: &mut EventQueue,
) -> CastState {
    let progress = state.progress().unwrap_or(0.0);
    match state {
        CastState::Casting(cast) => {
            info!(%entity, ability = %cast.ability.id, %reason, progress, "Cast interrupted");
            events.push(CombatEvent::CastInterrupted {
                entity,
                ability: cast.ability.id.clone(),
                reason,
            });
            CastState::after_gcd(cast.gcd_remaining)
        }
        CastState::Channeling(channel) => {
            info!(%entity, ability = %channel.ability.id, %reason, progress, "Channel interrupted");
            events.push(CombatEvent::ChannelInterrupted {
                entity,
                ability: channel.ability.id.clone(),
                ticks_done: channel.ticks_done,
                reason,
            });
            CastState::after_gcd(channel.gcd_remaining)
        }
        other => other,
    }
}

/// One tick of the cast state machine
fn advance<H: CombatHost + ?Sized>(
    caster: CombatEntityId,
    state: CastState,
    delta: f64,
    config: &AbilityConstants,
    ctx: &mut AbilityContext<'_, H>,
    events: &mut EventQueue,
) -> CastState {
    match state {
        CastState::Idle => CastState::Idle,
        CastState::OnGcd { remaining } => {
            CastState::after_gcd(tick_gcd(caster, remaining, delta, events))
        }
        CastState::Casting(mut cast) => {
            if let Some(reason) =
                interrupt_reason(caster, &cast.ability, cast.start_position, config, ctx)
            {
                cast.gcd_remaining = tick_gcd(caster, cast.gcd_remaining, delta, events);
                return end_early(caster, CastState::Casting(cast), reason, events);
            }

            cast.gcd_remaining = tick_gcd(caster, cast.gcd_remaining, delta, events);
            cast.elapsed += delta;
            if cast.elapsed + TIME_EPSILON < cast.total {
                return CastState::Casting(cast);
            }

            if cast.target != caster && ctx.host.is_dead(cast.target) {
                return end_early(caster, CastState::Casting(cast), InterruptReason::TargetLost, events);
            }

            resolve_payload(
                caster,
                cast.target,
                &cast.ability,
                cast.damage_multiplier,
                true,
                ctx,
                events,
            );
            info!(%caster, ability = %cast.ability.id, "Cast completed");
            events.push(CombatEvent::CastCompleted {
                entity: caster,
                ability: cast.ability.id.clone(),
            });
            CastState::after_gcd(cast.gcd_remaining)
        }
        CastState::Channeling(mut channel) => {
            if let Some(reason) =
                interrupt_reason(caster, &channel.ability, channel.start_position, config, ctx)
            {
                channel.gcd_remaining = tick_gcd(caster, channel.gcd_remaining, delta, events);
                return end_early(caster, CastState::Channeling(channel), reason, events);
            }

            channel.gcd_remaining = tick_gcd(caster, channel.gcd_remaining, delta, events);
            channel.elapsed += delta;

            // Every boundary crossed this tick resolves on its own, in order
            while channel.ticks_done < channel.ticks_total
                && channel.elapsed + TIME_EPSILON >= channel.next_tick_at()
            {
                if channel.target != caster && ctx.host.is_dead(channel.target) {
                    return end_early(
                        caster,
                        CastState::Channeling(channel),
                        InterruptReason::TargetLost,
                        events,
                    );
                }
                channel.ticks_done += 1;
                resolve_payload(
                    caster,
                    channel.target,
                    &channel.ability,
                    channel.damage_multiplier,
                    channel.ticks_done == 1,
                    ctx,
                    events,
                );
                events.push(CombatEvent::ChannelTick {
                    entity: caster,
                    ability: channel.ability.id.clone(),
                    tick: channel.ticks_done,
                    total: channel.ticks_total,
                });
            }

            if channel.ticks_done >= channel.ticks_total {
                info!(%caster, ability = %channel.ability.id, "Channel completed");
                events.push(CombatEvent::ChannelCompleted {
                    entity: caster,
                    ability: channel.ability.id.clone(),
                });
                return CastState::after_gcd(channel.gcd_remaining);
            }
            CastState::Channeling(channel)
        }
    }
}
