//! Per-entity gates that decide when an entity may register its own flag.
//!
//! A gate starts unregistered and becomes registered at most once. Registration
//! can be requested by a trigger volume, the interact action, or any system
//! sending [`RegisterFlag`]; a gate that needs another flag first stays
//! [`RegisterOutcome::Blocked`] until that flag exists.
use bevy::prelude::*;
use strum::{Display, IntoStaticStr};

use super::activation::{Activation, deactivate};
use super::store::{FlagError, FlagStore};
use super::trigger::{InteractPressed, RegisterFlag, TriggerEntered, TriggerExited};

#[derive(Component, Debug, Clone, Default)]
#[require(GateState, Visibility)]
pub struct FlagGate {
    pub flag_id: String,
    /// Prerequisite flag, if any.
    pub required_id: Option<String>,
    pub requires_another_item: bool,
    /// Deactivate once this gate's flag is registered.
    pub disable_if_flagged: bool,
    pub disable_on_load_if_flagged: bool,
    pub disable_if_required_found: bool,
    pub requires_trigger_enter: bool,
    pub requires_interact: bool,
    pub monitor_continuously: bool,
}

impl FlagGate {
    pub fn new(flag_id: impl Into<String>) -> Self {
        Self {
            flag_id: flag_id.into(),
            ..default()
        }
    }

    /// Registration is blocked until `required_id` is set.
    pub fn requiring(mut self, required_id: impl Into<String>) -> Self {
        self.required_id = Some(required_id.into());
        self.requires_another_item = true;
        self
    }

    /// Name a related flag without making it a prerequisite.
    pub fn watching(mut self, required_id: impl Into<String>) -> Self {
        self.required_id = Some(required_id.into());
        self
    }

    pub fn on_trigger_enter(mut self) -> Self {
        self.requires_trigger_enter = true;
        self
    }

    pub fn on_interact(mut self) -> Self {
        self.requires_interact = true;
        self
    }

    pub fn hide_when_flagged(mut self) -> Self {
        self.disable_if_flagged = true;
        self
    }

    pub fn hide_on_load_if_flagged(mut self) -> Self {
        self.disable_on_load_if_flagged = true;
        self
    }

    pub fn hide_when_required_found(mut self) -> Self {
        self.disable_if_required_found = true;
        self
    }

    pub fn monitored(mut self) -> Self {
        self.monitor_continuously = true;
        self
    }

    fn required_present(&self, store: &FlagStore) -> bool {
        self.required_id.as_deref().is_some_and(|id| store.has(id))
    }
}

#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateState {
    flagged: bool,
    in_range: bool,
}

impl GateState {
    #[cfg(test)]
    pub(crate) fn is_flagged(&self) -> bool {
        self.flagged
    }

    #[cfg(test)]
    pub(crate) fn in_range(&self) -> bool {
        self.in_range
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum RegisterOutcome {
    Registered,
    Blocked,
    AlreadyRegistered,
}

/// Checks that run once when the gate first appears.
pub fn evaluate_on_load(
    gate: &FlagGate,
    entity: Entity,
    store: &FlagStore,
    activation: &mut impl Activation,
) {
    if gate.disable_on_load_if_flagged && store.has(&gate.flag_id) {
        deactivate(activation, entity);
        return;
    }
    if gate.disable_if_required_found && gate.required_present(store) {
        deactivate(activation, entity);
    }
}

/// Per-tick re-checks for gates that monitor the store continuously.
pub fn evaluate_continuous(
    gate: &FlagGate,
    entity: Entity,
    store: &FlagStore,
    activation: &mut impl Activation,
) {
    if !gate.monitor_continuously {
        return;
    }
    if gate.disable_if_required_found && gate.required_present(store) {
        deactivate(activation, entity);
    }
    if gate.disable_if_flagged && store.has(&gate.flag_id) {
        deactivate(activation, entity);
    }
}

pub fn try_register(
    gate: &FlagGate,
    state: &mut GateState,
    entity: Entity,
    store: &mut FlagStore,
    activation: &mut impl Activation,
) -> Result<RegisterOutcome, FlagError> {
    if state.flagged {
        warn!("{} has already been registered", gate.flag_id);
        return Ok(RegisterOutcome::AlreadyRegistered);
    }

    if gate.requires_another_item && !gate.required_present(store) {
        warn!(
            "Required flag {} not found for: {}",
            gate.required_id.as_deref().unwrap_or_default(),
            gate.flag_id
        );
        return Ok(RegisterOutcome::Blocked);
    }

    store.add(&gate.flag_id)?;
    state.flagged = true;
    info!("added flag for {}", gate.flag_id);

    if gate.disable_if_flagged {
        deactivate(activation, entity);
    }
    Ok(RegisterOutcome::Registered)
}

fn register_logged(
    gate: &FlagGate,
    state: &mut GateState,
    entity: Entity,
    store: &mut FlagStore,
    visibility: &mut Query<&mut Visibility>,
) {
    match try_register(gate, state, entity, store, visibility) {
        Ok(outcome) => debug!("gate {entity:?} '{}': {outcome}", gate.flag_id),
        Err(err) => warn!("gate {entity:?}: {err}"),
    }
}

pub(super) fn evaluate_gates_on_load(
    gates: Query<(Entity, &FlagGate), Added<FlagGate>>,
    store: Res<FlagStore>,
    mut visibility: Query<&mut Visibility>,
) {
    for (entity, gate) in &gates {
        evaluate_on_load(gate, entity, &store, &mut visibility);
    }
}

pub(super) fn handle_trigger_events(
    mut entered: MessageReader<TriggerEntered>,
    mut exited: MessageReader<TriggerExited>,
    mut gates: Query<(&FlagGate, &mut GateState)>,
    mut store: ResMut<FlagStore>,
    mut visibility: Query<&mut Visibility>,
) {
    for TriggerEntered { volume } in entered.read().copied() {
        if !visibility.is_active(volume) {
            continue;
        }
        let Ok((gate, mut state)) = gates.get_mut(volume) else {
            continue;
        };
        state.in_range = true;
        // Interact gates only become eligible on enter.
        if gate.requires_trigger_enter && !gate.requires_interact {
            register_logged(gate, &mut state, volume, &mut store, &mut visibility);
        }
    }

    for TriggerExited { volume } in exited.read().copied() {
        if let Ok((_, mut state)) = gates.get_mut(volume) {
            state.in_range = false;
        }
    }
}

pub(super) fn handle_interact(
    mut interact: MessageReader<InteractPressed>,
    mut gates: Query<(Entity, &FlagGate, &mut GateState)>,
    mut store: ResMut<FlagStore>,
    mut visibility: Query<&mut Visibility>,
) {
    if interact.read().count() == 0 {
        return;
    }
    for (entity, gate, mut state) in &mut gates {
        if !gate.requires_interact || !state.in_range || !visibility.is_active(entity) {
            continue;
        }
        register_logged(gate, &mut state, entity, &mut store, &mut visibility);
    }
}

pub(super) fn handle_register_requests(
    mut requests: MessageReader<RegisterFlag>,
    mut gates: Query<(&FlagGate, &mut GateState)>,
    mut store: ResMut<FlagStore>,
    mut visibility: Query<&mut Visibility>,
) {
    for RegisterFlag { gate: entity } in requests.read().copied() {
        let Ok((gate, mut state)) = gates.get_mut(entity) else {
            warn!("RegisterFlag for {entity:?}, which has no FlagGate");
            continue;
        };
        register_logged(gate, &mut state, entity, &mut store, &mut visibility);
    }
}

pub(super) fn monitor_gates(
    gates: Query<(Entity, &FlagGate)>,
    store: Res<FlagStore>,
    mut visibility: Query<&mut Visibility>,
) {
    for (entity, gate) in &gates {
        if visibility.is_active(entity) {
            evaluate_continuous(gate, entity, &store, &mut visibility);
        }
    }
}
