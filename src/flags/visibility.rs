// Entities shown or hidden depending on which flags are set.
use bevy::prelude::*;

use super::activation::{Activation, deactivate};
use super::registry::EntityRegistry;
use super::store::FlagStore;

/// One target whose activation follows a single flag.
///
/// With `one_time` set (the default) the effect is applied at most once and
/// the binding is skipped from then on, even if the flag later changes.
#[derive(Debug, Clone)]
pub struct VisibilityBinding {
    pub target: Option<Entity>,
    pub target_name: Option<String>,
    pub required_flag: String,
    pub enable_if_present: bool,
    pub disable_if_present: bool,
    pub one_time: bool,
    applied: bool,
    reported_unresolved: bool,
}

impl VisibilityBinding {
    fn with_target(
        target: Option<Entity>,
        target_name: Option<String>,
        required_flag: impl Into<String>,
    ) -> Self {
        Self {
            target,
            target_name,
            required_flag: required_flag.into(),
            enable_if_present: true,
            disable_if_present: false,
            one_time: true,
            applied: false,
            reported_unresolved: false,
        }
    }

    pub fn entity(target: Entity, required_flag: impl Into<String>) -> Self {
        Self::with_target(Some(target), None, required_flag)
    }

    /// Target looked up by name the first time it is needed.
    pub fn named(target_name: impl Into<String>, required_flag: impl Into<String>) -> Self {
        Self::with_target(None, Some(target_name.into()), required_flag)
    }

    /// Hide the target once the flag exists instead of showing it.
    pub fn hidden_when_present(mut self) -> Self {
        self.enable_if_present = false;
        self.disable_if_present = true;
        self
    }

    /// Re-evaluate every tick instead of applying once.
    pub fn continuous(mut self) -> Self {
        self.one_time = false;
        self
    }

    #[cfg(test)]
    pub(crate) fn is_applied(&self) -> bool {
        self.applied
    }

    fn resolve(&mut self, registry: &EntityRegistry) -> Option<Entity> {
        if self.target.is_some() {
            return self.target;
        }
        let name = self.target_name.as_deref()?;

        match registry.lookup(name) {
            Some(entity) => {
                info!("Auto-assigned puzzle target: {name}");
                self.target = Some(entity);
                self.target
            }
            None => {
                if !self.reported_unresolved {
                    warn!("Could not find puzzle target with name: {name}");
                    self.reported_unresolved = true;
                }
                None
            }
        }
    }

    fn mark_applied(&mut self) {
        if self.one_time {
            self.applied = true;
        }
    }

    pub fn evaluate(
        &mut self,
        store: &FlagStore,
        registry: &EntityRegistry,
        activation: &mut impl Activation,
    ) {
        if self.applied || self.required_flag.is_empty() {
            return;
        }
        let Some(target) = self.resolve(registry) else {
            return;
        };

        let flag_set = store.has(&self.required_flag);

        if self.enable_if_present && !flag_set {
            if activation.is_active(target) {
                activation.set_active(target, false);
                debug!(
                    "Hid {target:?} because flag '{}' is missing",
                    self.required_flag
                );
            }
            self.mark_applied();
        }

        if self.enable_if_present && flag_set {
            if !activation.is_active(target) {
                activation.set_active(target, true);
                debug!("Showed {target:?} due to flag '{}'", self.required_flag);
            }
            self.mark_applied();
        }

        if self.disable_if_present && flag_set {
            deactivate(activation, target);
            debug!("Hid {target:?} due to flag '{}'", self.required_flag);
            self.mark_applied();
        }
    }
}

/// Ordered bindings evaluated together each tick.
#[derive(Component, Debug, Clone, Default)]
pub struct ConditionalVisibility {
    bindings: Vec<VisibilityBinding>,
}

impl ConditionalVisibility {
    pub fn new(bindings: Vec<VisibilityBinding>) -> Self {
        Self { bindings }
    }

    #[cfg(test)]
    pub(crate) fn bindings(&self) -> &[VisibilityBinding] {
        &self.bindings
    }

    pub fn evaluate(
        &mut self,
        store: &FlagStore,
        registry: &EntityRegistry,
        activation: &mut impl Activation,
    ) {
        for binding in &mut self.bindings {
            binding.evaluate(store, registry, activation);
        }
    }
}

pub(super) fn evaluate_conditional_visibility(
    mut sets: Query<&mut ConditionalVisibility>,
    store: Res<FlagStore>,
    registry: Res<EntityRegistry>,
    mut visibility: Query<&mut Visibility>,
) {
    for mut set in &mut sets {
        set.evaluate(&store, &registry, &mut visibility);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::activation::testing::{FakeActivation, entities};

    fn evaluate(
        binding: &mut VisibilityBinding,
        store: &FlagStore,
        activation: &mut FakeActivation,
    ) {
        binding.evaluate(store, &EntityRegistry::default(), activation);
    }

    #[test]
    fn one_time_binding_never_reapplies() {
        let [chest] = entities();
        let mut store = FlagStore::in_memory();
        let mut activation = FakeActivation::default();
        let mut binding = VisibilityBinding::entity(chest, "door_opened");

        evaluate(&mut binding, &store, &mut activation);
        assert!(!activation.is_active(chest));
        assert!(binding.is_applied());

        store.add("door_opened").unwrap();
        evaluate(&mut binding, &store, &mut activation);
        assert!(!activation.is_active(chest));
    }

    #[test]
    fn continuous_binding_follows_the_flag() {
        let [chest] = entities();
        let mut store = FlagStore::in_memory();
        let mut activation = FakeActivation::default();
        let mut binding = VisibilityBinding::entity(chest, "door_opened").continuous();

        evaluate(&mut binding, &store, &mut activation);
        assert!(!activation.is_active(chest));
        assert!(!binding.is_applied());

        store.add("door_opened").unwrap();
        evaluate(&mut binding, &store, &mut activation);
        assert!(activation.is_active(chest));

        store.remove("door_opened").unwrap();
        evaluate(&mut binding, &store, &mut activation);
        assert!(!activation.is_active(chest));
    }

    #[test]
    fn hide_when_present_waits_for_the_flag() {
        let [cobweb] = entities();
        let mut store = FlagStore::in_memory();
        let mut activation = FakeActivation::default();
        let mut binding = VisibilityBinding::entity(cobweb, "lever_pulled").hidden_when_present();

        evaluate(&mut binding, &store, &mut activation);
        assert!(activation.is_active(cobweb));
        assert!(!binding.is_applied());

        store.add("lever_pulled").unwrap();
        evaluate(&mut binding, &store, &mut activation);
        assert!(!activation.is_active(cobweb));
        assert!(binding.is_applied());

        // Reactivated by something else; the applied binding leaves it alone.
        activation.set_active(cobweb, true);
        evaluate(&mut binding, &store, &mut activation);
        assert!(activation.is_active(cobweb));
    }

    #[test]
    fn empty_required_flag_is_ignored() {
        let [target] = entities();
        let store = FlagStore::in_memory();
        let mut activation = FakeActivation::default();
        let mut binding = VisibilityBinding::entity(target, "");

        evaluate(&mut binding, &store, &mut activation);
        assert_eq!(activation.toggles, 0);
        assert!(!binding.is_applied());
    }

    #[test]
    fn named_target_resolves_lazily_and_is_cached() {
        let [lantern] = entities();
        let mut store = FlagStore::in_memory();
        store.add("lever_pulled").unwrap();
        let mut activation = FakeActivation::default();
        activation.set_active(lantern, false);
        let mut registry = EntityRegistry::default();
        let mut set = ConditionalVisibility::new(vec![VisibilityBinding::named(
            "Lantern",
            "lever_pulled",
        )]);

        set.evaluate(&store, &registry, &mut activation);
        assert!(!activation.is_active(lantern));
        assert!(!set.bindings()[0].is_applied());

        registry.register("Lantern", lantern);
        set.evaluate(&store, &registry, &mut activation);
        assert!(activation.is_active(lantern));
        assert_eq!(set.bindings()[0].target, Some(lantern));
        assert!(set.bindings()[0].is_applied());
    }

    #[test]
    fn bindings_apply_in_list_order() {
        let [door] = entities();
        let mut store = FlagStore::in_memory();
        store.add("key_a").unwrap();
        let mut activation = FakeActivation::default();
        let registry = EntityRegistry::default();
        let mut set = ConditionalVisibility::new(vec![
            VisibilityBinding::entity(door, "key_a").continuous(),
            VisibilityBinding::entity(door, "key_a")
                .hidden_when_present()
                .continuous(),
        ]);

        set.evaluate(&store, &registry, &mut activation);
        assert!(!activation.is_active(door));
    }
}
