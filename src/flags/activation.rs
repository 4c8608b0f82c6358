// Turning scene entities on and off.
use bevy::prelude::*;

/// Anything that can report and change whether an entity is active.
pub trait Activation {
    fn is_active(&self, entity: Entity) -> bool;
    fn set_active(&mut self, entity: Entity, active: bool);
}

/// Deactivate `entity` unless it is already inactive.
pub fn deactivate(activation: &mut impl Activation, entity: Entity) {
    if activation.is_active(entity) {
        activation.set_active(entity, false);
    }
}

/// An entity counts as active unless it is explicitly hidden. Missing
/// entities are inactive.
impl Activation for Query<'_, '_, &mut Visibility> {
    fn is_active(&self, entity: Entity) -> bool {
        self.get(entity)
            .is_ok_and(|visibility| *visibility != Visibility::Hidden)
    }

    fn set_active(&mut self, entity: Entity, active: bool) {
        let Ok(mut visibility) = self.get_mut(entity) else {
            debug!("Cannot toggle {entity:?}: no Visibility");
            return;
        };
        let target = if active {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
        visibility.set_if_neq(target);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use super::*;

    /// Records activation state per entity; unknown entities start active.
    #[derive(Default)]
    pub(crate) struct FakeActivation {
        inactive: HashMap<Entity, bool>,
        pub(crate) toggles: usize,
    }

    impl Activation for FakeActivation {
        fn is_active(&self, entity: Entity) -> bool {
            !self.inactive.get(&entity).copied().unwrap_or(false)
        }

        fn set_active(&mut self, entity: Entity, active: bool) {
            self.toggles += 1;
            self.inactive.insert(entity, !active);
        }
    }

    /// Real entity ids without needing systems.
    pub(crate) fn entities<const N: usize>() -> [Entity; N] {
        let mut world = World::new();
        std::array::from_fn(|_| world.spawn_empty().id())
    }
}
