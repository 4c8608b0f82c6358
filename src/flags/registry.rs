// Name → entity lookup for bindings that only know their target by name.
use std::collections::HashMap;

use bevy::prelude::*;

#[derive(Resource, Debug, Default)]
pub struct EntityRegistry {
    by_name: HashMap<String, Vec<Entity>>,
}

impl EntityRegistry {
    /// Entities sharing a name queue up behind the first one registered, so
    /// lookups behave like a first-found scene search.
    pub fn register(&mut self, name: impl Into<String>, entity: Entity) {
        let name = name.into();
        let holders = self.by_name.entry(name).or_default();
        if !holders.contains(&entity) {
            holders.push(entity);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Entity> {
        self.by_name.get(name).and_then(|holders| holders.first().copied())
    }

    pub fn unregister(&mut self, entity: Entity) {
        self.by_name.retain(|_, holders| {
            holders.retain(|held| *held != entity);
            !holders.is_empty()
        });
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.by_name.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Mirror `Name` components into the registry as they come and go.
pub(super) fn sync_registry(
    mut registry: ResMut<EntityRegistry>,
    named: Query<(Entity, &Name), Changed<Name>>,
    mut removed: RemovedComponents<Name>,
) {
    for entity in removed.read() {
        registry.unregister(entity);
    }
    for (entity, name) in &named {
        registry.unregister(entity);
        registry.register(name.as_str(), entity);
    }
}
