// Spatial trigger volumes and the interact key, turned into messages for gates.
use bevy::prelude::*;

pub const INTERACT_KEY: KeyCode = KeyCode::KeyE;

/// Marks the entity (normally the player) whose presence fires trigger volumes.
#[derive(Component, Default)]
pub struct TriggerActivator;

/// A sphere around the entity's position that reports enter/exit of a
/// [`TriggerActivator`].
#[derive(Component, Debug, Clone, Copy)]
pub struct TriggerVolume {
    pub radius: f32,
    occupied: bool,
}

impl TriggerVolume {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            occupied: false,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_occupied(&self) -> bool {
        self.occupied
    }
}

#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEntered {
    pub volume: Entity,
}

#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerExited {
    pub volume: Entity,
}

/// The interact action was pressed this frame.
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct InteractPressed;

/// Ask a gate to register its flag, subject to its prerequisite.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterFlag {
    pub gate: Entity,
}

/// A hidden volume reads as empty, so showing it again with the activator
/// already inside fires a fresh enter.
pub(super) fn detect_trigger_volumes(
    activators: Query<&Transform, With<TriggerActivator>>,
    mut volumes: Query<(Entity, &Transform, &mut TriggerVolume, Option<&Visibility>)>,
    mut entered: MessageWriter<TriggerEntered>,
    mut exited: MessageWriter<TriggerExited>,
) {
    for (entity, transform, mut volume, visibility) in &mut volumes {
        let hidden = visibility.is_some_and(|vis| *vis == Visibility::Hidden);
        let radius_sq = volume.radius * volume.radius;
        let occupied = !hidden
            && activators.iter().any(|activator| {
                activator
                    .translation
                    .distance_squared(transform.translation)
                    <= radius_sq
            });

        if occupied == volume.occupied {
            continue;
        }
        volume.occupied = occupied;
        if occupied {
            entered.write(TriggerEntered { volume: entity });
        } else {
            exited.write(TriggerExited { volume: entity });
        }
    }
}

pub(super) fn read_interact_key(
    keyboard: Option<Res<ButtonInput<KeyCode>>>,
    mut interact: MessageWriter<InteractPressed>,
) {
    let Some(keyboard) = keyboard else {
        return;
    };
    if keyboard.just_pressed(INTERACT_KEY) {
        interact.write(InteractPressed);
    }
}
