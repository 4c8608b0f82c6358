/// Game sections.
use bevy::prelude::*;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, States)]
pub enum Sections {
    #[default]
    Menu,
    Room,
}
