//! Persistent game-progress flags for Bevy, and a small puzzle room that
//! plays through them.
pub mod flags;
pub mod menu;
pub mod player;
pub mod puzzle_room;
pub mod sections;
