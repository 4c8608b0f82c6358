// Main
use bevy::prelude::*;
use flagkeeper::flags::FlagsPlugin;
use flagkeeper::menu::MenuPlugin;
use flagkeeper::player::PlayerPlugin;
use flagkeeper::puzzle_room::PuzzleRoomPlugin;
use flagkeeper::sections::Sections;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins)
        .init_state::<Sections>()
        .add_plugins((FlagsPlugin, MenuPlugin, PlayerPlugin, PuzzleRoomPlugin))
        .run();
}
