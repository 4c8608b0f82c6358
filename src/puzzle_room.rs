// Puzzle room: a key, a locked cellar door, and a lever, wired entirely
// through flag gates and conditional visibility.

use bevy::prelude::*;

use crate::flags::{ConditionalVisibility, FlagGate, FlagStore, TriggerVolume, VisibilityBinding};
use crate::player::EYE_HEIGHT;
use crate::sections::Sections;

pub struct PuzzleRoomPlugin;

impl Plugin for PuzzleRoomPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(Sections::Room), setup_room)
            .add_systems(OnExit(Sections::Room), exit_room)
            .add_systems(
                Update,
                (update_flag_hud, leave_room).run_if(in_state(Sections::Room)),
            );
    }
}

pub const KEY_FLAG: &str = "cellar_key_taken";
pub const DOOR_FLAG: &str = "cellar_door_opened";
pub const LEVER_FLAG: &str = "lantern_lever_pulled";
const HINT_FLAG: &str = "key_hint";

const LEAVE_KEY: KeyCode = KeyCode::Backspace;

/// Trigger volumes are centred at eye height so the radius is horizontal reach.
const PICKUP_RADIUS: f32 = 1.5;
const REACH_RADIUS: f32 = 2.5;

#[derive(Component)]
struct FlagHud;

fn setup_room(
    mut commands: Commands,
    store: Res<FlagStore>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.insert_resource(GlobalAmbientLight {
        color: Color::srgb(0.9, 0.85, 0.7),
        brightness: 200.0,
        affects_lightmapped_meshes: false,
    });

    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(20.0, 20.0))),
        MeshMaterial3d(materials.add(Color::srgb(0.3, 0.28, 0.25))),
        DespawnOnExit(Sections::Room),
    ));

    commands.spawn((
        PointLight {
            color: Color::srgb(1.0, 0.9, 0.7),
            intensity: 400_000.0,
            range: 30.0,
            ..default()
        },
        Transform::from_xyz(0.0, 6.0, 0.0),
        DespawnOnExit(Sections::Room),
    ));

    // Key: taken by walking over it, gone for good afterwards.
    commands.spawn((
        Name::new("CellarKey"),
        FlagGate::new(KEY_FLAG)
            .on_trigger_enter()
            .hide_when_flagged()
            .hide_on_load_if_flagged(),
        TriggerVolume::new(PICKUP_RADIUS),
        Mesh3d(meshes.add(Cuboid::new(0.3, 0.1, 0.6))),
        MeshMaterial3d(materials.add(Color::srgb(0.85, 0.65, 0.2))),
        Transform::from_xyz(-4.0, EYE_HEIGHT, 2.0),
        DespawnOnExit(Sections::Room),
    ));

    // Glow over the key until someone takes it.
    commands.spawn((
        Name::new("KeyHint"),
        FlagGate::new(HINT_FLAG)
            .watching(KEY_FLAG)
            .hide_when_required_found()
            .monitored(),
        Mesh3d(meshes.add(Sphere::new(0.15))),
        MeshMaterial3d(materials.add(StandardMaterial {
            emissive: LinearRgba::rgb(4.0, 3.0, 0.5),
            ..default()
        })),
        Transform::from_xyz(-4.0, EYE_HEIGHT + 0.6, 2.0),
        DespawnOnExit(Sections::Room),
    ));

    // Door: needs the key, opened with the interact key while in reach.
    commands.spawn((
        Name::new("CellarDoor"),
        FlagGate::new(DOOR_FLAG)
            .requiring(KEY_FLAG)
            .on_interact()
            .hide_when_flagged()
            .hide_on_load_if_flagged(),
        TriggerVolume::new(REACH_RADIUS),
        Mesh3d(meshes.add(Cuboid::new(2.0, 3.0, 0.2))),
        MeshMaterial3d(materials.add(Color::srgb(0.35, 0.2, 0.1))),
        Transform::from_xyz(0.0, EYE_HEIGHT, -7.0),
        DespawnOnExit(Sections::Room),
    ));

    commands.spawn((
        Name::new("Lever"),
        FlagGate::new(LEVER_FLAG).on_interact(),
        TriggerVolume::new(REACH_RADIUS),
        Mesh3d(meshes.add(Cuboid::new(0.2, 1.0, 0.2))),
        MeshMaterial3d(materials.add(Color::srgb(0.5, 0.5, 0.55))),
        Transform::from_xyz(5.0, EYE_HEIGHT, 0.0),
        DespawnOnExit(Sections::Room),
    ));

    // Targets driven by the puzzle manager below, found by name.
    commands.spawn((
        Name::new("TreasureChest"),
        Mesh3d(meshes.add(Cuboid::new(1.2, 0.8, 0.8))),
        MeshMaterial3d(materials.add(Color::srgb(0.6, 0.45, 0.1))),
        Transform::from_xyz(0.0, 0.4, -8.5),
        DespawnOnExit(Sections::Room),
    ));
    commands.spawn((
        Name::new("Lantern"),
        Mesh3d(meshes.add(Sphere::new(0.3))),
        MeshMaterial3d(materials.add(StandardMaterial {
            emissive: LinearRgba::rgb(6.0, 4.0, 1.0),
            ..default()
        })),
        Transform::from_xyz(5.0, 2.5, -3.0),
        DespawnOnExit(Sections::Room),
    ));
    commands.spawn((
        Name::new("Cobweb"),
        Mesh3d(meshes.add(Cuboid::new(2.2, 0.6, 0.05))),
        MeshMaterial3d(materials.add(Color::srgba(0.9, 0.9, 0.9, 0.6))),
        Transform::from_xyz(0.0, 3.2, -6.8),
        DespawnOnExit(Sections::Room),
    ));

    commands.spawn((
        Name::new("PuzzleManager"),
        ConditionalVisibility::new(vec![
            VisibilityBinding::named("TreasureChest", DOOR_FLAG).continuous(),
            VisibilityBinding::named("Lantern", LEVER_FLAG).continuous(),
            VisibilityBinding::named("Cobweb", LEVER_FLAG).hidden_when_present(),
        ]),
        DespawnOnExit(Sections::Room),
    ));

    commands.spawn((
        FlagHud,
        Text::new(hud_text(&store)),
        TextFont {
            font_size: 18.0,
            ..default()
        },
        TextColor(Color::WHITE),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(10.0),
            left: Val::Px(10.0),
            ..default()
        },
        DespawnOnExit(Sections::Room),
    ));
}

fn hud_text(store: &FlagStore) -> String {
    let flags = if store.is_empty() {
        "none".to_owned()
    } else {
        store.iter().collect::<Vec<_>>().join(", ")
    };
    format!("Flags: {flags}\nE: interact   Backspace: menu")
}

fn update_flag_hud(store: Res<FlagStore>, mut hud: Query<&mut Text, With<FlagHud>>) {
    let Ok(mut text) = hud.single_mut() else {
        return;
    };
    let line = hud_text(&store);
    if **text != line {
        **text = line;
    }
}

fn leave_room(keyboard: Res<ButtonInput<KeyCode>>, mut next_section: ResMut<NextState<Sections>>) {
    if keyboard.just_pressed(LEAVE_KEY) {
        next_section.set(Sections::Menu);
    }
}

fn exit_room(mut commands: Commands, mut store: ResMut<FlagStore>) {
    store.flush();
    commands.insert_resource(GlobalAmbientLight::NONE);
}
