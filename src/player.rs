// First-person camera with mouse look and keyboard movement. The player is
// what fires trigger volumes.
use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;
use bevy::window::{CursorGrabMode, CursorOptions};

use crate::flags::TriggerActivator;
use crate::sections::Sections;

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_player)
            .insert_resource(ClearColor(Color::BLACK))
            .add_systems(OnEnter(Sections::Room), reset_player)
            .add_systems(OnExit(Sections::Room), release_cursor)
            .add_systems(
                Update,
                (toggle_cursor_grab, mouse_look, player_movement)
                    .chain()
                    .run_if(in_state(Sections::Room)),
            );
    }
}

#[derive(Component)]
pub struct Player;

/// Tracks the player's yaw and pitch for composed camera rotation.
#[derive(Component, Default)]
pub struct PlayerLook {
    pub yaw: f32,
    pub pitch: f32,
}

pub const EYE_HEIGHT: f32 = 1.5;
const MOUSE_SENSITIVITY: f32 = 0.003;
const MOVE_SPEED: f32 = 4.0;
const MAX_PITCH: f32 = 1.3;
/// Keep the player inside the room walls.
const ROOM_LIMIT: f32 = 9.0;

const START: Vec3 = Vec3::new(0.0, EYE_HEIGHT, 7.0);

fn spawn_player(mut commands: Commands) {
    commands.spawn((
        Player,
        TriggerActivator,
        PlayerLook::default(),
        Camera3d::default(),
        Projection::from(PerspectiveProjection {
            fov: std::f32::consts::FRAC_PI_2 * 0.8,
            near: 0.01,
            ..default()
        }),
        Transform::from_translation(START),
    ));
}

fn toggle_cursor_grab(
    mouse: Res<ButtonInput<MouseButton>>,
    keyboard: Res<ButtonInput<KeyCode>>,
    mut cursor: Query<&mut CursorOptions>,
) {
    let Ok(mut cursor) = cursor.single_mut() else {
        return;
    };

    if mouse.just_pressed(MouseButton::Left) {
        cursor.grab_mode = CursorGrabMode::Locked;
        cursor.visible = false;
    }
    if keyboard.just_pressed(KeyCode::Escape) {
        cursor.grab_mode = CursorGrabMode::None;
        cursor.visible = true;
    }
}

fn mouse_look(
    mut motion: MessageReader<MouseMotion>,
    mut query: Query<(&mut Transform, &mut PlayerLook), With<Player>>,
    cursor: Query<&CursorOptions>,
) {
    let Ok(cursor) = cursor.single() else {
        return;
    };
    if cursor.grab_mode != CursorGrabMode::Locked {
        return;
    }

    let delta: Vec2 = motion.read().map(|ev| ev.delta).sum();
    if delta == Vec2::ZERO {
        return;
    }

    let Ok((mut transform, mut look)) = query.single_mut() else {
        return;
    };
    look.yaw -= delta.x * MOUSE_SENSITIVITY;
    look.pitch = (look.pitch - delta.y * MOUSE_SENSITIVITY).clamp(-MAX_PITCH, MAX_PITCH);
    transform.rotation = Quat::from_rotation_y(look.yaw) * Quat::from_rotation_x(look.pitch);
}

fn player_movement(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut query: Query<&mut Transform, With<Player>>,
    time: Res<Time>,
) {
    let Ok(mut transform) = query.single_mut() else {
        return;
    };

    let forward = *transform.forward();
    let forward_xz = Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();
    let right_xz = Vec3::new(-forward_xz.z, 0.0, forward_xz.x);

    let mut movement = Vec3::ZERO;
    if keyboard.pressed(KeyCode::KeyW) {
        movement += forward_xz;
    }
    if keyboard.pressed(KeyCode::KeyS) {
        movement -= forward_xz;
    }
    if keyboard.pressed(KeyCode::KeyD) {
        movement += right_xz;
    }
    if keyboard.pressed(KeyCode::KeyA) {
        movement -= right_xz;
    }

    transform.translation += movement.normalize_or_zero() * MOVE_SPEED * time.delta_secs();
    transform.translation.x = transform.translation.x.clamp(-ROOM_LIMIT, ROOM_LIMIT);
    transform.translation.z = transform.translation.z.clamp(-ROOM_LIMIT, ROOM_LIMIT);
}

fn reset_player(mut query: Query<(&mut Transform, &mut PlayerLook), With<Player>>) {
    let Ok((mut transform, mut look)) = query.single_mut() else {
        return;
    };
    transform.translation = START;
    transform.rotation = Quat::IDENTITY;
    *look = PlayerLook::default();
}

fn release_cursor(mut cursor: Query<&mut CursorOptions>) {
    let Ok(mut cursor) = cursor.single_mut() else {
        return;
    };
    cursor.grab_mode = CursorGrabMode::None;
    cursor.visible = true;
}
