// Main menu: continue with saved flags or start over.

use bevy::prelude::*;

use crate::flags::FlagStore;
use crate::sections::Sections;

pub struct MenuPlugin;

impl Plugin for MenuPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(Sections::Menu), setup_menu)
            .add_systems(
                Update,
                (button_visuals, button_actions).run_if(in_state(Sections::Menu)),
            );
    }
}

const NORMAL_BUTTON: Color = Color::srgb(0.15, 0.15, 0.15);
const HOVERED_BUTTON: Color = Color::srgb(0.25, 0.25, 0.25);
const PRESSED_BUTTON: Color = Color::srgb(0.35, 0.35, 0.35);

#[derive(Component)]
enum MenuButton {
    Continue,
    NewGame,
    #[cfg(not(target_arch = "wasm32"))]
    Exit,
}

fn setup_menu(mut commands: Commands, store: Res<FlagStore>) {
    let progress = match store.len() {
        0 => "No progress saved".to_owned(),
        1 => "1 flag saved".to_owned(),
        n => format!("{n} flags saved"),
    };

    commands
        .spawn((
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                row_gap: Val::Px(24.0),
                ..default()
            },
            DespawnOnExit(Sections::Menu),
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new("Flagkeeper"),
                TextFont {
                    font_size: 48.0,
                    ..default()
                },
                TextColor(Color::WHITE),
            ));
            parent.spawn((
                Text::new(progress),
                TextFont {
                    font_size: 20.0,
                    ..default()
                },
                TextColor(Color::srgba(0.8, 0.8, 0.8, 1.0)),
                Node {
                    margin: UiRect::bottom(Val::Px(16.0)),
                    ..default()
                },
            ));

            spawn_button(parent, "Continue", MenuButton::Continue);
            spawn_button(parent, "New Game", MenuButton::NewGame);

            // Exit button (native only).
            #[cfg(not(target_arch = "wasm32"))]
            spawn_button(parent, "Exit", MenuButton::Exit);
        });
}

fn spawn_button(parent: &mut ChildSpawnerCommands, label: &str, marker: MenuButton) {
    parent
        .spawn((
            marker,
            Button,
            Node {
                width: Val::Px(200.0),
                height: Val::Px(50.0),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                border: UiRect::all(Val::Px(2.0)),
                ..default()
            },
            BorderColor::all(Color::srgba(1.0, 1.0, 1.0, 0.3)),
            BackgroundColor(NORMAL_BUTTON),
        ))
        .with_children(|btn| {
            btn.spawn((
                Text::new(label),
                TextFont {
                    font_size: 24.0,
                    ..default()
                },
                TextColor(Color::WHITE),
            ));
        });
}

fn button_visuals(
    mut query: Query<
        (&Interaction, &mut BackgroundColor, &mut BorderColor),
        (Changed<Interaction>, With<MenuButton>),
    >,
) {
    for (interaction, mut bg, mut border) in &mut query {
        let (colour, edge) = match *interaction {
            Interaction::Pressed => (PRESSED_BUTTON, Color::WHITE),
            Interaction::Hovered => (HOVERED_BUTTON, Color::WHITE),
            Interaction::None => (NORMAL_BUTTON, Color::srgba(1.0, 1.0, 1.0, 0.3)),
        };
        *bg = colour.into();
        *border = BorderColor::all(edge);
    }
}

fn button_actions(
    query: Query<(&Interaction, &MenuButton), Changed<Interaction>>,
    mut next_state: ResMut<NextState<Sections>>,
    mut store: ResMut<FlagStore>,
    #[cfg(not(target_arch = "wasm32"))] mut exit: MessageWriter<AppExit>,
) {
    for (interaction, button) in &query {
        if *interaction != Interaction::Pressed {
            continue;
        }
        match button {
            MenuButton::Continue => {
                next_state.set(Sections::Room);
            }
            MenuButton::NewGame => {
                store.reset_all();
                next_state.set(Sections::Room);
            }
            #[cfg(not(target_arch = "wasm32"))]
            MenuButton::Exit => {
                exit.write(AppExit::Success);
            }
        }
    }
}
