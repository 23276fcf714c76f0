//! egui console example.
//!
//! Run with: `cargo run --example egui`
//!
//! Controls:
//! - ` (grave) toggles the console, Escape closes it
//! - Enter submits, Tab completes and cycles, ArrowUp/ArrowDown browse history
//! - Ctrl+F1 is bound to `spawn 5` and works while the console is closed
//!
//! Try: `help`, `r_clear_color 0.2`, `spawn 3`, `despawn`, `?r_`, `audit_cvars`.

use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy_xconsole::prelude::*;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(LogPlugin {
            custom_layer: bevy_xconsole::logging::custom_log_layer,
            ..default()
        }))
        .add_plugins(bevy_egui::EguiPlugin::default())
        .add_plugins(ConsolePlugin::default())
        .add_systems(Startup, setup)
        .add_systems(Update, apply_clear_color)
        .run();
}

#[derive(Component)]
struct DemoEntity;

fn setup(mut commands: Commands, mut console: Console) {
    commands.spawn(Camera2d);

    console.register(
        CVar::new("r_clear_color", 0.1f32)
            .help("Grey level of the background")
            .flags(CVarFlags::DUMPTODISK),
    );

    console.add_command(
        ConCommand::new("spawn", |args, world| {
            let count = args.parse_or(0, 1usize);
            for i in 0..count {
                world.spawn((
                    DemoEntity,
                    Sprite::from_color(Color::srgb(0.8, 0.3, 0.3), Vec2::splat(40.0)),
                    Transform::from_xyz(i as f32 * 50.0, 0.0, 0.0),
                ));
            }
            info!("Spawned {} entities", count);
        })
        .help("Spawn demo entities\nspawn [count]"),
    );

    console.add_command(
        ConCommand::new("despawn", |_args, world| {
            let entities: Vec<Entity> = world
                .query_filtered::<Entity, With<DemoEntity>>()
                .iter(world)
                .collect();
            for entity in &entities {
                world.despawn(*entity);
            }
            info!("Despawned {} entities", entities.len());
        })
        .help("Despawn all demo entities"),
    );

    console.state_mut().create_key_bind("ctrl_f1", "spawn 5");
}

fn apply_clear_color(console: ConsoleRef, mut clear_color: ResMut<ClearColor>) {
    if let Some(grey) = console.get_f32("r_clear_color") {
        clear_color.0 = Color::srgb(grey, grey, grey);
    }
}
