mod shared;
mod calendar;
mod world;
mod family;
mod data;
mod save;

use bevy::prelude::*;
use bevy::window::{PresentMode, WindowResolution};

use shared::*;

fn main() {
    App::new()
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Willowmere".into(),
                        resolution: WindowResolution::new(SCREEN_WIDTH, SCREEN_HEIGHT),
                        present_mode: PresentMode::AutoVsync,
                        resizable: true,
                        ..default()
                    }),
                    ..default()
                })
                .set(ImagePlugin::default_nearest()),
        )
        // Game state
        .init_state::<GameState>()
        // Shared resources
        .init_resource::<Calendar>()
        .init_resource::<FarmName>()
        .init_resource::<HouseState>()
        .init_resource::<HouseFurniture>()
        .init_resource::<MarriageState>()
        .init_resource::<ChildRegistry>()
        .init_resource::<IdentityOverrides>()
        .init_resource::<FamilyConfig>()
        .init_resource::<FamilyState>()
        .init_resource::<CribCache>()
        .init_resource::<ExitQueue>()
        // Events
        .add_event::<TenMinuteTickEvent>()
        .add_event::<DayEndEvent>()
        .add_event::<DayStartedEvent>()
        .add_event::<SeasonChangeEvent>()
        .add_event::<BirthDueEvent>()
        .add_event::<ChildBornEvent>()
        .add_event::<RecallChildEvent>()
        .add_event::<FurnitureChangedEvent>()
        .add_event::<PathComputedEvent>()
        .add_event::<RouteArrivalEvent>()
        .add_event::<HouseholdReloadedEvent>()
        // Domain plugins
        .add_plugins(calendar::CalendarPlugin)
        .add_plugins(world::WorldPlugin)
        .add_plugins(family::FamilyPlugin)
        .add_plugins(save::SavePlugin)
        // Data loading
        .add_plugins(data::DataPlugin)
        // Camera
        .add_systems(Startup, setup_camera)
        .run();
}

fn setup_camera(mut commands: Commands) {
    commands.spawn((
        Camera2d,
        Transform::from_scale(Vec3::splat(1.0 / PIXEL_SCALE)),
    ));
}
