//! Family domain plugin for Willowmere.
//!
//! Covers the whole child lifecycle: births into the household, identity
//! selection from the candidate pool, crib allocation for the small ones,
//! and the daily outdoor excursions once a child is toddler-aged.
//! Communicates exclusively through shared resources and events, plus the
//! world's map/pathfinding services.

use bevy::prelude::*;
use crate::shared::*;

pub mod aging;
pub mod birth;
pub mod crib;
pub mod definitions;
pub mod excursion;
pub mod identity;

use aging::age_children_on_day_end;
use birth::{
    deliver_child, progress_pregnancy, respawn_children_on_reload, spawn_initial_children,
    SpawnedChildren,
};
use crib::{assign_cribs, invalidate_on_furniture_change, reposition_small_children};
use excursion::{
    detect_transit_interruptions, evaluate_outings, handle_path_results, handle_recalls,
    handle_route_arrivals, reset_excursions_on_day_end, schedule_returns, walk_routes,
};

pub struct FamilyPlugin;

impl Plugin for FamilyPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SpawnedChildren>();

        // Populate the identity pool on startup (before Loading completes)
        app.add_systems(Startup, setup_child_registry);

        // Spawn entity mirrors for any roster the data/save layer seeded.
        app.add_systems(OnEnter(GameState::Playing), spawn_initial_children);

        // Birth and crib systems. Chained so a child born this frame gets a
        // crib before it is repositioned.
        app.add_systems(
            Update,
            (
                // Pregnancy countdown at day start
                progress_pregnancy,
                // Identity pick + entity spawn for a due birth
                deliver_child,
                // Rebuild entities after save/load or new game
                respawn_children_on_reload,
                // Furniture changes drop all crib claims
                invalidate_on_furniture_change,
                // Lazy per-day crib assignment
                assign_cribs,
                // Place infants at their crib with band offsets
                reposition_small_children,
            )
                .chain()
                .run_if(in_state(GameState::Playing)),
        );

        // Excursion state machine. The chain keeps command flushes between
        // steps so a path request inserted by one system is visible to the
        // next, and the day-end reset lands before aging.
        app.add_systems(
            Update,
            (
                // Tick evaluation: who leaves, who waits
                evaluate_outings,
                // Async path results (may be failures)
                handle_path_results,
                // Walk along active routes
                walk_routes,
                // Interpret arrivals per state
                handle_route_arrivals,
                // Scheduled return time
                schedule_returns,
                // Explicit recalls
                handle_recalls,
                // External relocation recovery
                detect_transit_interruptions,
                // Day boundary: hard reset home
                reset_excursions_on_day_end,
                // Then age everyone at home
                age_children_on_day_end,
            )
                .chain()
                .run_if(in_state(GameState::Playing)),
        );
    }
}

/// System: populate the ChildRegistry from the built-in definitions.
fn setup_child_registry(mut registry: ResMut<ChildRegistry>) {
    let built = definitions::build_child_registry();
    registry.defs = built.defs;
    registry.ordered_ids = built.ordered_ids;
}
