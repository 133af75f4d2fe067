//! Daily excursions: toddlers walk out the farmhouse door and back.
//!
//! Every independent-age child runs a small state machine evaluated on the
//! ten-minute tick:
//!
//!   Home → QueuedToLeave → EnRouteOutside → Outside → EnRouteHome → Home
//!
//! The household's single door is serialized through `ExitQueue`: whoever
//! reserves it first transits; everyone else re-rolls on a later tick.
//! Path requests go through the world's `Pathfinder` and resolve into
//! `PathComputedEvent`s a frame later; any failure, interruption, or day
//! boundary drops the child back to `Home` with the queue released.

use bevy::prelude::*;
use rand::Rng;

use crate::shared::*;
use crate::world::pathfinding::Pathfinder;
use crate::world::{arrival_pos_on, exit_tile_to, find_standable_tile_near, WorldMaps};

// ─── Components ───────────────────────────────────────────────────────────────

/// Which map this child entity currently lives on.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildMapTag(pub MapId);

/// A route being walked, with the index of the next waypoint.
#[derive(Component, Debug, Clone)]
pub struct ActiveRoute {
    pub route: PathRoute,
    pub next: usize,
}

/// The child has an outstanding path request and is waiting for its result.
#[derive(Component, Debug, Clone, Copy)]
pub struct AwaitingPath {
    pub request_id: u32,
    pub purpose: PathPurpose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPurpose {
    /// Indoors, heading for the exit tile.
    ToExit,
    /// Outdoors, heading back to the door.
    ReturnOutdoor,
    /// Indoors again, walking from the door to the resting spot.
    ReturnIndoor,
}

// ─── Pure helpers ─────────────────────────────────────────────────────────────

/// Children only go out in fair weather.
pub fn weather_allows_outing(weather: Weather) -> bool {
    matches!(weather, Weather::Sunny)
}

pub fn within_outing_window(time_float: f32, config: &FamilyConfig) -> bool {
    time_float >= config.outing_earliest_hour && time_float <= config.outing_latest_hour
}

/// Where this child settles when indoors: its crib for the day, or the
/// default rest tile when no crib was available.
pub fn resting_tile(child: &Child) -> GridPosition {
    child.crib.map(|c| c.tile()).unwrap_or(DEFAULT_REST_TILE)
}

/// The planned indoor return leg ends at the door's default arrival spot;
/// rewrite the terminus so the child ends the day wherever its crib actually
/// is, not at a stale default position.
pub fn rewrite_home_leg(waypoints: &mut Vec<GridPosition>, rest: GridPosition) {
    if let Some(last) = waypoints.last_mut() {
        *last = rest;
    } else {
        waypoints.push(rest);
    }
}

fn snap_home(child: &mut Child, map_tag: &mut ChildMapTag, transform: &mut Transform) {
    map_tag.0 = MapId::Farmhouse;
    let rest = resting_tile(child);
    let pos = grid_to_world_center(rest.x, rest.y);
    transform.translation.x = pos.x;
    transform.translation.y = pos.y;
    child.excursion = ExcursionState::Home;
}

// ─── Systems ──────────────────────────────────────────────────────────────────

/// System: on each ten-minute tick, decide which toddler (if any) starts an
/// outing. The exit queue is consulted before any transition is granted, so
/// at most one child queues per household per tick; the rest stay Home and
/// re-roll later.
pub fn evaluate_outings(
    mut commands: Commands,
    mut ticks: EventReader<TenMinuteTickEvent>,
    calendar: Res<Calendar>,
    config: Res<FamilyConfig>,
    maps: Res<WorldMaps>,
    mut queue: ResMut<ExitQueue>,
    mut pathfinder: ResMut<Pathfinder>,
    mut children: Query<
        (Entity, &mut Child, &ChildMapTag, &Transform),
        (Without<ActiveRoute>, Without<AwaitingPath>),
    >,
) {
    for tick in ticks.read() {
        if !weather_allows_outing(calendar.weather) {
            continue;
        }
        if !within_outing_window(calendar.time_float(), &config) {
            continue;
        }
        let Some(house) = maps.get(MapId::Farmhouse) else {
            continue;
        };
        // No outdoor destination, no excursions.
        let Some(exit) = exit_tile_to(house, MapId::Farm) else {
            continue;
        };

        let mut rng = rand::thread_rng();
        for (entity, mut child, map_tag, transform) in children.iter_mut() {
            if !child.age_band.is_independent() {
                continue;
            }
            if child.excursion != ExcursionState::Home || map_tag.0 != MapId::Farmhouse {
                continue;
            }
            // Door already spoken for this tick; later children wait.
            if queue.0.is_some() {
                break;
            }
            if rng.gen::<f32>() < config.outing_skip_chance {
                continue;
            }
            if !queue.try_reserve(entity, exit, tick.tick_index) {
                break;
            }

            let from = world_to_grid(transform.translation.truncate());
            let request_id = pathfinder.request(entity, MapId::Farmhouse, from, exit);
            child.excursion = ExcursionState::QueuedToLeave;
            commands.entity(entity).insert(AwaitingPath {
                request_id,
                purpose: PathPurpose::ToExit,
            });
            info!("[Family] {} heads for the door", child.display_name);
        }
    }
}

/// System: consume path results. A result only counts if the child is still
/// waiting on that exact request — late or duplicated completions for a
/// state the child already left are ignored.
pub fn handle_path_results(
    mut commands: Commands,
    mut events: EventReader<PathComputedEvent>,
    mut queue: ResMut<ExitQueue>,
    mut children: Query<(
        Entity,
        &mut Child,
        &mut ChildMapTag,
        &mut Transform,
        Option<&AwaitingPath>,
    )>,
) {
    for event in events.read() {
        let Ok((entity, mut child, mut map_tag, mut transform, awaiting)) =
            children.get_mut(event.child)
        else {
            continue;
        };
        let Some(awaiting) = awaiting.copied() else {
            continue;
        };
        if awaiting.request_id != event.request_id {
            continue;
        }
        commands.entity(entity).remove::<AwaitingPath>();

        match (awaiting.purpose, event.route.clone()) {
            (PathPurpose::ToExit, Some(route))
                if child.excursion == ExcursionState::QueuedToLeave =>
            {
                child.excursion = ExcursionState::EnRouteOutside;
                commands.entity(entity).insert(ActiveRoute { route, next: 0 });
            }
            (PathPurpose::ToExit, _) => {
                // Unreachable exit (or the state already moved on): give the
                // door back and stay home.
                queue.release_for(entity);
                child.excursion = ExcursionState::Home;
                info!(
                    "[Family] {} couldn't reach the door; staying home",
                    child.display_name
                );
            }
            (PathPurpose::ReturnOutdoor, Some(route))
                if child.excursion == ExcursionState::EnRouteHome =>
            {
                commands.entity(entity).insert(ActiveRoute { route, next: 0 });
            }
            (PathPurpose::ReturnIndoor, Some(mut route))
                if child.excursion == ExcursionState::EnRouteHome =>
            {
                rewrite_home_leg(&mut route.waypoints, resting_tile(&child));
                commands.entity(entity).insert(ActiveRoute { route, next: 0 });
            }
            (PathPurpose::ReturnOutdoor | PathPurpose::ReturnIndoor, _) => {
                // Can't path home: best effort is an instant indoor snap.
                queue.release_for(entity);
                snap_home(&mut child, &mut map_tag, &mut transform);
                warn!(
                    "[Family] {} had no route home; snapped to the resting spot",
                    child.display_name
                );
            }
        }
    }
}

/// System: advance children along their active routes every frame.
pub fn walk_routes(
    mut commands: Commands,
    time: Res<Time>,
    mut arrivals: EventWriter<RouteArrivalEvent>,
    mut walkers: Query<(Entity, &mut ActiveRoute, &mut Transform)>,
) {
    let dt = time.delta_secs();
    for (entity, mut active, mut transform) in walkers.iter_mut() {
        let Some(&target) = active.route.waypoints.get(active.next) else {
            commands.entity(entity).remove::<ActiveRoute>();
            arrivals.send(RouteArrivalEvent { child: entity });
            continue;
        };

        let target_pos = grid_to_world_center(target.x, target.y);
        let current = transform.translation.truncate();
        let delta = target_pos - current;
        let dist = delta.length();

        if dist <= 1.0 {
            transform.translation.x = target_pos.x;
            transform.translation.y = target_pos.y;
            active.next += 1;
            if active.next >= active.route.waypoints.len() {
                commands.entity(entity).remove::<ActiveRoute>();
                arrivals.send(RouteArrivalEvent { child: entity });
            }
        } else {
            let step = (CHILD_WALK_SPEED * dt).min(dist);
            let dir = delta / dist;
            transform.translation.x += dir.x * step;
            transform.translation.y += dir.y * step;
        }
    }
}

/// System: interpret a finished route based on where the child stands in the
/// state machine.
pub fn handle_route_arrivals(
    mut commands: Commands,
    mut events: EventReader<RouteArrivalEvent>,
    calendar: Res<Calendar>,
    config: Res<FamilyConfig>,
    maps: Res<WorldMaps>,
    mut queue: ResMut<ExitQueue>,
    mut pathfinder: ResMut<Pathfinder>,
    mut children: Query<(Entity, &mut Child, &mut ChildMapTag, &mut Transform)>,
) {
    for event in events.read() {
        let Ok((entity, mut child, mut map_tag, mut transform)) = children.get_mut(event.child)
        else {
            continue;
        };

        match child.excursion {
            ExcursionState::EnRouteOutside => {
                // Reached the exit: swap to the outdoor representation and
                // free the door for the next child.
                let anchor = maps
                    .get(MapId::Farmhouse)
                    .and_then(|house| arrival_pos_on(house, MapId::Farm))
                    .unwrap_or(DEFAULT_REST_TILE);
                let spot = maps
                    .get(MapId::Farm)
                    .and_then(|farm| {
                        find_standable_tile_near(
                            farm,
                            anchor,
                            config.standable_search_attempts,
                            config.standable_search_radius,
                            &mut rand::thread_rng(),
                        )
                    })
                    .unwrap_or(anchor);

                map_tag.0 = MapId::Farm;
                let pos = grid_to_world_center(spot.x, spot.y);
                transform.translation.x = pos.x;
                transform.translation.y = pos.y;
                queue.release_for(entity);
                child.excursion = ExcursionState::Outside {
                    return_at: calendar.time_float() + config.outing_duration_hours,
                };
                info!("[Family] {} is playing outside", child.display_name);
            }
            ExcursionState::EnRouteHome if map_tag.0 == MapId::Farm => {
                // Back at the door: step inside, then walk the indoor leg.
                let Some(indoor) = maps
                    .get(MapId::Farm)
                    .and_then(|farm| arrival_pos_on(farm, MapId::Farmhouse))
                else {
                    snap_home(&mut child, &mut map_tag, &mut transform);
                    continue;
                };
                map_tag.0 = MapId::Farmhouse;
                let pos = grid_to_world_center(indoor.x, indoor.y);
                transform.translation.x = pos.x;
                transform.translation.y = pos.y;

                let request_id =
                    pathfinder.request(entity, MapId::Farmhouse, indoor, DEFAULT_REST_TILE);
                commands.entity(entity).insert(AwaitingPath {
                    request_id,
                    purpose: PathPurpose::ReturnIndoor,
                });
            }
            ExcursionState::EnRouteHome => {
                // Indoor leg done; the terminus was rewritten to the crib.
                child.excursion = ExcursionState::Home;
                info!("[Family] {} is back home", child.display_name);
            }
            _ => {}
        }
    }
}

/// System: send children home when their scheduled return time passes.
pub fn schedule_returns(
    mut commands: Commands,
    mut ticks: EventReader<TenMinuteTickEvent>,
    calendar: Res<Calendar>,
    maps: Res<WorldMaps>,
    mut pathfinder: ResMut<Pathfinder>,
    mut children: Query<(Entity, &mut Child, &mut ChildMapTag, &mut Transform)>,
) {
    if ticks.is_empty() {
        return;
    }
    ticks.clear();

    let now = calendar.time_float();
    for (entity, mut child, mut map_tag, mut transform) in children.iter_mut() {
        let ExcursionState::Outside { return_at } = child.excursion else {
            continue;
        };
        if now < return_at {
            continue;
        }
        begin_return_trip(
            &mut commands,
            entity,
            &mut child,
            &mut map_tag,
            &mut transform,
            &maps,
            &mut pathfinder,
        );
    }
}

/// System: honor explicit recall requests. A child outside walks back; a
/// child still in transit toward the door aborts and snaps home.
pub fn handle_recalls(
    mut commands: Commands,
    mut events: EventReader<RecallChildEvent>,
    maps: Res<WorldMaps>,
    mut queue: ResMut<ExitQueue>,
    mut pathfinder: ResMut<Pathfinder>,
    mut children: Query<(Entity, &mut Child, &mut ChildMapTag, &mut Transform)>,
) {
    for event in events.read() {
        let Ok((entity, mut child, mut map_tag, mut transform)) = children.get_mut(event.child)
        else {
            continue;
        };
        match child.excursion {
            ExcursionState::Outside { .. } => {
                begin_return_trip(
                    &mut commands,
                    entity,
                    &mut child,
                    &mut map_tag,
                    &mut transform,
                    &maps,
                    &mut pathfinder,
                );
            }
            ExcursionState::QueuedToLeave | ExcursionState::EnRouteOutside => {
                commands.entity(entity).remove::<(ActiveRoute, AwaitingPath)>();
                queue.release_for(entity);
                snap_home(&mut child, &mut map_tag, &mut transform);
                info!("[Family] {} was recalled before leaving", child.display_name);
            }
            _ => {}
        }
    }
}

fn begin_return_trip(
    commands: &mut Commands,
    entity: Entity,
    child: &mut Child,
    map_tag: &mut ChildMapTag,
    transform: &mut Transform,
    maps: &WorldMaps,
    pathfinder: &mut Pathfinder,
) {
    let Some(door) = maps
        .get(MapId::Farm)
        .and_then(|farm| exit_tile_to(farm, MapId::Farmhouse))
    else {
        snap_home(child, map_tag, transform);
        return;
    };
    child.excursion = ExcursionState::EnRouteHome;
    let from = world_to_grid(transform.translation.truncate());
    let request_id = pathfinder.request(entity, MapId::Farm, from, door);
    commands.entity(entity).insert(AwaitingPath {
        request_id,
        purpose: PathPurpose::ReturnOutdoor,
    });
}

/// System: detect children yanked off their route by some external system
/// (map change or a teleport well past the next waypoint) and recover them
/// to a safe state instead of retrying the stale path. Also sweeps up any
/// in-transit child that lost both its route and its pending request.
pub fn detect_transit_interruptions(
    mut commands: Commands,
    mut ticks: EventReader<TenMinuteTickEvent>,
    mut queue: ResMut<ExitQueue>,
    mut children: Query<(
        Entity,
        &mut Child,
        &mut ChildMapTag,
        &mut Transform,
        Option<&ActiveRoute>,
        Option<&AwaitingPath>,
    )>,
) {
    if ticks.is_empty() {
        return;
    }
    ticks.clear();

    for (entity, mut child, mut map_tag, mut transform, route, awaiting) in children.iter_mut() {
        if let Some(active) = route {
            let derailed = match active.route.waypoints.get(active.next) {
                Some(next) => {
                    let expected = grid_to_world_center(next.x, next.y);
                    map_tag.0 != active.route.map
                        || expected.distance(transform.translation.truncate())
                            > ROUTE_DERAIL_DISTANCE
                }
                None => false,
            };
            if derailed {
                commands.entity(entity).remove::<(ActiveRoute, AwaitingPath)>();
                queue.release_for(entity);
                snap_home(&mut child, &mut map_tag, &mut transform);
                warn!(
                    "[Family] {} was moved mid-route; recovered to home",
                    child.display_name
                );
            }
        } else if child.excursion.is_in_transit() && awaiting.is_none() {
            // A path callback that never fired. Don't leave the child (or
            // the door) dangling.
            queue.release_for(entity);
            snap_home(&mut child, &mut map_tag, &mut transform);
            warn!(
                "[Family] {} was stuck in transit with no route; recovered to home",
                child.display_name
            );
        }
    }
}

/// System: the day boundary is an unconditional cancellation signal. Every
/// child is hard-teleported home (no pathing) and the exit queue is
/// emptied; per-day transit state never leaks across the boundary.
pub fn reset_excursions_on_day_end(
    mut commands: Commands,
    mut events: EventReader<DayEndEvent>,
    mut queue: ResMut<ExitQueue>,
    mut children: Query<(Entity, &mut Child, &mut ChildMapTag, &mut Transform)>,
) {
    if events.is_empty() {
        return;
    }
    events.clear();

    for (entity, mut child, mut map_tag, mut transform) in children.iter_mut() {
        commands.entity(entity).remove::<(ActiveRoute, AwaitingPath)>();
        if child.excursion != ExcursionState::Home {
            snap_home(&mut child, &mut map_tag, &mut transform);
        }
    }
    queue.clear();
}

// ─── Tests ────────────────────────────────────────────────────────────────────
