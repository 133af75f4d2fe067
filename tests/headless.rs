//! Headless integration tests for Willowmere.
//!
//! These tests exercise the game's ECS logic without a window or GPU.
//! They use Bevy's `MinimalPlugins` to tick the app, register the world and
//! family plugins (skipping all rendering), and drive the excursion state
//! machine through events the way the calendar and path services would.
//!
//! Run with: `cargo test --test headless`

use bevy::prelude::*;
use bevy::state::app::StatesPlugin;

use willowmere::calendar::CalendarPlugin;
use willowmere::data::DataPlugin;
use willowmere::family::excursion::{ActiveRoute, ChildMapTag};
use willowmere::family::FamilyPlugin;
use willowmere::shared::*;
use willowmere::world::maps::MapDef;
use willowmere::world::pathfinding::{PathPlanner, Pathfinder};
use willowmere::world::WorldPlugin;

// ─────────────────────────────────────────────────────────────────────────────
// Test App Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Builds a minimal Bevy app with all shared resources and events registered
/// but NO rendering, windowing, or asset loading.
fn build_test_app() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.add_plugins(StatesPlugin);

    // ── Game State ───────────────────────────────────────────────────────
    app.init_state::<GameState>();

    // ── Shared Resources (mirrors main.rs) ───────────────────────────────
    app.init_resource::<Calendar>()
        .init_resource::<FarmName>()
        .init_resource::<HouseState>()
        .init_resource::<HouseFurniture>()
        .init_resource::<MarriageState>()
        .init_resource::<ChildRegistry>()
        .init_resource::<IdentityOverrides>()
        .init_resource::<FamilyConfig>()
        .init_resource::<FamilyState>()
        .init_resource::<CribCache>()
        .init_resource::<ExitQueue>();

    // ── Shared Events (mirrors main.rs) ──────────────────────────────────
    app.add_event::<TenMinuteTickEvent>()
        .add_event::<DayEndEvent>()
        .add_event::<DayStartedEvent>()
        .add_event::<SeasonChangeEvent>()
        .add_event::<BirthDueEvent>()
        .add_event::<ChildBornEvent>()
        .add_event::<RecallChildEvent>()
        .add_event::<FurnitureChangedEvent>()
        .add_event::<PathComputedEvent>()
        .add_event::<RouteArrivalEvent>()
        .add_event::<HouseholdReloadedEvent>();

    // ── Domain plugins under test ────────────────────────────────────────
    app.add_plugins(CalendarPlugin);
    app.add_plugins(WorldPlugin);
    app.add_plugins(FamilyPlugin);

    app
}

/// Transitions the test app to Playing state and ticks once to process it.
fn enter_playing_state(app: &mut App) {
    app.world_mut()
        .resource_mut::<NextState<GameState>>()
        .set(GameState::Playing);
    app.update(); // process state transition
}

/// Seeds a married household with a nursery, two cribs, and the given child
/// records, then enters Playing (spawning their entities).
fn seed_household(app: &mut App, children: Vec<ChildRecord>) {
    let world = app.world_mut();
    world.resource_mut::<MarriageState>().spouse = Some("elena".to_string());
    {
        let mut house = world.resource_mut::<HouseState>();
        house.has_nursery = true;
        house.nursery_tile = GridPosition::new(10, 2);
    }
    {
        let mut furniture = world.resource_mut::<HouseFurniture>();
        furniture.add(FurnitureKind::Crib, GridPosition::new(11, 2));
        furniture.add(FurnitureKind::Cradle, GridPosition::new(12, 2));
    }
    world.resource_mut::<FamilyState>().children = children;
    world.resource_mut::<FamilyConfig>().outing_skip_chance = 0.0;
    enter_playing_state(app);

    // Deterministic eligibility: noon, sunny, never skip the roll. Pausing
    // happens after the Playing transition (which unpauses) so wall-clock
    // frame time can never advance the calendar under a slow test runner;
    // ticks and day boundaries are driven by explicit events instead.
    let mut calendar = app.world_mut().resource_mut::<Calendar>();
    calendar.hour = 12;
    calendar.minute = 0;
    calendar.weather = Weather::Sunny;
    calendar.time_paused = true;
}

fn toddler_record(identity: &str, name: &str) -> ChildRecord {
    ChildRecord {
        identity_id: Some(identity.to_string()),
        display_name: name.to_string(),
        gender: Gender::Female,
        dark_skinned: false,
        days_old: 30,
        parent_id: "elena".to_string(),
    }
}

fn infant_record(identity: &str, name: &str) -> ChildRecord {
    ChildRecord {
        identity_id: Some(identity.to_string()),
        display_name: name.to_string(),
        gender: Gender::Male,
        dark_skinned: false,
        days_old: 3,
        parent_id: "elena".to_string(),
    }
}

fn send_tick(app: &mut App) {
    let (hour, minute, tick_index) = {
        let calendar = app.world().resource::<Calendar>();
        (calendar.hour, calendar.minute, calendar.ticks_today())
    };
    app.world_mut().send_event(TenMinuteTickEvent {
        hour,
        minute,
        tick_index,
    });
}

fn settle(app: &mut App, frames: usize) {
    for _ in 0..frames {
        app.update();
    }
}

fn child_entities(app: &mut App) -> Vec<Entity> {
    app.world_mut()
        .query::<(Entity, &Child)>()
        .iter(app.world())
        .map(|(e, _)| e)
        .collect()
}

fn child_state(app: &mut App, entity: Entity) -> ExcursionState {
    app.world().entity(entity).get::<Child>().unwrap().excursion
}

/// Simulates the path-control layer finishing a route: the route component
/// is handed back and the arrival signal fires.
fn complete_route(app: &mut App, entity: Entity) {
    app.world_mut().entity_mut(entity).remove::<ActiveRoute>();
    app.world_mut().send_event(RouteArrivalEvent { child: entity });
    settle(app, 2);
}

/// A planner that never finds a path, for failure-handling tests.
struct UnreachablePlanner;

impl PathPlanner for UnreachablePlanner {
    fn plan(
        &self,
        _map: &MapDef,
        _from: GridPosition,
        _to: GridPosition,
    ) -> Option<Vec<GridPosition>> {
        None
    }
}

/// Drives one child from Home to EnRouteOutside: tick, path request,
/// resolution, and result handling.
fn drive_to_en_route_outside(app: &mut App, entity: Entity) {
    send_tick(app);
    settle(app, 4);
    assert_eq!(
        child_state(app, entity),
        ExcursionState::EnRouteOutside,
        "child should be walking to the door"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Boot & seeding
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_headless_boot_reaches_playing_with_demo_household() {
    let mut app = build_test_app();
    app.add_plugins(DataPlugin);

    // First update runs Loading; second applies NextState.
    app.update();
    app.update();

    let state = app.world().resource::<State<GameState>>();
    assert_eq!(
        state.get(),
        &GameState::Playing,
        "Expected to reach Playing after loading data"
    );

    assert!(
        app.world().resource::<MarriageState>().spouse.is_some(),
        "Demo household should be married"
    );
    let ids = app.world().resource::<ChildRegistry>().ordered_ids.len();
    assert!(ids > 0, "Child registry should be populated during boot");

    app.update();
    let children = child_entities(&mut app);
    assert_eq!(children.len(), 2, "Demo household spawns two children");
}

#[test]
fn test_children_spawn_at_home_with_no_transit_state() {
    let mut app = build_test_app();
    seed_household(
        &mut app,
        vec![toddler_record("violet", "Violet"), infant_record("kofi", "Kofi")],
    );
    app.update();

    for entity in child_entities(&mut app) {
        assert_eq!(child_state(&mut app, entity), ExcursionState::Home);
        let tag = app.world().entity(entity).get::<ChildMapTag>().unwrap();
        assert_eq!(tag.0, MapId::Farmhouse);
    }
    assert!(app.world().resource::<ExitQueue>().holder().is_none());
}

// ─────────────────────────────────────────────────────────────────────────────
// Cribs
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_infant_takes_whole_room_slot_over_furniture_cribs() {
    let mut app = build_test_app();
    seed_household(&mut app, vec![infant_record("kofi", "Kofi")]);
    settle(&mut app, 2);

    let entity = child_entities(&mut app)[0];
    let child = app.world().entity(entity).get::<Child>().unwrap();
    assert!(
        matches!(child.crib, Some(CribAssignment::WholeRoom { .. })),
        "nursery slot must pre-empt the two furniture cribs, got {:?}",
        child.crib
    );
}

#[test]
fn test_second_infant_falls_back_to_furniture_crib() {
    let mut app = build_test_app();
    seed_household(
        &mut app,
        vec![infant_record("kofi", "Kofi"), infant_record("rowan", "Rowan")],
    );
    settle(&mut app, 2);

    let mut whole_room = 0;
    let mut furniture = 0;
    for entity in child_entities(&mut app) {
        match app.world().entity(entity).get::<Child>().unwrap().crib {
            Some(CribAssignment::WholeRoom { .. }) => whole_room += 1,
            Some(CribAssignment::Furniture { .. }) => furniture += 1,
            None => {}
        }
    }
    assert_eq!(whole_room, 1, "exactly one child holds the nursery");
    assert_eq!(furniture, 1, "the other sleeps in a furniture crib");
}

#[test]
fn test_furniture_change_reassigns_cribs() {
    let mut app = build_test_app();
    seed_household(&mut app, vec![infant_record("kofi", "Kofi")]);
    settle(&mut app, 2);

    let entity = child_entities(&mut app)[0];
    assert!(app.world().entity(entity).get::<Child>().unwrap().crib.is_some());

    // Tear the nursery out and remove the cribs.
    app.world_mut().resource_mut::<HouseState>().has_nursery = false;
    {
        let mut furniture = app.world_mut().resource_mut::<HouseFurniture>();
        furniture.remove_at(GridPosition::new(11, 2));
        furniture.remove_at(GridPosition::new(12, 2));
    }
    app.world_mut().send_event(FurnitureChangedEvent);
    settle(&mut app, 2);

    let child = app.world().entity(entity).get::<Child>().unwrap();
    assert_eq!(
        child.crib, None,
        "no crib remains after the furniture change; floor fallback applies"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Excursions
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_exit_queue_admits_one_child_per_tick() {
    // Scenario: two toddlers become eligible on the same tick. Exactly one
    // queues; the other stays Home and is re-evaluated later.
    let mut app = build_test_app();
    seed_household(
        &mut app,
        vec![
            toddler_record("violet", "Violet"),
            toddler_record("hazel", "Hazel"),
        ],
    );
    app.update();

    send_tick(&mut app);
    app.update();

    let children = child_entities(&mut app);
    let states: Vec<ExcursionState> = children
        .iter()
        .map(|&e| child_state(&mut app, e))
        .collect();

    let departing = states
        .iter()
        .filter(|s| {
            matches!(
                s,
                ExcursionState::QueuedToLeave | ExcursionState::EnRouteOutside
            )
        })
        .count();
    let home = states
        .iter()
        .filter(|s| **s == ExcursionState::Home)
        .count();
    assert_eq!(departing, 1, "exactly one child may claim the door per tick");
    assert_eq!(home, 1, "the other waits at home");
    assert!(app.world().resource::<ExitQueue>().holder().is_some());

    // While the door is held, the next tick does not admit the second child.
    send_tick(&mut app);
    app.update();
    let still_home = children
        .iter()
        .filter(|&&e| child_state(&mut app, e) == ExcursionState::Home)
        .count();
    assert_eq!(still_home, 1);
}

#[test]
fn test_queue_never_holds_more_than_one_across_many_ticks() {
    let mut app = build_test_app();
    seed_household(
        &mut app,
        vec![
            toddler_record("violet", "Violet"),
            toddler_record("hazel", "Hazel"),
            toddler_record("amara", "Amara"),
        ],
    );
    app.update();
    app.world_mut()
        .resource_mut::<FamilyConfig>()
        .outing_skip_chance = 0.3;

    for _ in 0..30 {
        send_tick(&mut app);
        app.update();

        // The single-slot queue cannot hold two, and no two children may be
        // transiting the door simultaneously.
        let transiting = child_entities(&mut app)
            .iter()
            .filter(|&&e| {
                matches!(
                    child_state(&mut app, e),
                    ExcursionState::QueuedToLeave | ExcursionState::EnRouteOutside
                )
            })
            .count();
        assert!(transiting <= 1, "door serialization violated");
    }
}

#[test]
fn test_infants_never_queue_for_the_door() {
    let mut app = build_test_app();
    seed_household(&mut app, vec![infant_record("kofi", "Kofi")]);
    app.update();

    for _ in 0..10 {
        send_tick(&mut app);
        app.update();
    }
    let entity = child_entities(&mut app)[0];
    assert_eq!(child_state(&mut app, entity), ExcursionState::Home);
}

#[test]
fn test_rain_keeps_children_indoors() {
    let mut app = build_test_app();
    seed_household(&mut app, vec![toddler_record("violet", "Violet")]);
    app.world_mut().resource_mut::<Calendar>().weather = Weather::Rainy;
    app.update();

    for _ in 0..10 {
        send_tick(&mut app);
        app.update();
    }
    let entity = child_entities(&mut app)[0];
    assert_eq!(child_state(&mut app, entity), ExcursionState::Home);
}

#[test]
fn test_path_failure_demotes_to_home_and_releases_queue() {
    let mut app = build_test_app();
    seed_household(&mut app, vec![toddler_record("violet", "Violet")]);
    app.update();
    *app.world_mut().resource_mut::<Pathfinder>() =
        Pathfinder::with_planner(Box::new(UnreachablePlanner));

    send_tick(&mut app);
    settle(&mut app, 4);

    let entity = child_entities(&mut app)[0];
    assert_eq!(
        child_state(&mut app, entity),
        ExcursionState::Home,
        "unreachable exit must demote the child to Home"
    );
    assert!(
        app.world().resource::<ExitQueue>().holder().is_none(),
        "the queue entry must be released on failure"
    );
}

#[test]
fn test_full_outing_reaches_outside_and_frees_the_door() {
    let mut app = build_test_app();
    seed_household(&mut app, vec![toddler_record("violet", "Violet")]);
    app.update();

    let entity = child_entities(&mut app)[0];
    drive_to_en_route_outside(&mut app, entity);
    complete_route(&mut app, entity);

    assert!(matches!(
        child_state(&mut app, entity),
        ExcursionState::Outside { .. }
    ));
    let tag = app.world().entity(entity).get::<ChildMapTag>().unwrap();
    assert_eq!(tag.0, MapId::Farm, "outdoor representation active");
    assert!(
        app.world().resource::<ExitQueue>().holder().is_none(),
        "arrival at the exit releases the door"
    );
}

#[test]
fn test_midtransit_relocation_recovers_to_home() {
    // Scenario: a child EnRouteOutside is forcibly relocated by an external
    // system. The next tick finds it Home with the queue released.
    let mut app = build_test_app();
    seed_household(&mut app, vec![toddler_record("violet", "Violet")]);
    app.update();

    let entity = child_entities(&mut app)[0];
    drive_to_en_route_outside(&mut app, entity);

    // Yank the actor far off its route.
    {
        let mut e = app.world_mut().entity_mut(entity);
        let mut transform = e.get_mut::<Transform>().unwrap();
        transform.translation.x += 500.0;
        transform.translation.y -= 500.0;
    }

    send_tick(&mut app);
    settle(&mut app, 2);

    assert_eq!(
        child_state(&mut app, entity),
        ExcursionState::Home,
        "relocated child must be recovered, not stuck EnRouteOutside"
    );
    assert!(app.world().resource::<ExitQueue>().holder().is_none());
    let tag = app.world().entity(entity).get::<ChildMapTag>().unwrap();
    assert_eq!(tag.0, MapId::Farmhouse);
}

#[test]
fn test_recall_brings_an_outside_child_home() {
    let mut app = build_test_app();
    seed_household(&mut app, vec![toddler_record("violet", "Violet")]);
    app.update();

    let entity = child_entities(&mut app)[0];
    drive_to_en_route_outside(&mut app, entity);
    complete_route(&mut app, entity);
    assert!(matches!(
        child_state(&mut app, entity),
        ExcursionState::Outside { .. }
    ));

    app.world_mut().send_event(RecallChildEvent { child: entity });
    settle(&mut app, 4);
    assert_eq!(child_state(&mut app, entity), ExcursionState::EnRouteHome);

    // Outdoor leg back to the door…
    complete_route(&mut app, entity);
    let tag = app.world().entity(entity).get::<ChildMapTag>().unwrap();
    assert_eq!(tag.0, MapId::Farmhouse, "stepped back inside at the door");
    settle(&mut app, 3);

    // …then the indoor leg to the resting spot.
    complete_route(&mut app, entity);
    assert_eq!(child_state(&mut app, entity), ExcursionState::Home);
}

#[test]
fn test_day_end_hard_resets_everyone_home() {
    let mut app = build_test_app();
    seed_household(
        &mut app,
        vec![
            toddler_record("violet", "Violet"),
            toddler_record("hazel", "Hazel"),
        ],
    );
    app.update();

    // Put one child outside.
    let children = child_entities(&mut app);
    let outside = children
        .iter()
        .copied()
        .find(|&e| {
            send_tick(&mut app);
            settle(&mut app, 4);
            child_state(&mut app, e) == ExcursionState::EnRouteOutside
        })
        .expect("one child should be en route");
    complete_route(&mut app, outside);
    assert!(matches!(
        child_state(&mut app, outside),
        ExcursionState::Outside { .. }
    ));

    // Day boundary: unconditional cancellation.
    let (day, season, year) = {
        let c = app.world().resource::<Calendar>();
        (c.day, c.season, c.year)
    };
    app.world_mut().send_event(DayEndEvent { day, season, year });
    settle(&mut app, 2);

    for entity in child_entities(&mut app) {
        assert_eq!(
            child_state(&mut app, entity),
            ExcursionState::Home,
            "per-day transit state must not leak across the boundary"
        );
        let tag = app.world().entity(entity).get::<ChildMapTag>().unwrap();
        assert_eq!(tag.0, MapId::Farmhouse);
    }
    assert!(app.world().resource::<ExitQueue>().holder().is_none());
}

#[test]
fn test_round_trip_preserves_identity_and_age() {
    let mut app = build_test_app();
    seed_household(&mut app, vec![toddler_record("violet", "Violet")]);
    app.update();

    let entity = child_entities(&mut app)[0];
    let before = app.world().entity(entity).get::<Child>().unwrap().clone();

    // Out…
    drive_to_en_route_outside(&mut app, entity);
    complete_route(&mut app, entity);

    // …stay past the scheduled return…
    app.world_mut().resource_mut::<Calendar>().hour = 20;
    send_tick(&mut app);
    settle(&mut app, 4);
    assert_eq!(child_state(&mut app, entity), ExcursionState::EnRouteHome);

    // …walk both return legs home.
    complete_route(&mut app, entity);
    settle(&mut app, 3);
    complete_route(&mut app, entity);
    assert_eq!(child_state(&mut app, entity), ExcursionState::Home);

    let after = app.world().entity(entity).get::<Child>().unwrap();
    assert_eq!(after.identity_id, before.identity_id);
    assert_eq!(after.display_name, before.display_name);
    assert_eq!(after.age_band, before.age_band);
    assert_eq!(after.days_old, before.days_old, "no day boundary crossed");
}

// ─────────────────────────────────────────────────────────────────────────────
// Day boundary & persistence behavior
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_external_day_end_advances_calendar_and_ages_children() {
    let mut app = build_test_app();
    seed_household(&mut app, vec![infant_record("kofi", "Kofi")]);
    app.update();

    let entity = child_entities(&mut app)[0];
    let days_before = app.world().entity(entity).get::<Child>().unwrap().days_old;
    let day_before = app.world().resource::<Calendar>().day;

    let (day, season, year) = {
        let c = app.world().resource::<Calendar>();
        (c.day, c.season, c.year)
    };
    app.world_mut().send_event(DayEndEvent { day, season, year });
    settle(&mut app, 2);

    assert_eq!(app.world().resource::<Calendar>().day, day_before + 1);
    let child = app.world().entity(entity).get::<Child>().unwrap();
    assert_eq!(child.days_old, days_before + 1);

    // The roster mirrors the new age for the next save.
    let family = app.world().resource::<FamilyState>();
    assert_eq!(family.children[0].days_old, days_before + 1);
}

#[test]
fn test_child_crossing_toddler_threshold_becomes_eligible() {
    let mut app = build_test_app();
    let mut record = infant_record("kofi", "Kofi");
    record.days_old = CRAWLER_MAX_DAYS - 1;
    seed_household(&mut app, vec![record]);
    app.update();

    let entity = child_entities(&mut app)[0];
    assert_eq!(
        app.world().entity(entity).get::<Child>().unwrap().age_band,
        AgeBand::Crawler
    );

    let (day, season, year) = {
        let c = app.world().resource::<Calendar>();
        (c.day, c.season, c.year)
    };
    app.world_mut().send_event(DayEndEvent { day, season, year });
    settle(&mut app, 2);

    assert_eq!(
        app.world().entity(entity).get::<Child>().unwrap().age_band,
        AgeBand::Toddler
    );

    // Day-end advanced the clock to morning; move to the outing window.
    {
        let mut calendar = app.world_mut().resource_mut::<Calendar>();
        calendar.hour = 12;
        calendar.weather = Weather::Sunny;
    }
    send_tick(&mut app);
    app.update();
    assert_ne!(
        child_state(&mut app, entity),
        ExcursionState::Home,
        "a fresh toddler joins the excursion roster"
    );
}

#[test]
fn test_household_reload_resets_all_transit_state() {
    let mut app = build_test_app();
    seed_household(&mut app, vec![toddler_record("violet", "Violet")]);
    app.update();

    let entity = child_entities(&mut app)[0];
    drive_to_en_route_outside(&mut app, entity);
    assert!(app.world().resource::<ExitQueue>().holder().is_some());

    // A load replaces the household wholesale.
    app.world_mut().send_event(HouseholdReloadedEvent);
    settle(&mut app, 2);

    let children = child_entities(&mut app);
    assert_eq!(children.len(), 1, "roster respawned");
    assert_ne!(children[0], entity, "old entity was despawned");
    assert_eq!(child_state(&mut app, children[0]), ExcursionState::Home);
    assert!(
        app.world().resource::<ExitQueue>().holder().is_none(),
        "exit queue is never persisted"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Births
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_birth_due_delivers_a_named_child() {
    let mut app = build_test_app();
    seed_household(&mut app, vec![]);
    app.update();

    app.world_mut().resource_mut::<FamilyState>().days_until_birth = Some(1);
    let (day, season, year) = {
        let c = app.world().resource::<Calendar>();
        (c.day, c.season, c.year)
    };
    app.world_mut().send_event(DayEndEvent { day, season, year });
    settle(&mut app, 3);

    let children = child_entities(&mut app);
    assert_eq!(children.len(), 1, "the due child arrived");
    let child = app.world().entity(children[0]).get::<Child>().unwrap();
    assert!(child.identity_id.is_some(), "pool had identities to give");
    assert_eq!(child.age_band, AgeBand::Newborn);
    assert_eq!(child.excursion, ExcursionState::Home);

    let family = app.world().resource::<FamilyState>();
    assert_eq!(family.children.len(), 1);
    assert_eq!(family.days_until_birth, None);
}

#[test]
fn test_forced_identity_is_consumed_at_birth() {
    let mut app = build_test_app();
    seed_household(&mut app, vec![]);
    app.update();

    {
        let mut family = app.world_mut().resource_mut::<FamilyState>();
        family.days_until_birth = Some(1);
        family
            .pending_identity
            .insert("elena".to_string(), "hazel".to_string());
    }
    let (day, season, year) = {
        let c = app.world().resource::<Calendar>();
        (c.day, c.season, c.year)
    };
    app.world_mut().send_event(DayEndEvent { day, season, year });
    settle(&mut app, 3);

    let children = child_entities(&mut app);
    let child = app.world().entity(children[0]).get::<Child>().unwrap();
    assert_eq!(child.identity_id.as_deref(), Some("hazel"));

    let family = app.world().resource::<FamilyState>();
    assert!(
        !family.pending_identity.contains_key("elena"),
        "the pending flag is cleared once the forced identity is used"
    );
}

#[test]
fn test_exhausted_pool_falls_back_to_generic_child() {
    let mut app = build_test_app();
    seed_household(&mut app, vec![]);
    app.update();

    {
        let world = app.world_mut();
        let all_ids = world.resource::<ChildRegistry>().ordered_ids.clone();
        let mut family = world.resource_mut::<FamilyState>();
        family.days_until_birth = Some(1);
        // Occupy every identity so the pick comes back empty.
        family.children = all_ids
            .iter()
            .map(|id| ChildRecord {
                identity_id: Some(id.clone()),
                display_name: id.clone(),
                gender: Gender::Female,
                dark_skinned: false,
                days_old: 40,
                parent_id: "elena".to_string(),
            })
            .collect();
        family.pending_identity.clear();
    }
    // Spawn entity mirrors for the occupying roster.
    app.world_mut().send_event(HouseholdReloadedEvent);
    settle(&mut app, 2);
    let occupying = child_entities(&mut app).len();

    let (day, season, year) = {
        let c = app.world().resource::<Calendar>();
        (c.day, c.season, c.year)
    };
    app.world_mut().send_event(DayEndEvent { day, season, year });
    settle(&mut app, 3);

    let children = child_entities(&mut app);
    assert_eq!(children.len(), occupying + 1, "a child still arrives");
    let newborn = children
        .iter()
        .map(|&e| app.world().entity(e).get::<Child>().unwrap())
        .find(|c| c.days_old == 0)
        .expect("the newborn is present");
    assert_eq!(newborn.identity_id, None, "generic fallback child");
    assert_eq!(newborn.display_name, "Baby");
}
