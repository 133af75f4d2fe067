//! Shared components, resources, events, and states for Willowmere.
//!
//! This is the type contract. Every domain plugin imports from here.
//! Domains never import each other directly; the world module's map and
//! pathfinding services are the one shared infrastructure layer consumed
//! alongside this contract.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ═══════════════════════════════════════════════════════════════════════
// GAME STATE — top-level state machine
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, States, Default)]
pub enum GameState {
    #[default]
    Loading,
    Playing,
    Paused,
}

// ═══════════════════════════════════════════════════════════════════════
// CALENDAR
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    pub fn next(self) -> Self {
        match self {
            Season::Spring => Season::Summer,
            Season::Summer => Season::Fall,
            Season::Fall => Season::Winter,
            Season::Winter => Season::Spring,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Season::Spring => 0,
            Season::Summer => 1,
            Season::Fall => 2,
            Season::Winter => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weather {
    Sunny,
    Rainy,
    Stormy,
    Snowy, // Winter only
}

#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct Calendar {
    pub year: u32,
    pub season: Season,
    pub day: u8,           // 1-28
    pub hour: u8,          // 6-25 (25 = 1:00 AM next day)
    pub minute: u8,        // 0-59
    pub weather: Weather,
    pub time_scale: f32,   // game-minutes per real-second (default ~10)
    pub time_paused: bool,
    pub elapsed_real_seconds: f32, // accumulator for sub-minute ticks
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            year: 1,
            season: Season::Spring,
            day: 1,
            hour: 6,
            minute: 0,
            weather: Weather::Sunny,
            time_scale: 10.0,
            time_paused: false,
            elapsed_real_seconds: 0.0,
        }
    }
}

impl Calendar {
    pub fn total_days_elapsed(&self) -> u32 {
        ((self.year - 1) * 112) + (self.season.index() as u32 * 28) + (self.day as u32 - 1)
    }

    /// Returns time as a float (e.g. 14.5 = 2:30 PM) for window lookups.
    pub fn time_float(&self) -> f32 {
        self.hour as f32 + (self.minute as f32 / 60.0)
    }

    /// Index of the current ten-minute tick since the 6:00 AM day start.
    pub fn ticks_today(&self) -> u32 {
        ((self.hour as u32).saturating_sub(6) * 60 + self.minute as u32) / 10
    }
}

// ═══════════════════════════════════════════════════════════════════════
// WORLD & MAPS
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapId {
    Farmhouse,
    Farm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    Grass,
    Dirt,
    Water,
    Sand,
    Stone,
    WoodFloor,
    Path,
    Void,
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone)]
pub struct MapTransition {
    pub from_map: MapId,
    pub from_rect: (i32, i32, i32, i32), // x, y, w, h trigger area
    pub to_map: MapId,
    pub to_pos: (i32, i32),
}

/// Converts a grid coordinate to the world-space center of that tile.
pub fn grid_to_world_center(x: i32, y: i32) -> Vec2 {
    Vec2::new(x as f32 * TILE_SIZE, -(y as f32 * TILE_SIZE))
}

/// Inverse of `grid_to_world_center`: the tile containing a world position.
pub fn world_to_grid(pos: Vec2) -> GridPosition {
    GridPosition::new(
        (pos.x / TILE_SIZE).round() as i32,
        (-pos.y / TILE_SIZE).round() as i32,
    )
}

/// A computed walking route on a single map.
#[derive(Debug, Clone, PartialEq)]
pub struct PathRoute {
    pub map: MapId,
    pub waypoints: Vec<GridPosition>,
}

// ═══════════════════════════════════════════════════════════════════════
// HOUSEHOLD — house, furniture, marriage
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FurnitureKind {
    Bed,
    Crib,
    Cradle,
    Table,
    Chair,
    Dresser,
}

impl FurnitureKind {
    /// A piece an infant can sleep in.
    pub fn is_crib_capable(self) -> bool {
        matches!(self, FurnitureKind::Crib | FurnitureKind::Cradle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FurniturePiece {
    pub kind: FurnitureKind,
    pub tile: GridPosition,
}

/// The farmhouse furniture inventory. Insertion order is meaningful: cribs
/// are claimed first-placed-first.
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct HouseFurniture {
    pub pieces: Vec<FurniturePiece>,
    /// Bumped on every add/remove; invalidates the crib cache.
    pub revision: u32,
}

impl HouseFurniture {
    pub fn add(&mut self, kind: FurnitureKind, tile: GridPosition) {
        self.pieces.push(FurniturePiece { kind, tile });
        self.revision += 1;
    }

    pub fn remove_at(&mut self, tile: GridPosition) {
        let before = self.pieces.len();
        self.pieces.retain(|p| p.tile != tile);
        if self.pieces.len() != before {
            self.revision += 1;
        }
    }

    /// Crib-capable pieces in insertion order, with their inventory index.
    pub fn crib_capable_pieces(&self) -> impl Iterator<Item = (usize, &FurniturePiece)> {
        self.pieces
            .iter()
            .enumerate()
            .filter(|(_, p)| p.kind.is_crib_capable())
    }
}

/// House upgrade facts relevant to the family domain.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct HouseState {
    /// A dedicated nursery room counts as one household-wide crib slot.
    pub has_nursery: bool,
    /// Anchor tile of the nursery (where a whole-room sleeper is placed).
    pub nursery_tile: GridPosition,
}

impl Default for HouseState {
    fn default() -> Self {
        Self {
            has_nursery: false,
            nursery_tile: GridPosition::new(10, 3),
        }
    }
}

pub type NpcId = String;

/// The farm's display name; substituted into child name templates.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct FarmName(pub String);

impl Default for FarmName {
    fn default() -> Self {
        Self("Willowmere Farm".to_string())
    }
}

/// Marriage state tracking.
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarriageState {
    pub spouse: Option<NpcId>,
    pub wedding_date: Option<(u8, u8, u32)>, // (day, season_idx, year)
    pub days_married: u32,
}

// ═══════════════════════════════════════════════════════════════════════
// CHILDREN — identity pool, actor, age bands
// ═══════════════════════════════════════════════════════════════════════

pub type ChildId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

/// Age bands in increasing order. `Toddler` is the independent band: the
/// excursion scheduler takes over movement from the crib.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgeBand {
    Newborn,
    Infant,
    Crawler,
    Toddler,
}

impl AgeBand {
    pub fn from_days(days_old: u16) -> Self {
        if days_old < NEWBORN_MAX_DAYS {
            AgeBand::Newborn
        } else if days_old < INFANT_MAX_DAYS {
            AgeBand::Infant
        } else if days_old < CRAWLER_MAX_DAYS {
            AgeBand::Crawler
        } else {
            AgeBand::Toddler
        }
    }

    pub fn is_independent(self) -> bool {
        matches!(self, AgeBand::Toddler)
    }
}

/// One entry in the identity pool. Immutable between registry reloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildDefinition {
    pub id: ChildId,
    /// Display name; a literal `{farm}` token is replaced with the farm name.
    pub name_template: String,
    pub gender: Gender,
    pub dark_skinned: bool,
    pub enabled_by_default: bool,
}

impl ChildDefinition {
    pub fn rendered_name(&self, farm_name: &str) -> String {
        self.name_template.replace("{farm}", farm_name)
    }
}

/// The candidate pool. `ordered_ids` preserves registration order so that
/// candidate iteration (and the seeded daily pick) is deterministic.
#[derive(Resource, Debug, Clone, Default)]
pub struct ChildRegistry {
    pub defs: HashMap<ChildId, ChildDefinition>,
    pub ordered_ids: Vec<ChildId>,
}

impl ChildRegistry {
    pub fn register(&mut self, def: ChildDefinition) {
        if !self.defs.contains_key(&def.id) {
            self.ordered_ids.push(def.id.clone());
        }
        self.defs.insert(def.id.clone(), def);
    }

    pub fn get(&self, id: &str) -> Option<&ChildDefinition> {
        self.defs.get(id)
    }
}

/// Per-identity enabled/disabled overrides loaded from config. A missing
/// entry falls back to the definition's `enabled_by_default`.
#[derive(Resource, Debug, Clone, Default)]
pub struct IdentityOverrides(pub HashMap<ChildId, bool>);

// ═══════════════════════════════════════════════════════════════════════
// CRIBS
// ═══════════════════════════════════════════════════════════════════════

/// Where a small child sleeps. The nursery whole-room slot pre-empts
/// per-furniture cribs and is exclusive to one child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CribAssignment {
    WholeRoom { tile: GridPosition },
    Furniture { index: usize, tile: GridPosition },
}

impl CribAssignment {
    pub fn tile(&self) -> GridPosition {
        match self {
            CribAssignment::WholeRoom { tile } => *tile,
            CribAssignment::Furniture { tile, .. } => *tile,
        }
    }
}

/// Invalidation token for the crib claim cache. Persisted across save/load
/// so a reloaded day does not re-shuffle assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CribCacheToken {
    pub day_index: u32,
    pub furniture_revision: u32,
}

/// Claim set owned exclusively by the crib allocator. Rebuilt (never
/// incrementally patched) whenever the token goes stale.
#[derive(Resource, Debug, Clone, Default)]
pub struct CribCache {
    pub token: CribCacheToken,
    pub whole_room: Option<Entity>,
    pub furniture_claims: HashMap<usize, Entity>,
}

impl CribCache {
    pub fn clear_claims(&mut self) {
        self.whole_room = None;
        self.furniture_claims.clear();
    }
}

// ═══════════════════════════════════════════════════════════════════════
// EXCURSIONS
// ═══════════════════════════════════════════════════════════════════════

/// Per-toddler outing state. Reset to `Home` at every day boundary and on
/// load; only same-day transit is ever represented.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ExcursionState {
    #[default]
    Home,
    QueuedToLeave,
    EnRouteOutside,
    Outside {
        /// Hour (time_float) at which the child heads back.
        return_at: f32,
    },
    EnRouteHome,
}

impl ExcursionState {
    /// Whether moving from `self` to `next` follows a defined edge.
    /// `Home → Outside` is the instantaneous-relocation fast path; every
    /// other pair must walk the cycle.
    pub fn may_transition_to(&self, next: &ExcursionState) -> bool {
        use ExcursionState::*;
        matches!(
            (self, next),
            (Home, QueuedToLeave)
                | (QueuedToLeave, Home)
                | (QueuedToLeave, EnRouteOutside)
                | (EnRouteOutside, Home)
                | (EnRouteOutside, Outside { .. })
                | (Outside { .. }, EnRouteHome)
                | (Outside { .. }, Home)
                | (EnRouteHome, Home)
                | (Home, Outside { .. })
        )
    }

    pub fn is_in_transit(&self) -> bool {
        matches!(
            self,
            ExcursionState::QueuedToLeave
                | ExcursionState::EnRouteOutside
                | ExcursionState::EnRouteHome
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitQueueEntry {
    pub child: Entity,
    pub exit: GridPosition,
    pub queued_at_tick: u32,
}

/// The household's single-slot doorway reservation. One child transits the
/// shared door at a time; the `Option` makes a second simultaneous entry
/// unrepresentable.
#[derive(Resource, Debug, Clone, Default)]
pub struct ExitQueue(pub Option<ExitQueueEntry>);

impl ExitQueue {
    pub fn try_reserve(&mut self, child: Entity, exit: GridPosition, tick: u32) -> bool {
        if self.0.is_some() {
            return false;
        }
        self.0 = Some(ExitQueueEntry {
            child,
            exit,
            queued_at_tick: tick,
        });
        true
    }

    pub fn holder(&self) -> Option<Entity> {
        self.0.map(|e| e.child)
    }

    /// Releases the slot only if `child` holds it.
    pub fn release_for(&mut self, child: Entity) {
        if self.holder() == Some(child) {
            self.0 = None;
        }
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }
}

// ═══════════════════════════════════════════════════════════════════════
// CHILD ACTOR & FAMILY STATE
// ═══════════════════════════════════════════════════════════════════════

/// An in-world child. Owns its crib assignment and excursion state directly.
#[derive(Component, Debug, Clone)]
pub struct Child {
    /// None for the generic fallback child (pool was exhausted at birth).
    pub identity_id: Option<ChildId>,
    pub display_name: String,
    pub gender: Gender,
    pub dark_skinned: bool,
    pub age_band: AgeBand,
    pub days_old: u16,
    pub parent_id: NpcId,
    pub crib: Option<CribAssignment>,
    pub excursion: ExcursionState,
}

/// Persisted snapshot of one child. Excursion and crib state are transient
/// and deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildRecord {
    pub identity_id: Option<ChildId>,
    pub display_name: String,
    pub gender: Gender,
    pub dark_skinned: bool,
    pub days_old: u16,
    pub parent_id: NpcId,
}

impl ChildRecord {
    pub fn age_band(&self) -> AgeBand {
        AgeBand::from_days(self.days_old)
    }
}

/// Household family state: the persisted roster mirror plus selection
/// bookkeeping. The entity components are authoritative while playing; the
/// roster is refreshed from them whenever a persisted field changes (births
/// and the day-end aging pass).
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct FamilyState {
    pub children: Vec<ChildRecord>,
    /// Forced "next identity" pending per requesting parent.
    pub pending_identity: HashMap<NpcId, ChildId>,
    /// Seed for reproducible daily identity picks.
    pub world_seed: u64,
    /// Days until the expected child arrives, if a birth is pending.
    pub days_until_birth: Option<u8>,
}

impl Default for FamilyState {
    fn default() -> Self {
        Self {
            children: Vec::new(),
            pending_identity: HashMap::new(),
            world_seed: 0x5EED_F00D,
            days_until_birth: None,
        }
    }
}

impl FamilyState {
    /// Identity ids currently held by living children.
    pub fn identities_in_use(&self) -> HashSet<ChildId> {
        self.children
            .iter()
            .filter_map(|c| c.identity_id.clone())
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// FAMILY TUNING — loaded from RON config, falls back to these defaults
// ═══════════════════════════════════════════════════════════════════════

#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct FamilyConfig {
    /// Chance an eligible toddler skips the outing roll on a given tick.
    pub outing_skip_chance: f32,
    pub outing_earliest_hour: f32,
    pub outing_latest_hour: f32,
    pub outing_duration_hours: f32,
    /// Crawlers reposition in their crib after this hour.
    pub wake_hour: f32,
    /// Randomized probes when hunting a standable tile near a point.
    pub standable_search_attempts: u32,
    pub standable_search_radius: i32,
    pub pregnancy_days: u8,
    pub daily_birth_chance: f32,
    pub max_children: usize,
}

impl Default for FamilyConfig {
    fn default() -> Self {
        Self {
            outing_skip_chance: 0.5,
            outing_earliest_hour: 10.0,
            outing_latest_hour: 16.0,
            outing_duration_hours: 3.0,
            wake_hour: 14.0,
            standable_search_attempts: 20,
            standable_search_radius: 6,
            pregnancy_days: 14,
            daily_birth_chance: 0.05,
            max_children: 2,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// EVENTS — cross-domain communication
// ═══════════════════════════════════════════════════════════════════════

#[derive(Event, Debug, Clone)]
pub struct TenMinuteTickEvent {
    pub hour: u8,
    pub minute: u8,
    /// Tick index since the 6:00 AM day start.
    pub tick_index: u32,
}

#[derive(Event, Debug, Clone)]
pub struct DayEndEvent {
    pub day: u8,
    pub season: Season,
    pub year: u32,
}

#[derive(Event, Debug, Clone)]
pub struct DayStartedEvent {
    pub day: u8,
    pub season: Season,
    pub year: u32,
}

#[derive(Event, Debug, Clone)]
pub struct SeasonChangeEvent {
    pub new_season: Season,
    pub year: u32,
}

/// The pregnancy countdown hit zero; the delivery system takes it from here.
#[derive(Event, Debug, Clone)]
pub struct BirthDueEvent;

/// Announces a completed birth with the chosen name and identity.
#[derive(Event, Debug, Clone)]
pub struct ChildBornEvent {
    pub display_name: String,
    pub gender: Gender,
    pub identity_id: Option<ChildId>,
}

/// Ask the scheduler to bring a child home early.
#[derive(Event, Debug, Clone)]
pub struct RecallChildEvent {
    pub child: Entity,
}

/// Furniture added/removed; the crib cache must be rebuilt.
#[derive(Event, Debug, Clone)]
pub struct FurnitureChangedEvent;

/// A queued path request was resolved (possibly on a later frame than the
/// request). `route: None` means the target was unreachable.
#[derive(Event, Debug, Clone)]
pub struct PathComputedEvent {
    pub request_id: u32,
    pub child: Entity,
    pub route: Option<PathRoute>,
}

/// A child finished walking its active route.
#[derive(Event, Debug, Clone)]
pub struct RouteArrivalEvent {
    pub child: Entity,
}

/// Save/load or new-game replaced the household wholesale; entity mirrors
/// must be rebuilt from `FamilyState`.
#[derive(Event, Debug, Clone)]
pub struct HouseholdReloadedEvent;

// ═══════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════

pub const TILE_SIZE: f32 = 16.0;
pub const PIXEL_SCALE: f32 = 3.0; // render scale (16px × 3 = 48px on screen)
pub const SCREEN_WIDTH: f32 = 960.0;
pub const SCREEN_HEIGHT: f32 = 540.0;

pub const DAYS_PER_SEASON: u8 = 28;

pub const Z_ENTITY_BASE: f32 = 10.0;

/// Age-band thresholds in days.
pub const NEWBORN_MAX_DAYS: u16 = 7;
pub const INFANT_MAX_DAYS: u16 = 14;
pub const CRAWLER_MAX_DAYS: u16 = 28;

pub const CHILD_WALK_SPEED: f32 = 30.0;

/// Default indoor arrival tile when no crib informs the return leg.
pub const DEFAULT_REST_TILE: GridPosition = GridPosition { x: 4, y: 4 };

/// A child further than this from its next waypoint was moved by someone
/// else; the route is considered interrupted.
pub const ROUTE_DERAIL_DISTANCE: f32 = TILE_SIZE * 4.0;
