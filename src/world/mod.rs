//! World domain: map data, tile queries, and the pathfinding service.
//!
//! The rest of the game treats pathfinding as a black box: submit a request
//! to the `Pathfinder` resource, receive a `PathComputedEvent` on a later
//! frame. The search itself lives behind the `PathPlanner` trait so tests
//! can substitute planners that fail on demand.

pub mod maps;
pub mod pathfinding;

use bevy::prelude::*;
use rand::Rng;
use std::collections::HashMap;

use crate::shared::*;
use maps::{generate_map, MapDef};
use pathfinding::resolve_path_requests;

pub struct WorldPlugin;

impl Plugin for WorldPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WorldMaps>()
            .init_resource::<pathfinding::Pathfinder>()
            // Resolve queued path requests once per frame while Playing
            .add_systems(
                Update,
                resolve_path_requests.run_if(in_state(GameState::Playing)),
            );
    }
}

/// All generated maps, keyed by id.
#[derive(Resource, Debug, Clone)]
pub struct WorldMaps {
    pub maps: HashMap<MapId, MapDef>,
}

impl Default for WorldMaps {
    fn default() -> Self {
        let mut maps = HashMap::new();
        for id in [MapId::Farmhouse, MapId::Farm] {
            maps.insert(id, generate_map(id));
        }
        Self { maps }
    }
}

impl WorldMaps {
    pub fn get(&self, id: MapId) -> Option<&MapDef> {
        self.maps.get(&id)
    }
}

// ─── Tile service ─────────────────────────────────────────────────────────────

/// Whether an actor can stand on this tile.
pub fn is_standable(map: &MapDef, tile: GridPosition) -> bool {
    !matches!(map.get_tile(tile.x, tile.y), TileKind::Water | TileKind::Void)
}

/// Probes up to `attempts` random tiles within `radius` of `origin` and
/// returns the first standable one. The bound keeps a fully blocked
/// neighbourhood from looping forever; `None` is a normal outcome.
pub fn find_standable_tile_near(
    map: &MapDef,
    origin: GridPosition,
    attempts: u32,
    radius: i32,
    rng: &mut impl Rng,
) -> Option<GridPosition> {
    if radius <= 0 {
        return is_standable(map, origin).then_some(origin);
    }
    for _ in 0..attempts {
        let candidate = GridPosition::new(
            origin.x + rng.gen_range(-radius..=radius),
            origin.y + rng.gen_range(-radius..=radius),
        );
        if is_standable(map, candidate) {
            return Some(candidate);
        }
    }
    None
}

/// The tile an actor must reach on `map` to transit to `to`, i.e. the
/// trigger tile of the first matching transition.
pub fn exit_tile_to(map: &MapDef, to: MapId) -> Option<GridPosition> {
    map.transitions
        .iter()
        .find(|t| t.to_map == to)
        .map(|t| GridPosition::new(t.from_rect.0, t.from_rect.1))
}

/// Where an actor lands on `to` after taking the transition from `map`.
pub fn arrival_pos_on(map: &MapDef, to: MapId) -> Option<GridPosition> {
    map.transitions
        .iter()
        .find(|t| t.to_map == to)
        .map(|t| GridPosition::new(t.to_pos.0, t.to_pos.1))
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_farmhouse_floor_is_standable() {
        let maps = WorldMaps::default();
        let house = maps.get(MapId::Farmhouse).unwrap();
        assert!(is_standable(house, GridPosition::new(4, 4)));
    }

    #[test]
    fn test_out_of_bounds_is_not_standable() {
        let maps = WorldMaps::default();
        let house = maps.get(MapId::Farmhouse).unwrap();
        assert!(!is_standable(house, GridPosition::new(-1, 0)));
        assert!(!is_standable(house, GridPosition::new(999, 999)));
    }

    #[test]
    fn test_farm_pond_is_not_standable() {
        let maps = WorldMaps::default();
        let farm = maps.get(MapId::Farm).unwrap();
        let pond = farm
            .tiles
            .iter()
            .position(|t| *t == TileKind::Water)
            .expect("farm should have a pond");
        let x = (pond % farm.width) as i32;
        let y = (pond / farm.width) as i32;
        assert!(!is_standable(farm, GridPosition::new(x, y)));
    }

    #[test]
    fn test_exit_tiles_are_linked_both_ways() {
        let maps = WorldMaps::default();
        let house = maps.get(MapId::Farmhouse).unwrap();
        let farm = maps.get(MapId::Farm).unwrap();

        let door = exit_tile_to(house, MapId::Farm).expect("farmhouse has a door");
        assert!(is_standable(house, door));

        let outside = arrival_pos_on(house, MapId::Farm).unwrap();
        assert!(is_standable(farm, outside));

        let back_door = exit_tile_to(farm, MapId::Farmhouse).expect("farm links back");
        assert!(is_standable(farm, back_door));
    }

    #[test]
    fn test_find_standable_tile_near_succeeds_on_open_ground() {
        let maps = WorldMaps::default();
        let farm = maps.get(MapId::Farm).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let found = find_standable_tile_near(farm, GridPosition::new(12, 9), 20, 4, &mut rng);
        assert!(found.is_some());
    }

    #[test]
    fn test_find_standable_tile_near_respects_attempt_bound() {
        let maps = WorldMaps::default();
        let house = maps.get(MapId::Farmhouse).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        // Origin far outside the map: every probe lands in Void.
        let found =
            find_standable_tile_near(house, GridPosition::new(500, 500), 10, 2, &mut rng);
        assert!(found.is_none());
    }

    #[test]
    fn test_zero_radius_probes_origin_only() {
        let maps = WorldMaps::default();
        let house = maps.get(MapId::Farmhouse).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(
            find_standable_tile_near(house, GridPosition::new(4, 4), 5, 0, &mut rng),
            Some(GridPosition::new(4, 4))
        );
    }
}
