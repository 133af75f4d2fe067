//! Black-box pathfinding service.
//!
//! Callers queue requests on the `Pathfinder` resource and listen for
//! `PathComputedEvent`; results arrive on a later frame than the request.
//! The search itself is a pure BFS over standable tiles behind the
//! `PathPlanner` trait, so the scheduler never sees how a path is made —
//! only whether one was.

use bevy::prelude::*;
use std::collections::{HashMap, VecDeque};

use super::maps::MapDef;
use super::{is_standable, WorldMaps};
use crate::shared::*;

/// Computes a walking path between two tiles on one map.
/// `None` means the target is unreachable (a normal outcome).
pub trait PathPlanner: Send + Sync {
    fn plan(&self, map: &MapDef, from: GridPosition, to: GridPosition)
        -> Option<Vec<GridPosition>>;
}

/// Breadth-first search over 4-connected standable tiles. Returns the full
/// waypoint list including both endpoints.
pub struct GridPlanner;

impl PathPlanner for GridPlanner {
    fn plan(
        &self,
        map: &MapDef,
        from: GridPosition,
        to: GridPosition,
    ) -> Option<Vec<GridPosition>> {
        if !is_standable(map, from) || !is_standable(map, to) {
            return None;
        }
        if from == to {
            return Some(vec![from]);
        }

        let mut parents: HashMap<GridPosition, GridPosition> = HashMap::new();
        let mut queue = VecDeque::new();
        queue.push_back(from);
        parents.insert(from, from);

        while let Some(current) = queue.pop_front() {
            if current == to {
                // Walk parents back to the start
                let mut path = vec![current];
                let mut node = current;
                while node != from {
                    node = parents[&node];
                    path.push(node);
                }
                path.reverse();
                return Some(path);
            }

            let neighbours = [
                GridPosition::new(current.x + 1, current.y),
                GridPosition::new(current.x - 1, current.y),
                GridPosition::new(current.x, current.y + 1),
                GridPosition::new(current.x, current.y - 1),
            ];
            for next in neighbours {
                if is_standable(map, next) && !parents.contains_key(&next) {
                    parents.insert(next, current);
                    queue.push_back(next);
                }
            }
        }

        None
    }
}

/// One queued path request.
#[derive(Debug, Clone)]
pub struct PendingPathRequest {
    pub id: u32,
    pub child: Entity,
    pub map: MapId,
    pub from: GridPosition,
    pub to: GridPosition,
}

/// The path service facade. Requests queue here; `resolve_path_requests`
/// drains the queue and emits `PathComputedEvent`s.
#[derive(Resource)]
pub struct Pathfinder {
    planner: Box<dyn PathPlanner>,
    pending: Vec<PendingPathRequest>,
    next_id: u32,
}

impl Default for Pathfinder {
    fn default() -> Self {
        Self::with_planner(Box::new(GridPlanner))
    }
}

impl Pathfinder {
    pub fn with_planner(planner: Box<dyn PathPlanner>) -> Self {
        Self {
            planner,
            pending: Vec::new(),
            next_id: 0,
        }
    }

    /// Queues a request; the result event carries the returned id.
    pub fn request(&mut self, child: Entity, map: MapId, from: GridPosition, to: GridPosition) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.pending.push(PendingPathRequest {
            id,
            child,
            map,
            from,
            to,
        });
        id
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

/// System: drain queued path requests and publish results.
pub fn resolve_path_requests(
    maps: Res<WorldMaps>,
    mut pathfinder: ResMut<Pathfinder>,
    mut computed: EventWriter<PathComputedEvent>,
) {
    if pathfinder.pending.is_empty() {
        return;
    }

    let requests = std::mem::take(&mut pathfinder.pending);
    for req in requests {
        let route = maps
            .get(req.map)
            .and_then(|map| pathfinder.planner.plan(map, req.from, req.to))
            .map(|waypoints| PathRoute {
                map: req.map,
                waypoints,
            });

        if route.is_none() {
            info!(
                "[World] Path request {} for {:?} {:?} -> {:?} found no route",
                req.id, req.map, req.from, req.to
            );
        }

        computed.send(PathComputedEvent {
            request_id: req.id,
            child: req.child,
            route,
        });
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
