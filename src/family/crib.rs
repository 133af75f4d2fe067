//! Crib allocation: one sleeping spot per small child.
//!
//! The nursery (whole-room slot) pre-empts per-furniture cribs and holds at
//! most one child; per-furniture cribs are claimed in inventory insertion
//! order. No crib is a normal outcome — the child rests on the floor and the
//! lookup retries after the next invalidation. Claims live in `CribCache`
//! and are rebuilt wholesale when the day or the furniture revision changes.

use bevy::prelude::*;

use crate::shared::*;

/// Current invalidation token for this day/furniture generation.
pub fn current_token(calendar: &Calendar, furniture: &HouseFurniture) -> CribCacheToken {
    CribCacheToken {
        day_index: calendar.total_days_elapsed(),
        furniture_revision: furniture.revision,
    }
}

/// Computes (or returns the already-cached) assignment for one claimant.
/// Idempotent within a cache generation: asking twice returns the same slot.
pub fn compute_assignment(
    cache: &mut CribCache,
    house: &HouseState,
    furniture: &HouseFurniture,
    claimant: Entity,
) -> Option<CribAssignment> {
    if cache.whole_room == Some(claimant) {
        return Some(CribAssignment::WholeRoom {
            tile: house.nursery_tile,
        });
    }
    if let Some((&index, _)) = cache
        .furniture_claims
        .iter()
        .find(|(_, holder)| **holder == claimant)
    {
        let tile = furniture.pieces.get(index)?.tile;
        return Some(CribAssignment::Furniture { index, tile });
    }

    // Whole-room slot first: exclusive, household-wide.
    if house.has_nursery && cache.whole_room.is_none() {
        cache.whole_room = Some(claimant);
        return Some(CribAssignment::WholeRoom {
            tile: house.nursery_tile,
        });
    }

    // Then the first unclaimed crib-capable piece, insertion order.
    for (index, piece) in furniture.crib_capable_pieces() {
        if !cache.furniture_claims.contains_key(&index) {
            cache.furniture_claims.insert(index, claimant);
            return Some(CribAssignment::Furniture {
                index,
                tile: piece.tile,
            });
        }
    }

    None
}

/// Render offset from the crib tile per age band. Crawlers wake after
/// `wake_hour` and shift to the crib's foot; downstream placement relies on
/// these exact offsets staying collision-free.
pub fn crib_offset(band: AgeBand, time_float: f32, wake_hour: f32) -> Vec2 {
    match band {
        AgeBand::Newborn => Vec2::new(0.0, 5.0),
        AgeBand::Infant => Vec2::new(0.0, 2.0),
        AgeBand::Crawler => {
            if time_float < wake_hour {
                Vec2::new(0.0, 1.0)
            } else {
                Vec2::new(0.0, -12.0)
            }
        }
        AgeBand::Toddler => Vec2::ZERO,
    }
}

// ─── Systems ──────────────────────────────────────────────────────────────────

/// System: drop all claims when furniture changes so the next lookup
/// reassigns against the new inventory.
pub fn invalidate_on_furniture_change(
    mut events: EventReader<FurnitureChangedEvent>,
    mut cache: ResMut<CribCache>,
    mut children: Query<&mut Child>,
) {
    if events.is_empty() {
        return;
    }
    events.clear();

    cache.clear_claims();
    for mut child in children.iter_mut() {
        child.crib = None;
    }
    info!("[Family] Furniture changed — crib assignments reset");
}

/// System: keep the cache token fresh and lazily assign cribs to children
/// that have none. The token check also covers the day rollover, so a new
/// day reassigns without an explicit event.
pub fn assign_cribs(
    calendar: Res<Calendar>,
    house: Res<HouseState>,
    furniture: Res<HouseFurniture>,
    mut cache: ResMut<CribCache>,
    mut children: Query<(Entity, &mut Child)>,
) {
    let token = current_token(&calendar, &furniture);
    if cache.token != token {
        cache.token = token;
        cache.clear_claims();
        for (_, mut child) in children.iter_mut() {
            child.crib = None;
        }
    }

    for (entity, mut child) in children.iter_mut() {
        if child.crib.is_some() {
            continue;
        }
        child.crib = compute_assignment(&mut cache, &house, &furniture, entity);
    }
}

/// System: place non-independent children at their crib (or the floor
/// fallback) with the band-specific offset.
pub fn reposition_small_children(
    calendar: Res<Calendar>,
    config: Res<FamilyConfig>,
    mut children: Query<(Entity, &Child, &mut Transform)>,
) {
    let time = calendar.time_float();
    for (entity, child, mut transform) in children.iter_mut() {
        if child.age_band.is_independent() {
            continue;
        }
        let pos = match child.crib {
            Some(assignment) => {
                let tile = assignment.tile();
                grid_to_world_center(tile.x, tile.y)
                    + crib_offset(child.age_band, time, config.wake_hour)
            }
            None => {
                // Floor fallback: spread siblings out by a tile so they
                // never stack on the same spot.
                let spread = (entity.index() % 3) as f32;
                grid_to_world_center(DEFAULT_REST_TILE.x, DEFAULT_REST_TILE.y)
                    + Vec2::new(spread * TILE_SIZE, 0.0)
            }
        };
        transform.translation.x = pos.x;
        transform.translation.y = pos.y;
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
