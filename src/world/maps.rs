//! Map data definitions for the farmhouse interior and the farm outdoors.
//!
//! Each map is defined as a 2D grid of TileKind values plus transition
//! zones linking the two maps through the farmhouse door.

use crate::shared::*;

/// Complete definition of a game map.
#[derive(Debug, Clone)]
pub struct MapDef {
    pub id: MapId,
    pub width: usize,
    pub height: usize,
    /// Row-major tile data: tiles[y * width + x]
    pub tiles: Vec<TileKind>,
    /// Transition zones linking to other maps.
    pub transitions: Vec<MapTransition>,
}

impl MapDef {
    pub fn get_tile(&self, x: i32, y: i32) -> TileKind {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            TileKind::Void
        } else {
            self.tiles[y as usize * self.width + x as usize]
        }
    }

    pub fn set_tile(&mut self, x: i32, y: i32, kind: TileKind) {
        if x >= 0 && y >= 0 && x < self.width as i32 && y < self.height as i32 {
            self.tiles[y as usize * self.width + x as usize] = kind;
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// MAP GENERATORS
// ═══════════════════════════════════════════════════════════════════════

pub fn generate_map(map_id: MapId) -> MapDef {
    match map_id {
        MapId::Farmhouse => generate_farmhouse(),
        MapId::Farm => generate_farm(),
    }
}

fn fill_rect(
    tiles: &mut [TileKind],
    w: usize,
    x0: usize,
    y0: usize,
    rw: usize,
    rh: usize,
    kind: TileKind,
) {
    for dy in 0..rh {
        for dx in 0..rw {
            let idx = (y0 + dy) * w + (x0 + dx);
            if idx < tiles.len() {
                tiles[idx] = kind;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Farmhouse: 14x10 interior.
// Wood floor throughout, wall ring, nursery alcove top-right, door at the
// bottom-center leading out to the farm.
// ---------------------------------------------------------------------------
fn generate_farmhouse() -> MapDef {
    let w = 14usize;
    let h = 10usize;
    let mut tiles = vec![TileKind::WoodFloor; w * h];

    // Walls
    fill_rect(&mut tiles, w, 0, 0, w, 1, TileKind::Void);
    fill_rect(&mut tiles, w, 0, h - 1, w, 1, TileKind::Void);
    fill_rect(&mut tiles, w, 0, 0, 1, h, TileKind::Void);
    fill_rect(&mut tiles, w, w - 1, 0, 1, h, TileKind::Void);

    // Nursery alcove floor (top-right corner, 4x3)
    fill_rect(&mut tiles, w, 9, 1, 4, 3, TileKind::Path);

    // Doorway tile in the bottom wall
    tiles[(h - 1) * w + 7] = TileKind::WoodFloor;

    MapDef {
        id: MapId::Farmhouse,
        width: w,
        height: h,
        tiles,
        transitions: vec![MapTransition {
            from_map: MapId::Farmhouse,
            from_rect: (7, (h - 1) as i32, 1, 1),
            to_map: MapId::Farm,
            to_pos: (10, 6),
        }],
    }
}

// ---------------------------------------------------------------------------
// Farm: 24x18 outdoors.
// House footprint top-center with the door tile below it, dirt yard, pond
// bottom-right, paths along the edges.
// ---------------------------------------------------------------------------
fn generate_farm() -> MapDef {
    let w = 24usize;
    let h = 18usize;
    let mut tiles = vec![TileKind::Grass; w * h];

    // House footprint (not enterable by tile; the transition handles it)
    fill_rect(&mut tiles, w, 8, 1, 6, 4, TileKind::Stone);

    // Front step + path down from the door
    fill_rect(&mut tiles, w, 10, 5, 1, 4, TileKind::Path);

    // Dirt yard
    fill_rect(&mut tiles, w, 4, 10, 10, 5, TileKind::Dirt);

    // Pond bottom-right with a sand rim
    fill_rect(&mut tiles, w, 17, 12, 5, 4, TileKind::Water);
    for yy in 11..=16 {
        for xx in 16..=23 {
            let is_rim = yy == 11 || yy == 16 || xx == 16 || xx == 23;
            if is_rim && tiles[yy * w + xx] != TileKind::Water {
                tiles[yy * w + xx] = TileKind::Sand;
            }
        }
    }

    // Perimeter path (east edge)
    fill_rect(&mut tiles, w, w - 2, 0, 2, h, TileKind::Path);

    let mut def = MapDef {
        id: MapId::Farm,
        width: w,
        height: h,
        tiles,
        transitions: vec![MapTransition {
            from_map: MapId::Farm,
            from_rect: (10, 5, 1, 1),
            to_map: MapId::Farmhouse,
            to_pos: (7, 8),
        }],
    };

    // The door tile itself must be walkable
    def.set_tile(10, 5, TileKind::Path);
    def
}

// ─── Tests ────────────────────────────────────────────────────────────────────
