//! Data layer — configuration loading and initial household seeding.
//!
//! Runs in OnEnter(GameState::Loading): applies the RON config file (family
//! tuning plus per-identity enable overrides) over the built-in defaults,
//! seeds a demo household when starting with an empty one, then transitions
//! into GameState::Playing. Config problems degrade to defaults with a
//! warning; a missing file is not an error.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::shared::*;

/// On-disk config shape. Both sections are optional so a file can override
/// just the identity toggles or just the tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FamilyConfigFile {
    pub config: Option<FamilyConfig>,
    #[serde(default)]
    pub identity_enabled: HashMap<ChildId, bool>,
}

pub const CONFIG_PATH: &str = "assets/config/family.ron";

pub struct DataPlugin;

impl Plugin for DataPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(GameState::Loading), load_all_data);
    }
}

/// Single system that applies config and seeds the world, then moves on.
fn load_all_data(
    mut config: ResMut<FamilyConfig>,
    mut overrides: ResMut<IdentityOverrides>,
    mut family: ResMut<FamilyState>,
    mut house: ResMut<HouseState>,
    mut furniture: ResMut<HouseFurniture>,
    mut marriage: ResMut<MarriageState>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    info!("DataPlugin: loading configuration…");

    if let Some(file) = read_config_file() {
        if let Some(tuning) = file.config {
            *config = tuning;
            info!("  Family tuning loaded from {}", CONFIG_PATH);
        }
        if !file.identity_enabled.is_empty() {
            info!(
                "  Identity overrides loaded: {}",
                file.identity_enabled.len()
            );
            overrides.0 = file.identity_enabled;
        }
    }

    if family.children.is_empty() && marriage.spouse.is_none() {
        seed_demo_household(&mut family, &mut house, &mut furniture, &mut marriage);
    }

    next_state.set(GameState::Playing);
}

#[cfg(not(target_arch = "wasm32"))]
fn read_config_file() -> Option<FamilyConfigFile> {
    let text = std::fs::read_to_string(CONFIG_PATH).ok()?;
    match ron::from_str::<FamilyConfigFile>(&text) {
        Ok(file) => Some(file),
        Err(e) => {
            warn!(
                "Could not parse {} ({}); using built-in defaults",
                CONFIG_PATH, e
            );
            None
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn read_config_file() -> Option<FamilyConfigFile> {
    None
}

/// A married household with a nursery, two cribs, and two children so a
/// fresh run exercises the whole lifecycle immediately.
fn seed_demo_household(
    family: &mut FamilyState,
    house: &mut HouseState,
    furniture: &mut HouseFurniture,
    marriage: &mut MarriageState,
) {
    marriage.spouse = Some("elena".to_string());
    marriage.days_married = 40;
    marriage.wedding_date = Some((10, 0, 1));

    house.has_nursery = true;
    house.nursery_tile = GridPosition::new(10, 2);

    furniture.add(FurnitureKind::Bed, GridPosition::new(2, 2));
    furniture.add(FurnitureKind::Table, GridPosition::new(5, 5));
    furniture.add(FurnitureKind::Chair, GridPosition::new(6, 5));
    furniture.add(FurnitureKind::Crib, GridPosition::new(11, 2));
    furniture.add(FurnitureKind::Cradle, GridPosition::new(12, 2));
    furniture.add(FurnitureKind::Dresser, GridPosition::new(2, 6));

    family.children = vec![
        ChildRecord {
            identity_id: Some("violet".to_string()),
            display_name: "Violet".to_string(),
            gender: Gender::Female,
            dark_skinned: false,
            days_old: 30,
            parent_id: "elena".to_string(),
        },
        ChildRecord {
            identity_id: Some("kofi".to_string()),
            display_name: "Kofi".to_string(),
            gender: Gender::Male,
            dark_skinned: true,
            days_old: 8,
            parent_id: "elena".to_string(),
        },
    ];

    info!("  Demo household seeded: married, nursery, 2 children");
}

// ─── Tests ────────────────────────────────────────────────────────────────────
