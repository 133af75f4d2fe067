use bevy::prelude::*;
use serde::{Deserialize, Serialize};
#[cfg(not(target_arch = "wasm32"))]
use std::fs;
#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;
use std::time::Duration;
#[cfg(not(target_arch = "wasm32"))]
use std::time::{SystemTime, UNIX_EPOCH};

use crate::shared::*;

// ═══════════════════════════════════════════════════════════════════════
// PUBLIC TYPES
// ═══════════════════════════════════════════════════════════════════════

pub const SAVE_VERSION: u32 = 1;
pub const NUM_SAVE_SLOTS: usize = 3;

/// Info about a save slot shown on the load/save screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveSlotInfo {
    pub slot: u8,
    pub exists: bool,
    pub day: u8,
    pub season: Season,
    pub year: u32,
    pub children: usize,
    pub farm_name: String,
    pub play_time_seconds: u64,
    pub save_timestamp: u64,
}

impl Default for SaveSlotInfo {
    fn default() -> Self {
        Self {
            slot: 0,
            exists: false,
            day: 1,
            season: Season::Spring,
            year: 1,
            children: 0,
            farm_name: String::from("Willowmere Farm"),
            play_time_seconds: 0,
            save_timestamp: 0,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// EVENTS
// ═══════════════════════════════════════════════════════════════════════

/// Sent to trigger a manual save.
#[derive(Event, Debug, Clone)]
pub struct SaveRequestEvent {
    pub slot: u8,
}

/// Sent to trigger loading a specific slot.
#[derive(Event, Debug, Clone)]
pub struct LoadRequestEvent {
    pub slot: u8,
}

/// Sent by SavePlugin after a save completes (success or failure).
#[derive(Event, Debug, Clone)]
pub struct SaveCompleteEvent {
    pub slot: u8,
    pub success: bool,
    pub error_message: Option<String>,
}

/// Sent by SavePlugin after a load completes.
#[derive(Event, Debug, Clone)]
pub struct LoadCompleteEvent {
    pub slot: u8,
    pub success: bool,
    pub error_message: Option<String>,
}

/// Sent to initialize a new game (clears all state to defaults).
#[derive(Event, Debug, Clone)]
pub struct NewGameEvent {
    pub farm_name: String,
    pub active_slot: u8,
}

// ═══════════════════════════════════════════════════════════════════════
// RESOURCES
// ═══════════════════════════════════════════════════════════════════════

/// Tracks which save slot is currently active.
#[derive(Resource, Debug, Clone)]
pub struct ActiveSaveSlot {
    pub slot: u8,
}

impl Default for ActiveSaveSlot {
    fn default() -> Self {
        Self { slot: 0 }
    }
}

/// Cached metadata for all 3 save slots.
#[derive(Resource, Debug, Clone, Default)]
pub struct SaveSlotInfoCache {
    pub slots: Vec<SaveSlotInfo>,
}

/// Statistics accumulated during gameplay. Persisted in the save file.
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameStatistics {
    pub play_time_seconds: u64,
}

/// Accumulated play time from the current session start.
#[derive(Resource, Debug, Clone)]
pub struct SessionTimer {
    pub elapsed: Duration,
}

impl Default for SessionTimer {
    fn default() -> Self {
        Self {
            elapsed: Duration::ZERO,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// PLUGIN
// ═══════════════════════════════════════════════════════════════════════

pub struct SavePlugin;

impl Plugin for SavePlugin {
    fn build(&self, app: &mut App) {
        app
            // Resources
            .init_resource::<ActiveSaveSlot>()
            .init_resource::<SaveSlotInfoCache>()
            .init_resource::<GameStatistics>()
            .init_resource::<SessionTimer>()
            // Events emitted/received by this plugin
            .add_event::<SaveRequestEvent>()
            .add_event::<LoadRequestEvent>()
            .add_event::<SaveCompleteEvent>()
            .add_event::<LoadCompleteEvent>()
            .add_event::<NewGameEvent>()
            // Startup: scan existing save files for the slot cache
            .add_systems(Startup, scan_save_slots)
            // Playing systems
            .add_systems(
                Update,
                (
                    tick_session_timer,
                    handle_save_request,
                    handle_load_request,
                    handle_new_game,
                    autosave_on_day_end,
                )
                    .run_if(in_state(GameState::Playing)),
            )
            // Also allow saving/loading from the Paused state (pause menu)
            .add_systems(
                Update,
                (handle_save_request, handle_load_request)
                    .run_if(in_state(GameState::Paused)),
            );
    }
}

// ═══════════════════════════════════════════════════════════════════════
// FILESYSTEM HELPERS
// ═══════════════════════════════════════════════════════════════════════

#[cfg(not(target_arch = "wasm32"))]
fn saves_directory() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));
    exe_dir.join("saves")
}

#[cfg(not(target_arch = "wasm32"))]
fn slot_path(slot: u8) -> PathBuf {
    saves_directory().join(format!("slot_{}.json", slot))
}

#[cfg(not(target_arch = "wasm32"))]
fn ensure_saves_dir() -> Result<(), std::io::Error> {
    let dir = saves_directory();
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
    }
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(target_arch = "wasm32")]
fn current_timestamp() -> u64 {
    0
}

// ═══════════════════════════════════════════════════════════════════════
// FULL SAVE FILE
// ═══════════════════════════════════════════════════════════════════════

/// Everything a slot persists. Children are stored as roster records only;
/// excursion state and the exit queue are same-day transit and always load
/// as Home/empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FullSaveFile {
    pub version: u32,
    pub slot: u8,
    pub save_timestamp: u64,
    pub play_time_seconds: u64,
    pub farm_name: String,
    pub calendar: Calendar,
    pub house_state: HouseState,
    pub furniture: HouseFurniture,
    pub marriage_state: MarriageState,
    pub family_state: FamilyState,
    pub crib_token: CribCacheToken,
}

impl FullSaveFile {
    fn to_save_slot_info(&self) -> SaveSlotInfo {
        SaveSlotInfo {
            slot: self.slot,
            exists: true,
            day: self.calendar.day,
            season: self.calendar.season,
            year: self.calendar.year,
            children: self.family_state.children.len(),
            farm_name: self.farm_name.clone(),
            play_time_seconds: self.play_time_seconds,
            save_timestamp: self.save_timestamp,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// SAVE / LOAD LOGIC
// ═══════════════════════════════════════════════════════════════════════

#[cfg(not(target_arch = "wasm32"))]
#[allow(clippy::too_many_arguments)]
fn write_save(
    slot: u8,
    calendar: &Calendar,
    house_state: &HouseState,
    furniture: &HouseFurniture,
    marriage_state: &MarriageState,
    family_state: &FamilyState,
    crib_token: CribCacheToken,
    farm_name: &FarmName,
    statistics: &GameStatistics,
) -> Result<(), String> {
    ensure_saves_dir().map_err(|e| format!("Could not create saves directory: {}", e))?;

    let file = FullSaveFile {
        version: SAVE_VERSION,
        slot,
        save_timestamp: current_timestamp(),
        play_time_seconds: statistics.play_time_seconds,
        farm_name: farm_name.0.clone(),
        calendar: calendar.clone(),
        house_state: house_state.clone(),
        furniture: furniture.clone(),
        marriage_state: marriage_state.clone(),
        family_state: family_state.clone(),
        crib_token,
    };

    let json =
        serde_json::to_string_pretty(&file).map_err(|e| format!("Serialization failed: {}", e))?;

    let path = slot_path(slot);
    // Write to a temp file first, then rename for atomicity
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, &json)
        .map_err(|e| format!("Write failed for {}: {}", tmp_path.display(), e))?;
    fs::rename(&tmp_path, &path).map_err(|e| format!("Rename failed: {}", e))?;

    Ok(())
}

#[cfg(target_arch = "wasm32")]
#[allow(clippy::too_many_arguments)]
fn write_save(
    _slot: u8,
    _calendar: &Calendar,
    _house_state: &HouseState,
    _furniture: &HouseFurniture,
    _marriage_state: &MarriageState,
    _family_state: &FamilyState,
    _crib_token: CribCacheToken,
    _farm_name: &FarmName,
    _statistics: &GameStatistics,
) -> Result<(), String> {
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn read_save(slot: u8) -> Result<FullSaveFile, String> {
    let path = slot_path(slot);
    if !path.exists() {
        return Err(format!("Save slot {} does not exist", slot));
    }
    let json = fs::read_to_string(&path)
        .map_err(|e| format!("Read failed for {}: {}", path.display(), e))?;
    let file: FullSaveFile =
        serde_json::from_str(&json).map_err(|e| format!("Deserialization failed: {}", e))?;

    // Version check — future versions can add migration here
    if file.version != SAVE_VERSION {
        warn!(
            "Save slot {} has version {} but current version is {}. Attempting to load anyway.",
            slot, file.version, SAVE_VERSION
        );
    }

    Ok(file)
}

#[cfg(target_arch = "wasm32")]
fn read_save(_slot: u8) -> Result<FullSaveFile, String> {
    Err("Saves not available in browser".to_string())
}

fn peek_save(slot: u8) -> Option<SaveSlotInfo> {
    match read_save(slot) {
        Ok(file) => Some(file.to_save_slot_info()),
        Err(_) => Some(SaveSlotInfo {
            slot,
            exists: false,
            ..Default::default()
        }),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// SYSTEMS
// ═══════════════════════════════════════════════════════════════════════

fn scan_save_slots(mut cache: ResMut<SaveSlotInfoCache>) {
    cache.slots.clear();
    for slot in 0..NUM_SAVE_SLOTS as u8 {
        let info = peek_save(slot).unwrap_or(SaveSlotInfo {
            slot,
            exists: false,
            ..Default::default()
        });
        cache.slots.push(info);
    }
    info!("Save slot scan complete. Found {} slots.", NUM_SAVE_SLOTS);
}

fn tick_session_timer(
    time: Res<Time>,
    mut session: ResMut<SessionTimer>,
    mut stats: ResMut<GameStatistics>,
) {
    session.elapsed += time.delta();
    // Accumulate into statistics every second to keep stats reasonable
    let elapsed_secs = session.elapsed.as_secs();
    if elapsed_secs > 0 {
        stats.play_time_seconds = stats.play_time_seconds.saturating_add(elapsed_secs);
        session.elapsed -= Duration::from_secs(elapsed_secs);
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_save_request(
    mut save_events: EventReader<SaveRequestEvent>,
    mut complete_events: EventWriter<SaveCompleteEvent>,
    mut cache: ResMut<SaveSlotInfoCache>,
    mut active_slot: ResMut<ActiveSaveSlot>,
    calendar: Res<Calendar>,
    house_state: Res<HouseState>,
    furniture: Res<HouseFurniture>,
    marriage_state: Res<MarriageState>,
    family_state: Res<FamilyState>,
    crib_cache: Res<CribCache>,
    farm_name: Res<FarmName>,
    statistics: Res<GameStatistics>,
) {
    for ev in save_events.read() {
        let slot = ev.slot;
        active_slot.slot = slot;

        info!("Saving to slot {}...", slot);

        match write_save(
            slot,
            &calendar,
            &house_state,
            &furniture,
            &marriage_state,
            &family_state,
            crib_cache.token,
            &farm_name,
            &statistics,
        ) {
            Ok(()) => {
                info!("Save to slot {} succeeded.", slot);
                // Refresh the slot info in the cache
                if let Some(info) = peek_save(slot) {
                    if let Some(cached) = cache.slots.get_mut(slot as usize) {
                        *cached = info;
                    }
                }
                complete_events.send(SaveCompleteEvent {
                    slot,
                    success: true,
                    error_message: None,
                });
            }
            Err(e) => {
                warn!("Save to slot {} FAILED: {}", slot, e);
                complete_events.send(SaveCompleteEvent {
                    slot,
                    success: false,
                    error_message: Some(e),
                });
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_load_request(
    mut load_events: EventReader<LoadRequestEvent>,
    mut complete_events: EventWriter<LoadCompleteEvent>,
    mut reloaded_events: EventWriter<HouseholdReloadedEvent>,
    mut active_slot: ResMut<ActiveSaveSlot>,
    mut calendar: ResMut<Calendar>,
    mut house_state: ResMut<HouseState>,
    mut furniture: ResMut<HouseFurniture>,
    mut marriage_state: ResMut<MarriageState>,
    mut family_state: ResMut<FamilyState>,
    mut crib_cache: ResMut<CribCache>,
    mut farm_name: ResMut<FarmName>,
    mut statistics: ResMut<GameStatistics>,
) {
    for ev in load_events.read() {
        let slot = ev.slot;
        info!("Loading from slot {}...", slot);

        match read_save(slot) {
            Ok(file) => {
                active_slot.slot = slot;

                // Apply all loaded state to resources
                *calendar = file.calendar;
                *house_state = file.house_state;
                *furniture = file.furniture;
                *marriage_state = file.marriage_state;
                *family_state = file.family_state;
                farm_name.0 = file.farm_name;
                statistics.play_time_seconds = file.play_time_seconds;

                // The token survives the reload; the claims are transient
                // and rebuild when children respawn.
                crib_cache.token = file.crib_token;
                crib_cache.clear_claims();

                reloaded_events.send(HouseholdReloadedEvent);

                info!("Load from slot {} succeeded.", slot);
                complete_events.send(LoadCompleteEvent {
                    slot,
                    success: true,
                    error_message: None,
                });
            }
            Err(e) => {
                warn!("Load from slot {} FAILED: {}", slot, e);
                complete_events.send(LoadCompleteEvent {
                    slot,
                    success: false,
                    error_message: Some(e),
                });
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_new_game(
    mut new_game_events: EventReader<NewGameEvent>,
    mut reloaded_events: EventWriter<HouseholdReloadedEvent>,
    mut active_slot: ResMut<ActiveSaveSlot>,
    mut calendar: ResMut<Calendar>,
    mut house_state: ResMut<HouseState>,
    mut furniture: ResMut<HouseFurniture>,
    mut marriage_state: ResMut<MarriageState>,
    mut family_state: ResMut<FamilyState>,
    mut crib_cache: ResMut<CribCache>,
    mut farm_name: ResMut<FarmName>,
    mut statistics: ResMut<GameStatistics>,
) {
    for ev in new_game_events.read() {
        info!(
            "Starting new game in slot {} with farm name '{}'",
            ev.active_slot, ev.farm_name
        );

        active_slot.slot = ev.active_slot;

        // Reset all shared resources to default state
        *calendar = Calendar::default();
        *house_state = HouseState::default();
        *furniture = HouseFurniture::default();
        *marriage_state = MarriageState::default();
        *family_state = FamilyState::default();
        *crib_cache = CribCache::default();
        *statistics = GameStatistics::default();
        farm_name.0 = ev.farm_name.clone();

        reloaded_events.send(HouseholdReloadedEvent);

        info!("New game initialized.");
    }
}

/// Listen for DayEndEvent and autosave to the active slot.
fn autosave_on_day_end(
    mut day_end_events: EventReader<DayEndEvent>,
    mut save_writer: EventWriter<SaveRequestEvent>,
    active_slot: Res<ActiveSaveSlot>,
) {
    for ev in day_end_events.read() {
        info!(
            "Autosaving at end of day {} {:?} year {}",
            ev.day, ev.season, ev.year
        );
        save_writer.send(SaveRequestEvent {
            slot: active_slot.slot,
        });
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file() -> FullSaveFile {
        let mut family = FamilyState::default();
        family.children.push(ChildRecord {
            identity_id: Some("violet".to_string()),
            display_name: "Violet".to_string(),
            gender: Gender::Female,
            dark_skinned: false,
            days_old: 12,
            parent_id: "elena".to_string(),
        });
        FullSaveFile {
            version: SAVE_VERSION,
            slot: 0,
            save_timestamp: 1234,
            play_time_seconds: 60,
            farm_name: "Test Farm".to_string(),
            calendar: Calendar::default(),
            house_state: HouseState::default(),
            furniture: HouseFurniture::default(),
            marriage_state: MarriageState::default(),
            family_state: family,
            crib_token: CribCacheToken {
                day_index: 11,
                furniture_revision: 3,
            },
        }
    }

    #[test]
    fn test_save_file_round_trips_through_json() {
        let file = sample_file();
        let json = serde_json::to_string(&file).unwrap();
        let parsed: FullSaveFile = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.version, SAVE_VERSION);
        assert_eq!(parsed.family_state.children.len(), 1);
        assert_eq!(parsed.family_state.children[0].days_old, 12);
        assert_eq!(parsed.crib_token.day_index, 11);
        assert_eq!(parsed.crib_token.furniture_revision, 3);
    }

    #[test]
    fn test_save_file_has_no_transit_state() {
        // The save shape carries roster records only: a record mentions
        // nothing about excursions, routes, or the exit queue, so a load
        // cannot resurrect same-day transit.
        let file = sample_file();
        let json = serde_json::to_string(&file).unwrap();
        assert!(!json.contains("excursion"));
        assert!(!json.contains("queue"));
    }

    #[test]
    fn test_slot_info_reflects_household() {
        let info = sample_file().to_save_slot_info();
        assert!(info.exists);
        assert_eq!(info.children, 1);
        assert_eq!(info.farm_name, "Test Farm");
    }
}
