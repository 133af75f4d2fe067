//! Births and child entity spawning.
//!
//! A married household with a nursery can start a pregnancy countdown on any
//! new day; when it reaches zero the identity selector runs (honoring any
//! pending forced identity) and a child entity joins the world. An exhausted
//! identity pool falls back to a generic child rather than failing.

use bevy::prelude::*;
use rand::Rng;

use super::definitions::child_color;
use super::excursion::ChildMapTag;
use super::identity::{pick_identity, AvailabilityContext, IdentityHints};
use crate::shared::*;

/// Entities currently mirroring `FamilyState.children`.
#[derive(Resource, Debug, Default)]
pub struct SpawnedChildren {
    pub entities: Vec<Entity>,
}

/// System: advance (or start) the pregnancy countdown at each day start.
pub fn progress_pregnancy(
    mut days: EventReader<DayStartedEvent>,
    config: Res<FamilyConfig>,
    marriage: Res<MarriageState>,
    house: Res<HouseState>,
    mut family: ResMut<FamilyState>,
    mut due_writer: EventWriter<BirthDueEvent>,
) {
    for _day in days.read() {
        let mut due_today = false;
        if let Some(remaining) = family.days_until_birth {
            if remaining <= 1 {
                family.days_until_birth = None;
                due_today = true;
                due_writer.send(BirthDueEvent);
            } else {
                family.days_until_birth = Some(remaining - 1);
            }
        }

        // Maybe start expecting.
        if due_today
            || marriage.spouse.is_none()
            || !house.has_nursery
            || family.days_until_birth.is_some()
            || family.children.len() >= config.max_children
        {
            continue;
        }
        if rand::thread_rng().gen::<f32>() < config.daily_birth_chance {
            family.days_until_birth = Some(config.pregnancy_days);
            info!(
                "[Family] A child is on the way — arriving in {} days",
                config.pregnancy_days
            );
        }
    }
}

/// System: materialize a due child: pick an identity, fall back to a
/// generic baby when the pool is exhausted, spawn the entity, and record it
/// in the roster.
pub fn deliver_child(
    mut commands: Commands,
    mut events: EventReader<BirthDueEvent>,
    calendar: Res<Calendar>,
    registry: Res<ChildRegistry>,
    overrides: Res<IdentityOverrides>,
    marriage: Res<MarriageState>,
    farm_name: Res<FarmName>,
    mut family: ResMut<FamilyState>,
    mut spawned: ResMut<SpawnedChildren>,
    mut born_writer: EventWriter<ChildBornEvent>,
) {
    for _event in events.read() {
        let parent = marriage.spouse.clone().unwrap_or_default();
        let ctx = AvailabilityContext::from_world(&family, &overrides, &parent);
        let forced = ctx.forced_next.clone();
        let picked = pick_identity(
            &registry,
            &ctx,
            &IdentityHints::default(),
            &farm_name.0,
            family.world_seed,
            calendar.total_days_elapsed(),
        );

        // A consumed forced identity stops being pending.
        if picked.is_some() && picked == forced {
            family.pending_identity.remove(&parent);
        }

        let record = match picked.as_deref().and_then(|id| registry.get(id)) {
            Some(def) => ChildRecord {
                identity_id: Some(def.id.clone()),
                display_name: def.rendered_name(&farm_name.0),
                gender: def.gender,
                dark_skinned: def.dark_skinned,
                days_old: 0,
                parent_id: parent.clone(),
            },
            None => {
                // Pool exhausted: a generic child with no pool identity.
                let gender = if rand::thread_rng().gen::<bool>() {
                    Gender::Female
                } else {
                    Gender::Male
                };
                info!("[Family] Identity pool exhausted — welcoming a little one anyway");
                ChildRecord {
                    identity_id: None,
                    display_name: "Baby".to_string(),
                    gender,
                    dark_skinned: false,
                    days_old: 0,
                    parent_id: parent.clone(),
                }
            }
        };

        info!("[Family] {} was born!", record.display_name);
        born_writer.send(ChildBornEvent {
            display_name: record.display_name.clone(),
            gender: record.gender,
            identity_id: record.identity_id.clone(),
        });

        let entity = spawn_child_entity(&mut commands, &record);
        spawned.entities.push(entity);
        family.children.push(record);
    }
}

/// Spawns the entity mirror for one child record. New children appear
/// indoors at the default rest tile; the crib allocator repositions them on
/// the next frame.
pub fn spawn_child_entity(commands: &mut Commands, record: &ChildRecord) -> Entity {
    let pos = grid_to_world_center(DEFAULT_REST_TILE.x, DEFAULT_REST_TILE.y);
    commands
        .spawn((
            Child {
                identity_id: record.identity_id.clone(),
                display_name: record.display_name.clone(),
                gender: record.gender,
                dark_skinned: record.dark_skinned,
                age_band: record.age_band(),
                days_old: record.days_old,
                parent_id: record.parent_id.clone(),
                crib: None,
                excursion: ExcursionState::Home,
            },
            ChildMapTag(MapId::Farmhouse),
            Sprite::from_color(
                child_color(record.gender, record.dark_skinned),
                Vec2::splat(TILE_SIZE * 0.75),
            ),
            Transform::from_xyz(pos.x, pos.y, Z_ENTITY_BASE),
            Visibility::default(),
        ))
        .id()
}

/// System: rebuild child entities from the persisted roster after a load or
/// new game. Excursion state and crib claims are transient, so every
/// reloaded child starts at Home with nothing assigned.
pub fn respawn_children_on_reload(
    mut commands: Commands,
    mut events: EventReader<HouseholdReloadedEvent>,
    family: Res<FamilyState>,
    mut spawned: ResMut<SpawnedChildren>,
    mut queue: ResMut<ExitQueue>,
    mut cache: ResMut<CribCache>,
) {
    if events.is_empty() {
        return;
    }
    events.clear();

    for entity in spawned.entities.drain(..) {
        commands.entity(entity).despawn_recursive();
    }
    queue.clear();
    cache.clear_claims();

    for record in &family.children {
        let entity = spawn_child_entity(&mut commands, record);
        spawned.entities.push(entity);
    }
    info!(
        "[Family] Household reloaded — {} children respawned at home",
        family.children.len()
    );
}

/// System: on entering Playing, make sure roster entries have entities
/// (fresh app start with a seeded or loaded household).
pub fn spawn_initial_children(
    mut commands: Commands,
    family: Res<FamilyState>,
    mut spawned: ResMut<SpawnedChildren>,
) {
    if !spawned.entities.is_empty() {
        return;
    }
    for record in &family.children {
        let entity = spawn_child_entity(&mut commands, record);
        spawned.entities.push(entity);
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_record_age_band_follows_days() {
        let mut record = ChildRecord {
            identity_id: None,
            display_name: "Baby".to_string(),
            gender: Gender::Male,
            dark_skinned: false,
            days_old: 0,
            parent_id: "elena".to_string(),
        };
        assert_eq!(record.age_band(), AgeBand::Newborn);
        record.days_old = NEWBORN_MAX_DAYS;
        assert_eq!(record.age_band(), AgeBand::Infant);
        record.days_old = CRAWLER_MAX_DAYS;
        assert_eq!(record.age_band(), AgeBand::Toddler);
    }
}
