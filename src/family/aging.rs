//! Day-boundary aging for children.
//!
//! Runs after the excursion hard reset so every child ages at home. This is
//! also where the persisted roster picks up the new ages; identity and name
//! never change after birth, so the day boundary is the only place the
//! roster needs refreshing.

use bevy::prelude::*;

use crate::shared::*;

/// System: increment `days_old`, promote age bands at their thresholds, and
/// mirror the result into `FamilyState`.
pub fn age_children_on_day_end(
    mut events: EventReader<DayEndEvent>,
    mut family: ResMut<FamilyState>,
    mut children: Query<&mut Child>,
) {
    if events.is_empty() {
        return;
    }
    events.clear();

    for mut child in children.iter_mut() {
        child.days_old = child.days_old.saturating_add(1);
        let band = AgeBand::from_days(child.days_old);
        if band != child.age_band {
            child.age_band = band;
            match band {
                AgeBand::Toddler => info!(
                    "[Family] {} is a toddler now and can play outside",
                    child.display_name
                ),
                _ => info!("[Family] {} has grown ({:?})", child.display_name, band),
            }
        }
    }

    // Refresh the persisted roster from the live entities.
    family.children = children
        .iter()
        .map(|child| ChildRecord {
            identity_id: child.identity_id.clone(),
            display_name: child.display_name.clone(),
            gender: child.gender,
            dark_skinned: child.dark_skinned,
            days_old: child.days_old,
            parent_id: child.parent_id.clone(),
        })
        .collect();
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_band_thresholds() {
        assert_eq!(AgeBand::from_days(0), AgeBand::Newborn);
        assert_eq!(AgeBand::from_days(NEWBORN_MAX_DAYS - 1), AgeBand::Newborn);
        assert_eq!(AgeBand::from_days(NEWBORN_MAX_DAYS), AgeBand::Infant);
        assert_eq!(AgeBand::from_days(INFANT_MAX_DAYS), AgeBand::Crawler);
        assert_eq!(AgeBand::from_days(CRAWLER_MAX_DAYS), AgeBand::Toddler);
        assert_eq!(AgeBand::from_days(200), AgeBand::Toddler);
    }

    #[test]
    fn test_age_bands_are_ordered() {
        assert!(AgeBand::Newborn < AgeBand::Infant);
        assert!(AgeBand::Infant < AgeBand::Crawler);
        assert!(AgeBand::Crawler < AgeBand::Toddler);
        assert!(AgeBand::Toddler.is_independent());
        assert!(!AgeBand::Crawler.is_independent());
    }
}
