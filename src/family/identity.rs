//! Identity selection: matches a new child to an unused pool definition.
//!
//! Priority order is strict: a pending forced identity wins, then an exact
//! display-name recovery, then a hint-filtered random pick. The random pick
//! is seeded from the world seed and the elapsed day count, so repeating the
//! selection within one day gives the same answer while different days give
//! different ones.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet};

use crate::shared::*;

/// Optional steering for a selection. Every field may be None; filters that
/// would eliminate every candidate are dropped rather than failing.
#[derive(Debug, Clone, Default)]
pub struct IdentityHints {
    /// Recover a previously-named child whose identity was lost.
    pub prior_display_name: Option<String>,
    pub gender: Option<Gender>,
    pub dark_skinned: Option<bool>,
}

/// Transient availability snapshot built per selection call.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityContext {
    /// Identity ids held by living children of the household.
    pub in_use: HashSet<ChildId>,
    /// Per-identity enabled overrides; missing = definition default.
    pub overrides: HashMap<ChildId, bool>,
    /// Forced "next identity" pending for the requesting parent.
    pub forced_next: Option<ChildId>,
}

impl AvailabilityContext {
    pub fn from_world(
        family: &FamilyState,
        overrides: &IdentityOverrides,
        parent: &str,
    ) -> Self {
        Self {
            in_use: family.identities_in_use(),
            overrides: overrides.0.clone(),
            forced_next: family.pending_identity.get(parent).cloned(),
        }
    }

    fn is_enabled(&self, def: &ChildDefinition) -> bool {
        self.overrides
            .get(&def.id)
            .copied()
            .unwrap_or(def.enabled_by_default)
    }

    pub fn is_available(&self, def: &ChildDefinition) -> bool {
        self.is_enabled(def) && !self.in_use.contains(&def.id)
    }
}

/// Reproducible per-day RNG: same world and day always roll the same dice.
pub fn daily_rng(world_seed: u64, day_index: u32) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(world_seed.wrapping_mul(0x9E37_79B9).wrapping_add(day_index as u64))
}

/// Picks one identity from the pool's available subset, or `None` when the
/// pool is exhausted (the caller then falls back to a generic child).
pub fn pick_identity(
    registry: &ChildRegistry,
    ctx: &AvailabilityContext,
    hints: &IdentityHints,
    farm_name: &str,
    world_seed: u64,
    day_index: u32,
) -> Option<ChildId> {
    // 1. A pending forced identity wins outright — if it is actually
    //    available. An in-use or disabled forced id falls through.
    if let Some(forced) = &ctx.forced_next {
        if registry.get(forced).is_some_and(|def| ctx.is_available(def)) {
            return Some(forced.clone());
        }
    }

    let available: Vec<&ChildDefinition> = registry
        .ordered_ids
        .iter()
        .filter_map(|id| registry.get(id))
        .filter(|def| ctx.is_available(def))
        .collect();

    if available.is_empty() {
        return None;
    }

    // 2. Exact display-name recovery.
    if let Some(prior) = &hints.prior_display_name {
        if let Some(def) = available
            .iter()
            .find(|def| def.rendered_name(farm_name) == *prior)
        {
            return Some(def.id.clone());
        }
    }

    // 3. Soft hint filters. Each filter is dropped when it would leave
    //    nothing, so one remaining identity is still returned even when it
    //    mismatches the hints.
    let mut candidates = available.clone();
    if let Some(gender) = hints.gender {
        let filtered: Vec<_> = candidates
            .iter()
            .copied()
            .filter(|def| def.gender == gender)
            .collect();
        if !filtered.is_empty() {
            candidates = filtered;
        }
    }
    if let Some(dark) = hints.dark_skinned {
        let filtered: Vec<_> = candidates
            .iter()
            .copied()
            .filter(|def| def.dark_skinned == dark)
            .collect();
        if !filtered.is_empty() {
            candidates = filtered;
        }
    }

    // 4. Uniform pick, stable for the rest of the day.
    let mut rng = daily_rng(world_seed, day_index);
    let index = rng.gen_range(0..candidates.len());
    Some(candidates[index].id.clone())
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::definitions::build_child_registry;

    fn empty_ctx() -> AvailabilityContext {
        AvailabilityContext::default()
    }

    #[test]
    fn test_forced_identity_wins() {
        let registry = build_child_registry();
        let ctx = AvailabilityContext {
            forced_next: Some("hazel".to_string()),
            ..empty_ctx()
        };
        let picked = pick_identity(&registry, &ctx, &IdentityHints::default(), "Farm", 1, 0);
        assert_eq!(picked.as_deref(), Some("hazel"));
    }

    #[test]
    fn test_forced_identity_in_use_falls_through() {
        let registry = build_child_registry();
        let ctx = AvailabilityContext {
            forced_next: Some("hazel".to_string()),
            in_use: HashSet::from(["hazel".to_string()]),
            ..empty_ctx()
        };
        let picked = pick_identity(&registry, &ctx, &IdentityHints::default(), "Farm", 1, 0);
        assert!(picked.is_some());
        assert_ne!(picked.as_deref(), Some("hazel"));
    }

    #[test]
    fn test_prior_display_name_recovers_identity() {
        let registry = build_child_registry();
        let hints = IdentityHints {
            prior_display_name: Some("Wren of Willowmere".to_string()),
            ..Default::default()
        };
        let picked = pick_identity(&registry, &empty_ctx(), &hints, "Willowmere", 1, 0);
        assert_eq!(picked.as_deref(), Some("wren"));
    }

    #[test]
    fn test_pick_is_deterministic_within_a_day() {
        let registry = build_child_registry();
        let first = pick_identity(&registry, &empty_ctx(), &IdentityHints::default(), "Farm", 99, 5);
        for _ in 0..10 {
            let again =
                pick_identity(&registry, &empty_ctx(), &IdentityHints::default(), "Farm", 99, 5);
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_pick_varies_across_days() {
        let registry = build_child_registry();
        let picks: HashSet<_> = (0..40)
            .filter_map(|day| {
                pick_identity(&registry, &empty_ctx(), &IdentityHints::default(), "Farm", 99, day)
            })
            .collect();
        assert!(picks.len() > 1, "forty days should not all pick the same id");
    }

    #[test]
    fn test_gender_filter_applies_when_satisfiable() {
        let registry = build_child_registry();
        let hints = IdentityHints {
            gender: Some(Gender::Male),
            ..Default::default()
        };
        for day in 0..20 {
            let picked =
                pick_identity(&registry, &empty_ctx(), &hints, "Farm", 7, day).unwrap();
            assert_eq!(registry.get(&picked).unwrap().gender, Gender::Male);
        }
    }

    #[test]
    fn test_unsatisfiable_filter_degrades_to_full_set() {
        let registry = build_child_registry();
        // Every male identity is taken; the gender hint must be dropped,
        // not turned into an empty result.
        let ctx = AvailabilityContext {
            in_use: HashSet::from([
                "rowan".to_string(),
                "kofi".to_string(),
                "jasper".to_string(),
            ]),
            ..empty_ctx()
        };
        let hints = IdentityHints {
            gender: Some(Gender::Male),
            ..Default::default()
        };
        let picked = pick_identity(&registry, &ctx, &hints, "Farm", 7, 0).unwrap();
        assert_eq!(registry.get(&picked).unwrap().gender, Gender::Female);
    }

    #[test]
    fn test_skin_tone_filter_composes_with_gender() {
        let registry = build_child_registry();
        let hints = IdentityHints {
            gender: Some(Gender::Male),
            dark_skinned: Some(true),
            ..Default::default()
        };
        let picked = pick_identity(&registry, &empty_ctx(), &hints, "Farm", 7, 3).unwrap();
        assert_eq!(picked, "kofi");
    }

    #[test]
    fn test_selecting_twice_never_double_assigns() {
        let registry = build_child_registry();
        let mut ctx = empty_ctx();
        let first = pick_identity(&registry, &ctx, &IdentityHints::default(), "Farm", 21, 4)
            .expect("pool has candidates");
        // The first child now holds that identity.
        ctx.in_use.insert(first.clone());
        let second = pick_identity(&registry, &ctx, &IdentityHints::default(), "Farm", 21, 4)
            .expect("pool still has candidates");
        assert_ne!(first, second);
    }

    #[test]
    fn test_exhausted_pool_returns_none() {
        let registry = build_child_registry();
        let ctx = AvailabilityContext {
            in_use: registry.ordered_ids.iter().cloned().collect(),
            ..empty_ctx()
        };
        assert_eq!(
            pick_identity(&registry, &ctx, &IdentityHints::default(), "Farm", 1, 0),
            None
        );
    }

    #[test]
    fn test_disabled_identity_is_not_picked() {
        let registry = build_child_registry();
        // "sable" is disabled by default; across many days it never appears.
        for day in 0..60 {
            if let Some(picked) =
                pick_identity(&registry, &empty_ctx(), &IdentityHints::default(), "Farm", 3, day)
            {
                assert_ne!(picked, "sable");
            }
        }
    }

    #[test]
    fn test_override_can_enable_a_disabled_identity() {
        let registry = build_child_registry();
        // Everything except sable in use; with the override, sable is the
        // single remaining candidate.
        let ctx = AvailabilityContext {
            in_use: registry
                .ordered_ids
                .iter()
                .filter(|id| id.as_str() != "sable")
                .cloned()
                .collect(),
            overrides: HashMap::from([("sable".to_string(), true)]),
            ..empty_ctx()
        };
        let picked = pick_identity(&registry, &ctx, &IdentityHints::default(), "Farm", 1, 0);
        assert_eq!(picked.as_deref(), Some("sable"));
    }

    #[test]
    fn test_single_remaining_identity_scenario() {
        // Three defined identities, one disabled, two in use → the single
        // remaining enabled, unused identity comes back, deterministically.
        let mut registry = ChildRegistry::default();
        for (id, gender, enabled) in [
            ("ada", Gender::Female, true),
            ("ben", Gender::Male, true),
            ("cal", Gender::Male, false),
        ] {
            registry.register(ChildDefinition {
                id: id.to_string(),
                name_template: id.to_string(),
                gender,
                dark_skinned: false,
                enabled_by_default: enabled,
            });
        }
        registry.register(ChildDefinition {
            id: "dot".to_string(),
            name_template: "Dot".to_string(),
            gender: Gender::Female,
            dark_skinned: true,
            enabled_by_default: true,
        });

        let ctx = AvailabilityContext {
            in_use: HashSet::from(["ada".to_string(), "ben".to_string()]),
            ..empty_ctx()
        };
        // Skin-tone hint mismatches the survivor; the soft filter still
        // returns it.
        let hints = IdentityHints {
            dark_skinned: Some(false),
            ..Default::default()
        };
        for day in 0..10 {
            assert_eq!(
                pick_identity(&registry, &ctx, &hints, "Farm", 11, day).as_deref(),
                Some("dot")
            );
        }
    }
}
