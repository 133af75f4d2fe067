//! Child identity definitions: the canonical candidate pool.
//!
//! Registered into ChildRegistry by DataPlugin during
//! `OnEnter(GameState::Loading)`. Registration order matters: the seeded
//! daily pick indexes into the ordered id list.

use bevy::prelude::*;

use crate::shared::*;

/// Builds the built-in candidate pool. A `{farm}` token in a name template
/// is replaced with the farm name at render time.
pub fn build_child_registry() -> ChildRegistry {
    let mut registry = ChildRegistry::default();

    let defs = [
        ("violet", "Violet", Gender::Female, false, true),
        ("rowan", "Rowan", Gender::Male, false, true),
        ("amara", "Amara", Gender::Female, true, true),
        ("kofi", "Kofi", Gender::Male, true, true),
        ("hazel", "Hazel", Gender::Female, false, true),
        ("jasper", "Jasper", Gender::Male, false, true),
        ("wren", "Wren of {farm}", Gender::Female, false, true),
        // Reserved for a content pack; enable via config override.
        ("sable", "Sable", Gender::Female, true, false),
    ];

    for (id, template, gender, dark_skinned, enabled) in defs {
        registry.register(ChildDefinition {
            id: id.to_string(),
            name_template: template.to_string(),
            gender,
            dark_skinned,
            enabled_by_default: enabled,
        });
    }

    registry
}

/// Placeholder sprite tint per child (used until real sprite sheets land).
pub fn child_color(gender: Gender, dark_skinned: bool) -> Color {
    match (gender, dark_skinned) {
        (Gender::Female, false) => Color::srgb(0.95, 0.75, 0.8),
        (Gender::Female, true) => Color::srgb(0.75, 0.5, 0.55),
        (Gender::Male, false) => Color::srgb(0.6, 0.75, 0.95),
        (Gender::Male, true) => Color::srgb(0.4, 0.55, 0.75),
    }
}
