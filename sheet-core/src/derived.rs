//! Derived values and record repair.
//!
//! Pure functions over a character: the proficiency bonus, the hit dice still
//! available, the linked-feature sync that runs before every save, and the
//! repair pass applied to records loaded from storage.

use crate::character::Character;
use std::ops::RangeInclusive;

/// Valid character levels.
pub const LEVEL_RANGE: RangeInclusive<u32> = 1..=20;
/// Valid hit point maximums.
pub const HP_MAX_RANGE: RangeInclusive<i32> = 1..=999;
/// Valid current hit points. Negative values are allowed.
pub const HP_CURRENT_RANGE: RangeInclusive<i32> = -999..=999;
/// Valid temporary hit points.
pub const HP_TEMP_RANGE: RangeInclusive<i32> = 0..=999;
/// Valid caps for feature uses and item charges.
pub const USES_RANGE: RangeInclusive<u32> = 1..=50;
/// Highest number of slots per spell level.
pub const MAX_SPELL_SLOTS: u32 = 4;

/// Proficiency bonus for a level: +2 at 1-4, +3 at 5-8, ... +6 at 17-20.
pub fn proficiency_bonus(level: u32) -> u32 {
    2 + level.saturating_sub(1) / 4
}

/// Hit dice not yet spent. The pool size is the character level.
pub fn hit_dice_remaining(character: &Character) -> u32 {
    character.level().saturating_sub(character.hit_dice_used)
}

/// Set every linked feature's cap to the current proficiency bonus, pulling
/// `current` down where needed. Returns how many features changed.
pub fn sync_linked_features(character: &mut Character) -> usize {
    let bonus = character.proficiency_bonus();
    character
        .features
        .iter_mut()
        .filter(|f| f.linked_to_proficiency)
        .map(|f| f.uses.set_max(bonus))
        .filter(|changed| *changed)
        .count()
}

/// Bring a loaded record back within the sheet's invariants.
///
/// Records written by older versions, or edited by hand in the backing
/// store, can hold values no editor would produce. They are patched here
/// rather than rejected. Returns whether anything was changed.
pub fn repair(character: &mut Character) -> bool {
    let mut changed = false;

    let level = character
        .identity
        .level
        .clamp(*LEVEL_RANGE.start(), *LEVEL_RANGE.end());
    changed |= level != character.identity.level;
    character.identity.level = level;

    if character.hit_dice_used > level {
        character.hit_dice_used = level;
        changed = true;
    }

    let hp = &mut character.hit_points;
    if hp.maximum < *HP_MAX_RANGE.start() {
        hp.maximum = *HP_MAX_RANGE.start();
        changed = true;
    }
    if hp.temporary < 0 {
        hp.temporary = 0;
        changed = true;
    }

    for feature in &mut character.features {
        if feature.uses.max() < *USES_RANGE.start() {
            feature.uses.set_max(*USES_RANGE.start());
            changed = true;
        }
        changed |= feature.uses.normalize();
    }
    for item in &mut character.items {
        if item.charges.max() < *USES_RANGE.start() {
            item.charges.set_max(*USES_RANGE.start());
            changed = true;
        }
        changed |= item.charges.normalize();
    }
    for (_, slot) in character.spell_slots.iter_mut() {
        if slot.max() > MAX_SPELL_SLOTS {
            slot.set_max(MAX_SPELL_SLOTS);
            changed = true;
        }
        changed |= slot.normalize();
    }

    if changed {
        tracing::debug!(name = %character.name(), "repaired stored record");
    }
    changed
}
