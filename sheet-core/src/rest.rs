//! Short and long rests.
//!
//! A short rest refills short-rest features and items. A long rest is the
//! superset: it also refills long-rest entries, spell slots, hit dice and hit
//! points, and re-syncs linked features to the proficiency bonus first.
//! Items that never recharge are left alone by both.

use crate::character::{Character, FeatureRecharge, ItemRecharge};
use crate::derived;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestType {
    Short,
    Long,
}

impl fmt::Display for RestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestType::Short => write!(f, "short rest"),
            RestType::Long => write!(f, "long rest"),
        }
    }
}

/// Whether a recharge policy is satisfied by a given rest.
pub trait Recharge {
    fn restored_by(&self, rest: RestType) -> bool;
}

impl Recharge for FeatureRecharge {
    fn restored_by(&self, rest: RestType) -> bool {
        match self {
            FeatureRecharge::ShortRest => true,
            FeatureRecharge::LongRest => rest == RestType::Long,
        }
    }
}

impl Recharge for ItemRecharge {
    fn restored_by(&self, rest: RestType) -> bool {
        match self {
            ItemRecharge::ShortRest => true,
            ItemRecharge::LongRest => rest == RestType::Long,
            ItemRecharge::Never => false,
        }
    }
}

/// What a rest changed, for user-facing notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestReport {
    pub rest: RestType,
    /// Features that were below their cap and got refilled.
    pub features_restored: usize,
    /// Items that were below their cap and got refilled.
    pub items_restored: usize,
}

/// Apply a rest to a character.
///
/// Applying the same rest twice in a row changes nothing the second time.
pub fn apply_rest(character: &mut Character, rest: RestType) -> RestReport {
    if rest == RestType::Long {
        derived::sync_linked_features(character);
    }

    let features_restored = character
        .features
        .iter_mut()
        .filter(|f| f.recharge.restored_by(rest))
        .map(|f| f.uses.refill())
        .filter(|refilled| *refilled)
        .count();

    let items_restored = character
        .items
        .iter_mut()
        .filter(|i| i.recharge.restored_by(rest))
        .map(|i| i.charges.refill())
        .filter(|refilled| *refilled)
        .count();

    if rest == RestType::Long {
        for (_, slot) in character.spell_slots.iter_mut() {
            slot.refill();
        }
        character.hit_dice_used = 0;
        character.hit_points.current = character.hit_points.maximum;
        character.hit_points.temporary = 0;
    }

    tracing::debug!(
        name = %character.name(),
        %rest,
        features_restored,
        items_restored,
        "rest applied"
    );

    RestReport {
        rest,
        features_restored,
        items_restored,
    }
}

impl Character {
    /// Take a short rest. See [`apply_rest`].
    pub fn short_rest(&mut self) -> RestReport {
        apply_rest(self, RestType::Short)
    }

    /// Take a long rest. See [`apply_rest`].
    pub fn long_rest(&mut self) -> RestReport {
        apply_rest(self, RestType::Long)
    }
}
