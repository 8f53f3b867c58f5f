//! Character sheet types.
//!
//! A character is identity, hit points, a hit-dice pool, ordered features and
//! items, and a spell-slot table. Field names on the wire follow the stored
//! record format (`infos`, `hp`, `actuel`, ...), which predates this crate.

use crate::derived;
use crate::ledger::{Counter, HitDicePool, ListKind};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from editing a character.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Level {0} is outside 1-20")]
    LevelOutOfRange(u32),

    #[error("Hit point {field} {value} is outside {min}..={max}")]
    HitPointsOutOfRange {
        field: &'static str,
        value: i32,
        min: i32,
        max: i32,
    },

    #[error("Maximum {0} is outside 1-50")]
    UsesOutOfRange(u32),

    #[error("Spell slot maximum {0} is above 4")]
    SpellSlotsOutOfRange(u32),

    #[error("No spell level {0} (expected 1-9)")]
    SpellLevel(u8),

    #[error("No entry {index} in {list} (length {len})")]
    NoSuchEntry {
        list: ListKind,
        index: usize,
        len: usize,
    },
}

// ============================================================================
// Classes
// ============================================================================

/// Hit die sizes used by the classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DieType {
    D6,
    D8,
    D10,
    D12,
}

impl DieType {
    pub fn sides(&self) -> u32 {
        match self {
            DieType::D6 => 6,
            DieType::D8 => 8,
            DieType::D10 => 10,
            DieType::D12 => 12,
        }
    }
}

impl fmt::Display for DieType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.sides())
    }
}

/// Character classes.
///
/// Stored under their French labels (`"Guerrier"`, `"Magicien"`, ...) for
/// compatibility with existing records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CharacterClass {
    Artificer,
    Barbarian,
    Bard,
    Cleric,
    Druid,
    #[default]
    Fighter,
    Monk,
    Paladin,
    Ranger,
    Rogue,
    Sorcerer,
    Warlock,
    Wizard,
}

impl CharacterClass {
    /// All classes, in the alphabetical order of their stored labels.
    pub fn all() -> [CharacterClass; 13] {
        let mut classes = [
            CharacterClass::Artificer,
            CharacterClass::Barbarian,
            CharacterClass::Bard,
            CharacterClass::Cleric,
            CharacterClass::Druid,
            CharacterClass::Fighter,
            CharacterClass::Monk,
            CharacterClass::Paladin,
            CharacterClass::Ranger,
            CharacterClass::Rogue,
            CharacterClass::Sorcerer,
            CharacterClass::Warlock,
            CharacterClass::Wizard,
        ];
        classes.sort_by_key(|c| c.label());
        classes
    }

    pub fn hit_die(&self) -> DieType {
        match self {
            CharacterClass::Barbarian => DieType::D12,
            CharacterClass::Fighter | CharacterClass::Paladin | CharacterClass::Ranger => {
                DieType::D10
            }
            CharacterClass::Artificer
            | CharacterClass::Bard
            | CharacterClass::Cleric
            | CharacterClass::Druid
            | CharacterClass::Monk
            | CharacterClass::Rogue
            | CharacterClass::Warlock => DieType::D8,
            CharacterClass::Sorcerer | CharacterClass::Wizard => DieType::D6,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CharacterClass::Artificer => "Artificer",
            CharacterClass::Barbarian => "Barbarian",
            CharacterClass::Bard => "Bard",
            CharacterClass::Cleric => "Cleric",
            CharacterClass::Druid => "Druid",
            CharacterClass::Fighter => "Fighter",
            CharacterClass::Monk => "Monk",
            CharacterClass::Paladin => "Paladin",
            CharacterClass::Ranger => "Ranger",
            CharacterClass::Rogue => "Rogue",
            CharacterClass::Sorcerer => "Sorcerer",
            CharacterClass::Warlock => "Warlock",
            CharacterClass::Wizard => "Wizard",
        }
    }

    /// The label used in stored records.
    pub fn label(&self) -> &'static str {
        match self {
            CharacterClass::Artificer => "Artificier",
            CharacterClass::Barbarian => "Barbare",
            CharacterClass::Bard => "Barde",
            CharacterClass::Cleric => "Clerc",
            CharacterClass::Druid => "Druide",
            CharacterClass::Fighter => "Guerrier",
            CharacterClass::Monk => "Moine",
            CharacterClass::Paladin => "Paladin",
            CharacterClass::Ranger => "Rôdeur",
            CharacterClass::Rogue => "Roublard",
            CharacterClass::Sorcerer => "Ensorceleur",
            CharacterClass::Warlock => "Sorcier",
            CharacterClass::Wizard => "Magicien",
        }
    }

    /// Look a class up by stored label or English name.
    pub fn parse(s: &str) -> Option<CharacterClass> {
        let s = s.trim();
        CharacterClass::all()
            .into_iter()
            .find(|c| c.label() == s || c.name().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Serialize for CharacterClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for CharacterClass {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(CharacterClass::parse(&label).unwrap_or_else(|| {
            tracing::warn!(%label, "unknown class in record, using the default class");
            CharacterClass::default()
        }))
    }
}

// ============================================================================
// Identity and Hit Points
// ============================================================================

/// Who the character is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "nom")]
    pub name: String,
    pub race: String,
    #[serde(rename = "classe", default)]
    pub class: CharacterClass,
    #[serde(rename = "niveau")]
    pub level: u32,
}

/// Hit points. `current` and `temporary` are not clamped against `maximum`:
/// negative hit points and overheal are both valid table states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitPoints {
    #[serde(rename = "max")]
    pub maximum: i32,
    #[serde(rename = "actuel")]
    pub current: i32,
    #[serde(rename = "temp")]
    pub temporary: i32,
}

impl HitPoints {
    pub fn new(maximum: i32) -> Self {
        Self {
            current: maximum,
            maximum,
            temporary: 0,
        }
    }

    /// Fraction of maximum for display, clamped to `[0, 1]`.
    pub fn ratio(&self) -> f32 {
        if self.maximum <= 0 {
            return 0.0;
        }
        (self.current as f32 / self.maximum as f32).clamp(0.0, 1.0)
    }
}

impl Default for HitPoints {
    fn default() -> Self {
        Self::new(10)
    }
}

// ============================================================================
// Features and Items
// ============================================================================

/// When a feature's uses come back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureRecharge {
    #[serde(rename = "Court")]
    ShortRest,
    #[serde(rename = "Long")]
    LongRest,
}

/// When an item's charges come back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemRecharge {
    #[serde(rename = "Court")]
    ShortRest,
    #[serde(rename = "Long")]
    LongRest,
    #[serde(rename = "Jamais")]
    Never,
}

impl fmt::Display for FeatureRecharge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureRecharge::ShortRest => write!(f, "Short Rest"),
            FeatureRecharge::LongRest => write!(f, "Long Rest"),
        }
    }
}

impl fmt::Display for ItemRecharge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemRecharge::ShortRest => write!(f, "Short Rest"),
            ItemRecharge::LongRest => write!(f, "Long Rest"),
            ItemRecharge::Never => write!(f, "Never"),
        }
    }
}

/// A class or racial ability with limited uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(flatten)]
    pub uses: Counter,
    #[serde(rename = "repos")]
    pub recharge: FeatureRecharge,
    /// When set, the cap follows the proficiency bonus.
    #[serde(rename = "linked_pb", default)]
    pub linked_to_proficiency: bool,
}

impl Feature {
    /// A new feature with all uses available.
    pub fn new(name: impl Into<String>, max: u32, recharge: FeatureRecharge) -> Self {
        Self {
            name: name.into(),
            uses: Counter::full(max),
            recharge,
            linked_to_proficiency: false,
        }
    }

    /// A feature whose cap is the proficiency bonus at `level`.
    pub fn linked(name: impl Into<String>, level: u32, recharge: FeatureRecharge) -> Self {
        Self {
            linked_to_proficiency: true,
            ..Self::new(name, derived::proficiency_bonus(level), recharge)
        }
    }
}

/// A consumable or charged object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(flatten)]
    pub charges: Counter,
    #[serde(rename = "repos")]
    pub recharge: ItemRecharge,
}

impl Item {
    /// A new item with all charges available.
    pub fn new(name: impl Into<String>, max: u32, recharge: ItemRecharge) -> Self {
        Self {
            name: name.into(),
            charges: Counter::full(max),
            recharge,
        }
    }
}

// ============================================================================
// Spell Slots
// ============================================================================

/// Spell slots for spell levels 1 through 9.
///
/// Stored as a map keyed `"1"` to `"9"`. Missing levels load as empty and
/// unknown keys are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpellSlots {
    slots: [Counter; 9],
}

impl SpellSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, level: u8) -> Option<&Counter> {
        Self::index(level).map(|i| &self.slots[i])
    }

    pub fn get_mut(&mut self, level: u8) -> Option<&mut Counter> {
        Self::index(level).map(move |i| &mut self.slots[i])
    }

    /// `(spell level, slots)` pairs in level order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &Counter)> {
        (1u8..).zip(self.slots.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u8, &mut Counter)> {
        (1u8..).zip(self.slots.iter_mut())
    }

    fn index(level: u8) -> Option<usize> {
        (1..=9).contains(&level).then(|| usize::from(level) - 1)
    }
}

impl Serialize for SpellSlots {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.slots.len()))?;
        for (level, slot) in self.iter() {
            map.serialize_entry(&level.to_string(), slot)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SpellSlots {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SlotsVisitor;

        impl<'de> Visitor<'de> for SlotsVisitor {
            type Value = SpellSlots;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of spell levels \"1\" to \"9\"")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<SpellSlots, A::Error> {
                let mut slots = SpellSlots::new();
                while let Some(key) = access.next_key::<String>()? {
                    match key.parse::<u8>().ok().and_then(|l| slots.get_mut(l)) {
                        Some(slot) => *slot = access.next_value()?,
                        None => {
                            access.next_value::<de::IgnoredAny>()?;
                        }
                    }
                }
                Ok(slots)
            }
        }

        deserializer.deserialize_map(SlotsVisitor)
    }
}

// ============================================================================
// Character
// ============================================================================

/// One player's full sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    #[serde(rename = "infos")]
    pub identity: Identity,
    /// Absent in the oldest records.
    #[serde(rename = "hp", default)]
    pub hit_points: HitPoints,
    #[serde(default)]
    pub hit_dice_used: u32,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub spells_active: bool,
    #[serde(rename = "spells", default)]
    pub spell_slots: SpellSlots,
}

impl Character {
    /// A fresh level 1 character with no tracked resources.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            identity: Identity {
                name: name.into(),
                race: "Humain".to_string(),
                class: CharacterClass::default(),
                level: 1,
            },
            hit_points: HitPoints::default(),
            hit_dice_used: 0,
            features: Vec::new(),
            items: Vec::new(),
            spells_active: false,
            spell_slots: SpellSlots::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn level(&self) -> u32 {
        self.identity.level
    }

    pub fn class(&self) -> CharacterClass {
        self.identity.class
    }

    pub fn proficiency_bonus(&self) -> u32 {
        derived::proficiency_bonus(self.identity.level)
    }

    pub fn hit_die(&self) -> DieType {
        self.identity.class.hit_die()
    }

    pub fn hit_dice_remaining(&self) -> u32 {
        derived::hit_dice_remaining(self)
    }

    /// The hit-dice pool as an adjustable counter.
    pub fn hit_dice_pool(&mut self) -> HitDicePool<'_> {
        HitDicePool::new(&mut self.hit_dice_used, self.identity.level)
    }

    /// One-line summary for listings, e.g. "Thorin - Fighter 3".
    pub fn summary(&self) -> String {
        format!(
            "{} - {} {}",
            self.identity.name, self.identity.class, self.identity.level
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_character_template() {
        let character = Character::new("Thorin");
        assert_eq!(character.name(), "Thorin");
        assert_eq!(character.level(), 1);
        assert_eq!(character.class(), CharacterClass::Fighter);
        assert_eq!(character.hit_points, HitPoints::new(10));
        assert_eq!(character.hit_dice_used, 0);
        assert!(character.features.is_empty());
        assert!(character.items.is_empty());
        assert!(!character.spells_active);
        assert!(character
            .spell_slots
            .iter()
            .all(|(_, slot)| slot.max() == 0 && slot.current() == 0));
        assert_eq!(character.spell_slots.iter().count(), 9);
    }

    #[test]
    fn test_hit_dice_by_class() {
        assert_eq!(CharacterClass::Barbarian.hit_die(), DieType::D12);
        assert_eq!(CharacterClass::Fighter.hit_die(), DieType::D10);
        assert_eq!(CharacterClass::Artificer.hit_die(), DieType::D8);
        assert_eq!(CharacterClass::Wizard.hit_die(), DieType::D6);
        assert_eq!(DieType::D8.to_string(), "d8");
    }

    #[test]
    fn test_class_order_and_parse() {
        let labels: Vec<_> = CharacterClass::all().iter().map(|c| c.label()).collect();
        assert_eq!(labels.first(), Some(&"Artificier"));
        assert_eq!(labels.last(), Some(&"Sorcier"));

        assert_eq!(CharacterClass::parse("Rôdeur"), Some(CharacterClass::Ranger));
        assert_eq!(CharacterClass::parse("wizard"), Some(CharacterClass::Wizard));
        assert_eq!(CharacterClass::parse("Bricoleur"), None);
    }

    #[test]
    fn test_record_field_names() {
        let mut character = Character::new("Aria");
        character
            .features
            .push(Feature::new("Second Wind", 1, FeatureRecharge::ShortRest));
        character
            .items
            .push(Item::new("Potion", 2, ItemRecharge::Never));

        let value = serde_json::to_value(&character).unwrap();
        assert_eq!(value["infos"]["nom"], "Aria");
        assert_eq!(value["infos"]["classe"], "Guerrier");
        assert_eq!(value["infos"]["niveau"], 1);
        assert_eq!(value["hp"], json!({"max": 10, "actuel": 10, "temp": 0}));
        assert_eq!(
            value["features"][0],
            json!({"nom": "Second Wind", "max": 1, "actuel": 1, "repos": "Court", "linked_pb": false})
        );
        assert_eq!(
            value["items"][0],
            json!({"nom": "Potion", "max": 2, "actuel": 2, "repos": "Jamais"})
        );
        assert_eq!(value["spells"]["9"], json!({"max": 0, "actuel": 0}));
    }

    #[test]
    fn test_legacy_record_without_hp() {
        let record = json!({
            "infos": {"nom": "Old", "race": "Elfe", "classe": "Magicien", "niveau": 4},
            "features": [{"nom": "Arcane Recovery", "max": 1, "actuel": 0, "repos": "Long"}],
            "items": [],
            "spells_active": true,
            "spells": {"1": {"max": 4, "actuel": 2}, "2": {"max": 3, "actuel": 3}}
        });

        let character: Character = serde_json::from_value(record).unwrap();
        assert_eq!(character.hit_points, HitPoints::default());
        assert_eq!(character.hit_dice_used, 0);
        assert_eq!(character.class(), CharacterClass::Wizard);
        assert!(!character.features[0].linked_to_proficiency);
        assert_eq!(character.spell_slots.get(1), Some(&Counter::new(4, 2)));
        assert_eq!(character.spell_slots.get(9), Some(&Counter::default()));
    }

    #[test]
    fn test_unknown_class_falls_back() {
        let record = json!({
            "infos": {"nom": "Odd", "race": "Gnome", "classe": "Bricoleur", "niveau": 2}
        });
        let character: Character = serde_json::from_value(record).unwrap();
        assert_eq!(character.class(), CharacterClass::Fighter);
    }

    #[test]
    fn test_spell_slot_levels() {
        let mut slots = SpellSlots::new();
        assert!(slots.get(0).is_none());
        assert!(slots.get(10).is_none());
        slots.get_mut(3).unwrap().set_max(2);
        assert_eq!(slots.get(3).unwrap().max(), 2);
    }

    #[test]
    fn test_linked_feature_tracks_level() {
        let feature = Feature::linked("Channel Divinity", 9, FeatureRecharge::ShortRest);
        assert_eq!(feature.uses, Counter::full(4));
        assert!(feature.linked_to_proficiency);
    }

    #[test]
    fn test_hp_ratio() {
        let mut hp = HitPoints::new(20);
        hp.current = 5;
        assert_eq!(hp.ratio(), 0.25);
        hp.current = -3;
        assert_eq!(hp.ratio(), 0.0);
        hp.current = 40;
        assert_eq!(hp.ratio(), 1.0);
    }
}
