//! Testing utilities.
//!
//! This module provides tools for tests that need a backing store or a
//! populated character:
//! - `MemoryStore` keeps the table in memory and counts writes
//! - `FailingStore` fails every call, for exercising error paths
//! - sample characters with features, items and spell slots

use crate::character::{
    Character, CharacterClass, Feature, FeatureRecharge, HitPoints, Item, ItemRecharge,
};
use crate::persist::{BackendError, Row, RowStore};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// A row store held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Row>>,
    writes: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-filled with `rows`.
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows: Mutex::new(rows),
            writes: Mutex::new(0),
        }
    }

    /// Snapshot of the stored rows.
    pub async fn rows(&self) -> Vec<Row> {
        self.rows.lock().await.clone()
    }

    /// Number of completed `write_all_rows` calls.
    pub async fn writes(&self) -> usize {
        *self.writes.lock().await
    }
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn read_all_rows(&self) -> Result<Vec<Row>, BackendError> {
        Ok(self.rows().await)
    }

    async fn write_all_rows(&self, rows: &[Row]) -> Result<(), BackendError> {
        *self.rows.lock().await = rows.to_vec();
        *self.writes.lock().await += 1;
        Ok(())
    }
}

/// A row store whose every call fails with a transport error.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingStore;

#[async_trait]
impl RowStore for FailingStore {
    async fn read_all_rows(&self) -> Result<Vec<Row>, BackendError> {
        Err(BackendError::Transport("connection refused".to_string()))
    }

    async fn write_all_rows(&self, _rows: &[Row]) -> Result<(), BackendError> {
        Err(BackendError::Transport("connection refused".to_string()))
    }
}

/// A level 3 fighter with short-rest features and a couple of items.
pub fn sample_fighter(name: &str) -> Character {
    let mut character = Character::new(name);
    character.identity.level = 3;
    character.hit_points = HitPoints::new(28);
    character
        .features
        .push(Feature::new("Second Wind", 1, FeatureRecharge::ShortRest));
    character
        .features
        .push(Feature::new("Action Surge", 1, FeatureRecharge::ShortRest));
    character
        .items
        .push(Item::new("Potion of Healing", 2, ItemRecharge::Never));
    character
        .items
        .push(Item::new("Horn of Blasting", 1, ItemRecharge::LongRest));
    character
}

/// A level 5 cleric with a linked feature and spell slots.
pub fn sample_cleric(name: &str) -> Character {
    let mut character = Character::new(name);
    character.identity.race = "Nain".to_string();
    character.identity.class = CharacterClass::Cleric;
    character.identity.level = 5;
    character.hit_points = HitPoints::new(38);
    character.spells_active = true;
    character
        .features
        .push(Feature::linked("Channel Divinity", 5, FeatureRecharge::ShortRest));
    character
        .features
        .push(Feature::new("Divine Intervention", 1, FeatureRecharge::LongRest));
    character
        .items
        .push(Item::new("Wand of Cure Wounds", 3, ItemRecharge::LongRest));
    for (level, max) in [(1, 4), (2, 3), (3, 2)] {
        if let Some(slot) = character.spell_slots.get_mut(level) {
            slot.set_max(max);
            slot.refill();
        }
    }
    character
}
