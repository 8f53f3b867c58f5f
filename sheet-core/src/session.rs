//! Session - the primary public API for a character sheet front-end.
//!
//! A session owns the repository and at most one working copy: a deep copy
//! of the selected character that edits go to until it is saved or
//! discarded. The session also tracks whether the working copy has unsaved
//! changes.

use crate::character::{
    Character, CharacterClass, EditError, Feature, FeatureRecharge, Item, ItemRecharge,
};
use crate::derived::{self, HP_CURRENT_RANGE, HP_MAX_RANGE, HP_TEMP_RANGE, LEVEL_RANGE, USES_RANGE};
use crate::ledger::{self, CounterRef, Direction, ListKind};
use crate::persist::{self, RowStore, StoreConfig};
use crate::repository::{Repository, RepositoryError};
use crate::rest::{RestReport, RestType};
use std::ops::RangeInclusive;
use std::sync::Arc;
use thiserror::Error;

/// Errors from Session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No character is loaded")]
    NoWorkingCopy,

    #[error("No character named \"{0}\"")]
    NotFound(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Edit(#[from] EditError),
}

/// Changes to apply to an existing feature. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct FeatureEdit {
    pub name: Option<String>,
    pub max: Option<u32>,
    pub recharge: Option<FeatureRecharge>,
    pub linked_to_proficiency: Option<bool>,
}

/// The character being edited.
#[derive(Debug, Clone)]
pub struct WorkingCopy {
    character: Character,
    /// Key the character is stored under, `None` if never stored.
    stored_name: Option<String>,
    dirty: bool,
}

impl WorkingCopy {
    pub fn character(&self) -> &Character {
        &self.character
    }

    pub fn stored_name(&self) -> Option<&str> {
        self.stored_name.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// A single user's editing session.
#[derive(Debug)]
pub struct Session {
    repository: Repository,
    working: Option<WorkingCopy>,
}

impl Session {
    pub fn new(repository: Repository) -> Self {
        Self {
            repository,
            working: None,
        }
    }

    /// Load the repository from `store` and start a session over it.
    pub async fn open(store: Option<Arc<dyn RowStore>>) -> Self {
        Self::new(Repository::load(store).await)
    }

    /// Start a session over the process-wide connection to the configured
    /// store. See [`persist::shared_store`].
    pub async fn from_config(config: &StoreConfig) -> Self {
        Self::open(persist::shared_store(config)).await
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Stored characters in listing order.
    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.repository.list()
    }

    pub fn working(&self) -> Option<&WorkingCopy> {
        self.working.as_ref()
    }

    /// The character being edited.
    pub fn character(&self) -> Option<&Character> {
        self.working.as_ref().map(|w| &w.character)
    }

    /// Whether the working copy has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.working.as_ref().is_some_and(|w| w.dirty)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create a character, save it, and open it for editing.
    ///
    /// A duplicate or empty name changes nothing. If the save fails the new
    /// character is still opened, marked dirty, and the error is returned so
    /// the user can retry.
    pub async fn create(&mut self, name: &str) -> Result<&Character, SessionError> {
        let character = self.repository.insert_new(name)?;
        let stored_name = character.name().to_string();
        let saved = self.repository.save_all().await;

        self.working = Some(WorkingCopy {
            character,
            stored_name: Some(stored_name),
            dirty: saved.is_err(),
        });
        saved?;
        self.character().ok_or(SessionError::NoWorkingCopy)
    }

    /// Open a stored character for editing.
    ///
    /// Any current working copy is replaced, saved or not; callers should
    /// confirm with the user first when [`Session::is_dirty`] is set.
    pub fn load(&mut self, name: &str) -> Result<&Character, SessionError> {
        let character = self
            .repository
            .get(name)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(name.to_string()))?;

        tracing::debug!(%name, "opened working copy");
        self.working = Some(WorkingCopy {
            character,
            stored_name: Some(name.to_string()),
            dirty: false,
        });
        self.character().ok_or(SessionError::NoWorkingCopy)
    }

    /// Drop the working copy without saving.
    pub fn discard(&mut self) -> Option<Character> {
        self.working.take().map(|w| w.character)
    }

    /// Save the working copy and persist the collection.
    ///
    /// Linked features are re-synced first. The dirty flag is cleared only
    /// when the store confirms the write. On failure the repository entry is
    /// rolled back and the working copy is kept as is so the save can be
    /// retried; a later save of another character will not write it.
    pub async fn save(&mut self) -> Result<(), SessionError> {
        let working = self.working.as_mut().ok_or(SessionError::NoWorkingCopy)?;

        if working.character.name().trim().is_empty() {
            return Err(EditError::EmptyName.into());
        }
        derived::sync_linked_features(&mut working.character);

        let name = working.character.name().to_string();
        let previous_key = working.stored_name.as_deref().unwrap_or(&name);
        let snapshot = self.repository.snapshot(previous_key);
        self.repository
            .put(working.character.clone(), working.stored_name.as_deref())?;

        match self.repository.save_all().await {
            Ok(()) => {
                working.stored_name = Some(name);
                working.dirty = false;
                tracing::info!(name = %working.character.name(), "saved character");
                Ok(())
            }
            Err(e) => {
                self.repository.restore(&name, snapshot);
                tracing::warn!(%name, error = %e, "save failed");
                Err(e.into())
            }
        }
    }

    /// Delete a stored character. Closes it first if it is the one being
    /// edited. Returns `Ok(false)` when there is no such character.
    pub async fn delete(&mut self, name: &str) -> Result<bool, SessionError> {
        if self
            .working
            .as_ref()
            .is_some_and(|w| w.stored_name.as_deref() == Some(name))
        {
            self.working = None;
        }
        Ok(self.repository.delete(name).await?)
    }

    // ========================================================================
    // Edits
    // ========================================================================

    /// Run an edit against the working copy, marking it dirty when the edit
    /// reports a change.
    fn edit<T>(
        &mut self,
        f: impl FnOnce(&mut Character) -> Result<(T, bool), EditError>,
    ) -> Result<T, SessionError> {
        let working = self.working.as_mut().ok_or(SessionError::NoWorkingCopy)?;
        let (value, changed) = f(&mut working.character)?;
        if changed {
            working.dirty = true;
        }
        Ok(value)
    }

    /// Move a counter by `delta`.
    ///
    /// Returns `Ok(false)` when the result would leave `[0, max]`; the request
    /// is then ignored and the working copy stays clean.
    pub fn adjust(&mut self, counter: CounterRef, delta: i32) -> Result<bool, SessionError> {
        self.edit(|c| {
            let applied = c.adjust_counter(counter, delta)?;
            Ok((applied, applied))
        })
    }

    /// Spend one use of a counter.
    pub fn spend(&mut self, counter: CounterRef) -> Result<bool, SessionError> {
        self.adjust(counter, -1)
    }

    /// Get one use of a counter back.
    pub fn regain(&mut self, counter: CounterRef) -> Result<bool, SessionError> {
        self.adjust(counter, 1)
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EditError::EmptyName.into());
        }
        self.edit(|c| Ok(((), replace(&mut c.identity.name, name.to_string()))))
    }

    pub fn set_race(&mut self, race: &str) -> Result<(), SessionError> {
        self.edit(|c| Ok(((), replace(&mut c.identity.race, race.trim().to_string()))))
    }

    pub fn set_class(&mut self, class: CharacterClass) -> Result<(), SessionError> {
        self.edit(|c| Ok(((), replace(&mut c.identity.class, class))))
    }

    /// Change the level. Spent hit dice above the new level are dropped.
    ///
    /// Linked features keep their old cap until the next save or long rest.
    pub fn set_level(&mut self, level: u32) -> Result<(), SessionError> {
        if !LEVEL_RANGE.contains(&level) {
            return Err(EditError::LevelOutOfRange(level).into());
        }
        self.edit(|c| {
            let changed = replace(&mut c.identity.level, level);
            c.hit_dice_used = c.hit_dice_used.min(level);
            Ok(((), changed))
        })
    }

    pub fn set_hp_max(&mut self, value: i32) -> Result<(), SessionError> {
        check_hp("max", value, HP_MAX_RANGE)?;
        self.edit(|c| Ok(((), replace(&mut c.hit_points.maximum, value))))
    }

    pub fn set_hp_current(&mut self, value: i32) -> Result<(), SessionError> {
        check_hp("current", value, HP_CURRENT_RANGE)?;
        self.edit(|c| Ok(((), replace(&mut c.hit_points.current, value))))
    }

    pub fn set_hp_temporary(&mut self, value: i32) -> Result<(), SessionError> {
        check_hp("temporary", value, HP_TEMP_RANGE)?;
        self.edit(|c| Ok(((), replace(&mut c.hit_points.temporary, value))))
    }

    /// Change how many slots a spell level has, keeping spent slots spent.
    pub fn set_spell_slot_max(&mut self, level: u8, max: u32) -> Result<(), SessionError> {
        if max > derived::MAX_SPELL_SLOTS {
            return Err(EditError::SpellSlotsOutOfRange(max).into());
        }
        self.edit(|c| {
            let slot = c
                .spell_slots
                .get_mut(level)
                .ok_or(EditError::SpellLevel(level))?;
            Ok(((), slot.set_max(max)))
        })
    }

    pub fn set_spells_active(&mut self, active: bool) -> Result<(), SessionError> {
        self.edit(|c| Ok(((), replace(&mut c.spells_active, active))))
    }

    /// Flip the spell table on or off. Returns the new state.
    pub fn toggle_spells_active(&mut self) -> Result<bool, SessionError> {
        self.edit(|c| {
            c.spells_active = !c.spells_active;
            Ok((c.spells_active, true))
        })
    }

    /// Move a feature or item one place up or down.
    pub fn reorder(
        &mut self,
        list: ListKind,
        index: usize,
        direction: Direction,
    ) -> Result<bool, SessionError> {
        self.edit(|c| {
            let moved = match list {
                ListKind::Features => ledger::reorder(&mut c.features, index, direction),
                ListKind::Items => ledger::reorder(&mut c.items, index, direction),
            };
            Ok((moved, moved))
        })
    }

    /// Apply a rest to the working copy. Confirmation is up to the caller.
    pub fn rest(&mut self, rest: RestType) -> Result<RestReport, SessionError> {
        self.edit(|c| Ok((crate::rest::apply_rest(c, rest), true)))
    }

    pub fn short_rest(&mut self) -> Result<RestReport, SessionError> {
        self.rest(RestType::Short)
    }

    pub fn long_rest(&mut self) -> Result<RestReport, SessionError> {
        self.rest(RestType::Long)
    }

    /// Append a feature with all uses available.
    ///
    /// A linked feature takes the proficiency bonus as its cap and `max` is
    /// ignored.
    pub fn add_feature(
        &mut self,
        name: &str,
        max: u32,
        recharge: FeatureRecharge,
        linked_to_proficiency: bool,
    ) -> Result<(), SessionError> {
        let name = non_empty(name)?;
        if !linked_to_proficiency {
            check_uses(max)?;
        }
        self.edit(|c| {
            let feature = if linked_to_proficiency {
                Feature::linked(name, c.level(), recharge)
            } else {
                Feature::new(name, max, recharge)
            };
            c.features.push(feature);
            Ok(((), true))
        })
    }

    /// Append an item with all charges available.
    pub fn add_item(&mut self, name: &str, max: u32, recharge: ItemRecharge) -> Result<(), SessionError> {
        let name = non_empty(name)?;
        check_uses(max)?;
        self.edit(|c| {
            c.items.push(Item::new(name, max, recharge));
            Ok(((), true))
        })
    }

    /// Change an existing feature.
    ///
    /// Linking a feature sets its cap to the proficiency bonus right away.
    /// Lowering a cap pulls the remaining uses down with it.
    pub fn edit_feature(&mut self, index: usize, changes: FeatureEdit) -> Result<(), SessionError> {
        let name = changes.name.as_deref().map(non_empty).transpose()?;
        self.edit(|c| {
            let bonus = c.proficiency_bonus();
            let feature = feature_mut(c, index)?;

            // A linked cap ignores `max`, so only an unlinked result checks it
            let linked = changes
                .linked_to_proficiency
                .unwrap_or(feature.linked_to_proficiency);
            if let (false, Some(max)) = (linked, changes.max) {
                check_uses(max)?;
            }

            let before = feature.clone();
            if let Some(name) = name {
                feature.name = name.to_string();
            }
            if let Some(recharge) = changes.recharge {
                feature.recharge = recharge;
            }
            feature.linked_to_proficiency = linked;
            if linked {
                feature.uses.set_max(bonus);
            } else if let Some(max) = changes.max {
                feature.uses.set_max(max);
            }

            let changed = *feature != before;
            Ok(((), changed))
        })
    }

    pub fn remove_feature(&mut self, index: usize) -> Result<Feature, SessionError> {
        self.edit(|c| {
            feature_mut(c, index)?;
            Ok((c.features.remove(index), true))
        })
    }

    pub fn remove_item(&mut self, index: usize) -> Result<Item, SessionError> {
        self.edit(|c| {
            let len = c.items.len();
            if index >= len {
                return Err(EditError::NoSuchEntry {
                    list: ListKind::Items,
                    index,
                    len,
                });
            }
            Ok((c.items.remove(index), true))
        })
    }
}

/// Assign `value`, returning whether it differed.
fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

fn non_empty(name: &str) -> Result<&str, EditError> {
    let name = name.trim();
    if name.is_empty() {
        Err(EditError::EmptyName)
    } else {
        Ok(name)
    }
}

fn check_uses(max: u32) -> Result<(), EditError> {
    if USES_RANGE.contains(&max) {
        Ok(())
    } else {
        Err(EditError::UsesOutOfRange(max))
    }
}

fn check_hp(field: &'static str, value: i32, range: RangeInclusive<i32>) -> Result<(), EditError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(EditError::HitPointsOutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

fn feature_mut(character: &mut Character, index: usize) -> Result<&mut Feature, EditError> {
    let len = character.features.len();
    character.features.get_mut(index).ok_or(EditError::NoSuchEntry {
        list: ListKind::Features,
        index,
        len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Counter;
    use crate::testing::{sample_cleric, FailingStore, MemoryStore};

    async fn session_with(characters: Vec<Character>) -> (Session, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let mut repository = Repository::load(Some(store.clone())).await;
        for character in characters {
            repository.put(character, None).unwrap();
        }
        (Session::new(repository), store)
    }

    #[tokio::test]
    async fn test_edits_require_working_copy() {
        let (mut session, _) = session_with(vec![]).await;
        assert!(matches!(
            session.spend(CounterRef::HitDice),
            Err(SessionError::NoWorkingCopy)
        ));
        assert!(matches!(session.save().await, Err(SessionError::NoWorkingCopy)));
    }

    #[tokio::test]
    async fn test_load_is_a_deep_copy() {
        let (mut session, _) = session_with(vec![sample_cleric("Mira")]).await;
        session.load("Mira").unwrap();
        session.spend(CounterRef::Feature(0)).unwrap();

        let stored = session.repository().get("Mira").unwrap();
        assert!(stored.features[0].uses.is_full());
        assert_eq!(session.character().unwrap().features[0].uses.current(), 2);
        assert!(session.is_dirty());
    }

    #[tokio::test]
    async fn test_rejected_adjust_stays_clean() {
        let (mut session, _) = session_with(vec![sample_cleric("Mira")]).await;
        session.load("Mira").unwrap();

        assert!(!session.regain(CounterRef::SpellSlot(1)).unwrap());
        assert!(!session.is_dirty());

        assert!(session.spend(CounterRef::SpellSlot(1)).unwrap());
        assert!(session.is_dirty());
    }

    #[tokio::test]
    async fn test_adjust_unknown_entry() {
        let (mut session, _) = session_with(vec![sample_cleric("Mira")]).await;
        session.load("Mira").unwrap();
        assert!(matches!(
            session.spend(CounterRef::Item(9)),
            Err(SessionError::Edit(EditError::NoSuchEntry { .. }))
        ));
        assert!(matches!(
            session.spend(CounterRef::SpellSlot(10)),
            Err(SessionError::Edit(EditError::SpellLevel(10)))
        ));
    }

    #[tokio::test]
    async fn test_hit_dice() {
        let (mut session, _) = session_with(vec![sample_cleric("Mira")]).await;
        session.load("Mira").unwrap();

        for _ in 0..5 {
            assert!(session.spend(CounterRef::HitDice).unwrap());
        }
        assert!(!session.spend(CounterRef::HitDice).unwrap());
        assert_eq!(session.character().unwrap().hit_dice_remaining(), 0);

        // Lowering the level pulls spent dice down with it
        session.set_level(2).unwrap();
        assert_eq!(session.character().unwrap().hit_dice_used, 2);
    }

    #[tokio::test]
    async fn test_save_clears_dirty_and_persists() {
        let (mut session, store) = session_with(vec![sample_cleric("Mira")]).await;
        session.load("Mira").unwrap();
        session.set_hp_current(-3).unwrap();
        session.save().await.unwrap();

        assert!(!session.is_dirty());
        let stored = store.rows().await[0].decode().unwrap();
        assert_eq!(stored.hit_points.current, -3);
    }

    #[tokio::test]
    async fn test_save_syncs_linked_features() {
        let (mut session, _) = session_with(vec![sample_cleric("Mira")]).await;
        session.load("Mira").unwrap();
        session.set_level(9).unwrap();

        // Stale until saved
        assert_eq!(session.character().unwrap().features[0].uses.max(), 3);
        session.save().await.unwrap();
        assert_eq!(
            session.character().unwrap().features[0].uses,
            Counter::new(4, 3)
        );
    }

    #[tokio::test]
    async fn test_save_with_failing_store_keeps_dirty() {
        let mut repository = Repository::load(Some(Arc::new(FailingStore))).await;
        repository.put(sample_cleric("Mira"), None).unwrap();
        let mut session = Session::new(repository);

        session.load("Mira").unwrap();
        session.long_rest().unwrap();
        let result = session.save().await;

        assert!(matches!(result, Err(SessionError::Repository(_))));
        assert!(session.is_dirty());
        assert!(session.character().is_some());
    }

    #[tokio::test]
    async fn test_save_renamed_character() {
        let (mut session, store) = session_with(vec![sample_cleric("Mira")]).await;
        session.load("Mira").unwrap();
        session.set_name("Mira Stonebrow").unwrap();
        session.save().await.unwrap();

        let names: Vec<_> = store.rows().await.into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Mira Stonebrow"]);

        // Saving again does not duplicate
        session.set_race("Naine").unwrap();
        session.save().await.unwrap();
        assert_eq!(store.rows().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_save_rolls_back_repository() {
        let mut repository = Repository::load(Some(Arc::new(FailingStore))).await;
        repository.put(sample_cleric("Mira"), None).unwrap();
        repository.put(sample_cleric("Oren"), None).unwrap();
        let mut session = Session::new(repository);

        session.load("Mira").unwrap();
        session.set_name("Mira Stonebrow").unwrap();
        session.set_level(9).unwrap();
        assert!(session.save().await.is_err());

        // The stored entry is untouched, the edits live only in the working copy
        let names: Vec<_> = session.repository().names().collect();
        assert_eq!(names, vec!["Mira", "Oren"]);
        assert_eq!(session.repository().get("Mira").unwrap().level(), 5);
        assert_eq!(session.working().unwrap().stored_name(), Some("Mira"));
        assert_eq!(session.character().unwrap().level(), 9);

        session.discard();
        assert_eq!(session.repository().get("Mira").unwrap().level(), 5);
    }

    #[tokio::test]
    async fn test_create_opens_clean_copy() {
        let (mut session, store) = session_with(vec![]).await;
        let character = session.create("Nouveau").await.unwrap();
        assert_eq!(character.level(), 1);
        assert!(!session.is_dirty());
        assert_eq!(store.writes().await, 1);

        assert!(matches!(
            session.create("Nouveau").await,
            Err(SessionError::Repository(RepositoryError::DuplicateName(_)))
        ));
    }

    #[tokio::test]
    async fn test_create_without_store_is_dirty() {
        let mut session = Session::new(Repository::in_memory());
        assert!(session.create("Offline").await.is_err());
        assert!(session.is_dirty());
        assert_eq!(session.character().unwrap().name(), "Offline");
    }

    #[tokio::test]
    async fn test_delete_closes_working_copy() {
        let (mut session, _) = session_with(vec![sample_cleric("Mira")]).await;
        session.load("Mira").unwrap();
        assert!(session.delete("Mira").await.unwrap());
        assert!(session.character().is_none());
        assert!(!session.delete("Mira").await.unwrap());
    }

    #[tokio::test]
    async fn test_discard() {
        let (mut session, _) = session_with(vec![sample_cleric("Mira")]).await;
        session.load("Mira").unwrap();
        session.set_class(CharacterClass::Paladin).unwrap();
        let discarded = session.discard().unwrap();
        assert_eq!(discarded.class(), CharacterClass::Paladin);
        assert!(!session.is_dirty());
        assert_eq!(
            session.repository().get("Mira").unwrap().class(),
            CharacterClass::Cleric
        );
    }

    #[tokio::test]
    async fn test_setter_ranges() {
        let (mut session, _) = session_with(vec![sample_cleric("Mira")]).await;
        session.load("Mira").unwrap();

        assert!(session.set_level(0).is_err());
        assert!(session.set_level(21).is_err());
        assert!(session.set_hp_max(0).is_err());
        assert!(session.set_hp_temporary(-1).is_err());
        assert!(session.set_hp_current(-1000).is_err());
        assert!(session.set_spell_slot_max(1, 5).is_err());
        assert!(session.set_name("  ").is_err());
        assert!(!session.is_dirty());

        // Same value is not a change
        session.set_level(5).unwrap();
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn test_spell_slot_max_clamps_current() {
        let (mut session, _) = session_with(vec![sample_cleric("Mira")]).await;
        session.load("Mira").unwrap();
        session.set_spell_slot_max(1, 2).unwrap();
        assert_eq!(
            session.character().unwrap().spell_slots.get(1),
            Some(&Counter::full(2))
        );
    }

    #[tokio::test]
    async fn test_add_edit_remove_features() {
        let (mut session, _) = session_with(vec![sample_cleric("Mira")]).await;
        session.load("Mira").unwrap();

        session
            .add_feature("Harness Divine Power", 9, FeatureRecharge::LongRest, true)
            .unwrap();
        let added = &session.character().unwrap().features[2];
        assert_eq!(added.uses, Counter::full(3));

        assert!(session
            .add_feature("Too Many", 51, FeatureRecharge::LongRest, false)
            .is_err());
        assert!(session.add_feature("", 1, FeatureRecharge::LongRest, false).is_err());

        // Unlink and lower the cap
        session
            .edit_feature(
                2,
                FeatureEdit {
                    max: Some(1),
                    linked_to_proficiency: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        let edited = &session.character().unwrap().features[2];
        assert_eq!(edited.uses, Counter::full(1));
        assert!(!edited.linked_to_proficiency);

        // Linking ignores a stale cap that would be out of range on its own
        session
            .edit_feature(
                1,
                FeatureEdit {
                    max: Some(0),
                    linked_to_proficiency: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(session.character().unwrap().features[1].uses.max(), 3);

        // The same cap on an unlinked result is rejected and nothing changes
        let before = session.character().unwrap().features[2].clone();
        assert!(matches!(
            session.edit_feature(
                2,
                FeatureEdit {
                    name: Some("Renamed".to_string()),
                    max: Some(0),
                    ..Default::default()
                },
            ),
            Err(SessionError::Edit(EditError::UsesOutOfRange(0)))
        ));
        assert_eq!(session.character().unwrap().features[2], before);

        let removed = session.remove_feature(0).unwrap();
        assert_eq!(removed.name, "Channel Divinity");
        assert!(session.remove_feature(5).is_err());
        assert_eq!(session.character().unwrap().features.len(), 2);
    }

    #[tokio::test]
    async fn test_items_and_reorder() {
        let (mut session, _) = session_with(vec![sample_cleric("Mira")]).await;
        session.load("Mira").unwrap();

        session.add_item("Rope", 1, ItemRecharge::Never).unwrap();
        assert!(session.reorder(ListKind::Items, 1, Direction::Up).unwrap());
        assert!(!session.reorder(ListKind::Items, 0, Direction::Up).unwrap());

        let names: Vec<_> = session
            .character()
            .unwrap()
            .items
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(names, vec!["Rope", "Wand of Cure Wounds"]);

        let removed = session.remove_item(0).unwrap();
        assert_eq!(removed.name, "Rope");
        assert!(session.remove_item(3).is_err());
    }

    #[tokio::test]
    async fn test_toggle_spells() {
        let (mut session, _) = session_with(vec![sample_cleric("Mira")]).await;
        session.load("Mira").unwrap();
        assert!(!session.toggle_spells_active().unwrap());
        assert!(session.is_dirty());
    }
}
