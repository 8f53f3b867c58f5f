//! The named collection of characters.
//!
//! The repository keeps every character in memory, keyed by name in
//! insertion order, and mirrors the whole collection to the backing store on
//! each write. Without a store it keeps working in memory only.

use crate::character::Character;
use crate::derived;
use crate::persist::{BackendError, Row, RowStore};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("A character named \"{0}\" already exists")]
    DuplicateName(String),

    #[error("Character name cannot be empty")]
    EmptyName,

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// An entry as it was before a [`Repository::put`], kept so a failed save
/// can be rolled back.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    index: usize,
    name: String,
    character: Character,
}

/// All characters, keyed by name.
pub struct Repository {
    store: Option<Arc<dyn RowStore>>,
    characters: IndexMap<String, Character>,
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("connected", &self.store.is_some())
            .field("characters", &self.characters.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Repository {
    /// An empty repository with no backing store.
    pub fn in_memory() -> Self {
        Self {
            store: None,
            characters: IndexMap::new(),
        }
    }

    /// Load every character from the store.
    ///
    /// Never fails: an unreachable or absent store gives an empty collection,
    /// and rows that cannot be decoded are skipped.
    pub async fn load(store: Option<Arc<dyn RowStore>>) -> Self {
        let mut repository = Self {
            store,
            characters: IndexMap::new(),
        };
        if let Err(e) = repository.reload().await {
            tracing::warn!(error = %e, "could not load characters, starting empty");
        }
        repository
    }

    /// Like [`Repository::load`], but reports a missing or failing store.
    pub async fn load_checked(store: Option<Arc<dyn RowStore>>) -> Result<Self, BackendError> {
        let mut repository = Self {
            store,
            characters: IndexMap::new(),
        };
        repository.reload().await?;
        Ok(repository)
    }

    /// Replace the in-memory collection with the store's contents.
    ///
    /// On error the collection is left as it was. Returns the number of
    /// characters loaded.
    pub async fn reload(&mut self) -> Result<usize, BackendError> {
        let store = self.store.as_ref().ok_or(BackendError::Unavailable)?;
        let rows = store.read_all_rows().await?;

        let mut characters = IndexMap::with_capacity(rows.len());
        for row in rows {
            match row.decode() {
                Ok(character) => {
                    characters.insert(row.name, character);
                }
                Err(e) => {
                    tracing::warn!(name = %row.name, error = %e, "skipping unreadable character record");
                }
            }
        }

        tracing::info!(count = characters.len(), "loaded characters");
        self.characters = characters;
        Ok(self.characters.len())
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_some()
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.characters.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Character> {
        self.characters.get(name)
    }

    /// Characters in listing order.
    pub fn list(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    /// Character names in listing order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.characters.keys().map(String::as_str)
    }

    /// Add a template character without persisting it.
    pub fn insert_new(&mut self, name: &str) -> Result<Character, RepositoryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RepositoryError::EmptyName);
        }
        if self.contains(name) {
            return Err(RepositoryError::DuplicateName(name.to_string()));
        }

        let character = Character::new(name);
        self.characters.insert(name.to_string(), character.clone());
        tracing::debug!(%name, "created character");
        Ok(character)
    }

    /// Add a template character and persist the collection.
    ///
    /// If persisting fails the character stays in memory and the error is
    /// returned; a later successful [`Repository::save_all`] writes it out.
    pub async fn create(&mut self, name: &str) -> Result<Character, RepositoryError> {
        let character = self.insert_new(name)?;
        self.save_all().await?;
        Ok(character)
    }

    /// Store a character under its current name.
    ///
    /// `previous_name` is the key it was loaded from. When the character was
    /// renamed the old key is replaced in place, keeping its listing position.
    /// Renaming onto another existing character is refused.
    pub fn put(
        &mut self,
        character: Character,
        previous_name: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let name = character.name().to_string();
        if name.trim().is_empty() {
            return Err(RepositoryError::EmptyName);
        }

        match previous_name {
            Some(old) if old != name => {
                if self.contains(&name) {
                    return Err(RepositoryError::DuplicateName(name));
                }
                match self.characters.get_index_of(old) {
                    Some(index) => {
                        self.characters.shift_remove_index(index);
                        self.characters.shift_insert(index, name, character);
                    }
                    None => {
                        self.characters.insert(name, character);
                    }
                }
            }
            _ => {
                self.characters.insert(name, character);
            }
        }
        Ok(())
    }

    /// Capture the entry stored under `name` with its listing position.
    pub(crate) fn snapshot(&self, name: &str) -> Option<Snapshot> {
        self.characters
            .get_full(name)
            .map(|(index, name, character)| Snapshot {
                index,
                name: name.clone(),
                character: character.clone(),
            })
    }

    /// Drop the entry under `current_name` and put `snapshot` back where it
    /// was. Undoes a [`Repository::put`] whose save did not go through.
    pub(crate) fn restore(&mut self, current_name: &str, snapshot: Option<Snapshot>) {
        self.characters.shift_remove(current_name);
        if let Some(snapshot) = snapshot {
            let index = snapshot.index.min(self.characters.len());
            self.characters
                .shift_insert(index, snapshot.name, snapshot.character);
        }
    }

    /// Remove a character and persist the removal.
    ///
    /// Returns `Ok(false)` without touching the store when there is no such
    /// character.
    pub async fn delete(&mut self, name: &str) -> Result<bool, RepositoryError> {
        if self.characters.shift_remove(name).is_none() {
            return Ok(false);
        }
        tracing::debug!(%name, "deleted character");
        self.save_all().await?;
        Ok(true)
    }

    /// Write the whole collection to the store.
    ///
    /// Linked features are re-synced to each character's proficiency bonus
    /// first, so stored records always satisfy that invariant.
    pub async fn save_all(&mut self) -> Result<(), RepositoryError> {
        for character in self.characters.values_mut() {
            derived::sync_linked_features(character);
        }

        let store = self.store.as_ref().ok_or(BackendError::Unavailable)?;
        let rows = self
            .characters
            .iter()
            .map(|(name, character)| Row::encode(name.as_str(), character))
            .collect::<Result<Vec<_>, _>>()?;

        store.write_all_rows(&rows).await?;
        tracing::info!(count = rows.len(), "saved characters");
        Ok(())
    }
}
