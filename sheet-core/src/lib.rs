//! D&D 5e character resource tracker.
//!
//! This crate provides:
//! - The character sheet model: identity, hit points, hit dice, features,
//!   items and spell slots
//! - Bounded counters and the rules for spending and regaining them
//! - Short and long rests
//! - A named collection of characters persisted to a two-column table
//!
//! # Quick Start
//!
//! ```ignore
//! use sheet_core::{CounterRef, Session, StoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = Session::from_config(&StoreConfig::new("party.json")).await;
//!
//!     session.create("Thorin").await?;
//!     session.spend(CounterRef::HitDice)?;
//!     session.long_rest()?;
//!
//!     session.save().await?;
//!     Ok(())
//! }
//! ```

pub mod character;
pub mod derived;
pub mod ledger;
pub mod persist;
pub mod repository;
pub mod rest;
pub mod session;
pub mod testing;

// Primary public API
pub use character::{
    Character, CharacterClass, DieType, EditError, Feature, FeatureRecharge, HitPoints, Identity,
    Item, ItemRecharge, SpellSlots,
};
pub use ledger::{Counter, CounterRef, Direction, ListKind, Pool};
pub use persist::{BackendError, FileStore, Row, RowStore, StoreConfig};
pub use repository::{Repository, RepositoryError};
pub use rest::{RestReport, RestType};
pub use session::{FeatureEdit, Session, SessionError, WorkingCopy};
