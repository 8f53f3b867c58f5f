//! Character persistence.
//!
//! The backing store is a two-column table: a header row, then one row per
//! character holding its name and its JSON record. Stores are reached through
//! the [`RowStore`] port and always rewritten as a whole.

use crate::character::Character;
use crate::derived;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::fs;

/// Errors from the backing store.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("No backing store is connected")]
    Unavailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Header row written above the character rows.
pub const HEADER: [&str; 2] = ["NOM_PERSO", "DATA_JSON"];

/// Environment variable naming the table file.
pub const STORE_PATH_VAR: &str = "SHEET_STORE_PATH";

/// One stored character: its name and its encoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub name: String,
    pub json: String,
}

impl Row {
    /// Encode a character as a row keyed by `name`.
    pub fn encode(name: impl Into<String>, character: &Character) -> Result<Self, BackendError> {
        Ok(Self {
            name: name.into(),
            json: serde_json::to_string(character)?,
        })
    }

    /// Decode the row's record, patching legacy or out-of-range values.
    pub fn decode(&self) -> Result<Character, serde_json::Error> {
        let mut character: Character = serde_json::from_str(&self.json)?;
        derived::repair(&mut character);
        Ok(character)
    }
}

/// Port to whatever holds the character table.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// All character rows, without the header.
    async fn read_all_rows(&self) -> Result<Vec<Row>, BackendError>;

    /// Replace the whole table with the header and `rows`.
    async fn write_all_rows(&self, rows: &[Row]) -> Result<(), BackendError>;
}

// ============================================================================
// File Store
// ============================================================================

/// A table kept as a JSON array of string rows in a single file.
///
/// Writes go to a sibling temp file that is then renamed over the table, so
/// a reader never sees half a table.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl RowStore for FileStore {
    async fn read_all_rows(&self) -> Result<Vec<Row>, BackendError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            // Nothing saved yet
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let table: Vec<Vec<String>> = serde_json::from_str(&content)?;
        Ok(table
            .into_iter()
            .skip(1)
            .filter_map(|row| {
                let mut cells = row.into_iter();
                match (cells.next(), cells.next()) {
                    (Some(name), Some(json)) => Some(Row { name, json }),
                    _ => None,
                }
            })
            .collect())
    }

    async fn write_all_rows(&self, rows: &[Row]) -> Result<(), BackendError> {
        let mut table = Vec::with_capacity(rows.len() + 1);
        table.push(vec![HEADER[0], HEADER[1]]);
        table.extend(rows.iter().map(|r| vec![r.name.as_str(), r.json.as_str()]));

        let content = serde_json::to_string_pretty(&table)?;
        let temp = self.temp_path();
        fs::write(&temp, content).await?;
        fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}

// ============================================================================
// Connection
// ============================================================================

/// Where the backing store lives.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// Path of the table file. `None` runs without a backing store.
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// A configuration with no backing store.
    pub fn memory_only() -> Self {
        Self::default()
    }

    /// Read the store location from `SHEET_STORE_PATH`.
    pub fn from_env() -> Self {
        Self {
            path: std::env::var_os(STORE_PATH_VAR)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        }
    }
}

/// Open the configured store.
///
/// Returns `None` when no store is configured or its directory does not
/// exist. Callers then run in memory only: loads come back empty and saves
/// report [`BackendError::Unavailable`].
pub fn connect(config: &StoreConfig) -> Option<Arc<dyn RowStore>> {
    let Some(path) = config.path.as_ref() else {
        tracing::warn!("no backing store configured, running in memory only");
        return None;
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    if !dir.is_dir() {
        tracing::warn!(path = %path.display(), "store directory missing, running in memory only");
        return None;
    }

    tracing::info!(path = %path.display(), "connected to backing store");
    Some(Arc::new(FileStore::new(path.clone())))
}

static SHARED_STORES: Lazy<Mutex<HashMap<PathBuf, Arc<dyn RowStore>>>> =
    Lazy::new(Default::default);

/// The process-wide connection to the configured store.
///
/// The first call for a table path connects; later calls for the same path
/// return that same connection. Failed connections are not cached, so a
/// store directory created later is picked up.
pub fn shared_store(config: &StoreConfig) -> Option<Arc<dyn RowStore>> {
    let Some(path) = config.path.as_ref() else {
        return connect(config);
    };

    let mut stores = SHARED_STORES.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(store) = stores.get(path) {
        return Some(Arc::clone(store));
    }
    let store = connect(config)?;
    stores.insert(path.clone(), Arc::clone(&store));
    Some(store)
}
