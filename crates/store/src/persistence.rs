//! Durable storage of the refill request.
//!
//! The request lives in a single JSON record keyed by [`STORE_KEY`]. Other
//! features keep their own fields (volatility, cooldowns, ...) in the same
//! record, so writes merge the request fields into whatever is already there.

use crate::{RefillRequest, StoreError};
use serde_json::{Map, Value};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::{debug, warn};

/// Key of the persisted record.
pub const STORE_KEY: &str = "faucet-storage";

/// Storage backend for the phase store.
pub trait Persistence: Send + Sync {
    /// Load the persisted request, `None` when nothing was stored yet.
    fn load(&self) -> Result<Option<RefillRequest>, StoreError>;

    /// Persist the request, keeping neighbouring fields of the record.
    fn save(&self, request: &RefillRequest) -> Result<(), StoreError>;
}

fn extract(document: &Value) -> Result<Option<RefillRequest>, StoreError> {
    let Some(record) = document.get(STORE_KEY) else {
        return Ok(None);
    };

    if !record.is_object() {
        return Err(StoreError::Corrupt(format!("{STORE_KEY} is not an object")));
    }

    let request = serde_json::from_value(record.clone())?;
    Ok(Some(request))
}

fn merge_into(document: &mut Value, request: &RefillRequest) -> Result<(), StoreError> {
    let Value::Object(fields) = serde_json::to_value(request)? else {
        return Err(StoreError::Corrupt("request did not serialize to an object".into()));
    };

    if !document.is_object() {
        *document = Value::Object(Map::new());
    }
    let root = document
        .as_object_mut()
        .ok_or_else(|| StoreError::Corrupt("document is not an object".into()))?;

    let record = root
        .entry(STORE_KEY)
        .or_insert_with(|| Value::Object(Map::new()));
    if !record.is_object() {
        *record = Value::Object(Map::new());
    }

    if let Value::Object(record) = record {
        for (key, value) in fields {
            record.insert(key, value);
        }
    }

    Ok(())
}

/// JSON file backed persistence.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Option<Value>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(None),
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl Persistence for JsonFilePersistence {
    fn load(&self) -> Result<Option<RefillRequest>, StoreError> {
        let Some(document) = self.read_document()? else {
            debug!(path = %self.path.display(), "No persisted refill state");
            return Ok(None);
        };

        extract(&document)
    }

    fn save(&self, request: &RefillRequest) -> Result<(), StoreError> {
        let mut document = match self.read_document() {
            Ok(document) => document.unwrap_or_else(|| Value::Object(Map::new())),
            Err(StoreError::Serde(e)) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Persisted state is unreadable, starting a new document"
                );
                Value::Object(Map::new())
            }
            Err(e) => return Err(e),
        };

        merge_into(&mut document, request)?;

        // write then rename so a crash never leaves a truncated file
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&document)?)?;
        fs::rename(&tmp, &self.path)?;

        Ok(())
    }
}

/// In-memory persistence holding the same JSON document a file would.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    document: Mutex<Value>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::with_document(Value::Object(Map::new()))
    }

    /// Start from an existing document, as if it had been read from disk.
    pub const fn with_document(document: Value) -> Self {
        Self {
            document: Mutex::new(document),
        }
    }

    /// Snapshot of the stored document.
    pub fn document(&self) -> Value {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Value> {
        self.document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Persistence for MemoryPersistence {
    fn load(&self) -> Result<Option<RefillRequest>, StoreError> {
        extract(&self.lock())
    }

    fn save(&self, request: &RefillRequest) -> Result<(), StoreError> {
        merge_into(&mut self.lock(), request)
    }
}
