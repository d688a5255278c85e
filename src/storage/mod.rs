//! URL list persistence
//!
//! The whole mapping lives in one JSON object whose keys are
//! `tweets_<date>` and whose values are the submitted URL arrays.
//! Every read loads the document fresh; every update rewrites it in full.

mod file;
#[cfg(test)]
mod memory;

pub use file::FileStore;
#[cfg(test)]
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use thiserror::Error;

/// Prefix joined with the date to form a storage key
pub const KEY_PREFIX: &str = "tweets_";

/// Derive the storage key for a validated date
pub fn storage_key(date: &str) -> String {
    format!("{KEY_PREFIX}{date}")
}

/// Errors surfaced by store writes
///
/// Reads never fail; see [`FileStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to serialize store document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The persisted date-to-URLs mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreDocument(Map<String, Value>);

impl StoreDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from parsed JSON; anything but an object is empty
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    /// URLs stored for `date`, in submission order
    pub fn urls(&self, date: &str) -> Vec<Value> {
        match self.0.get(&storage_key(date)) {
            Some(Value::Array(urls)) => urls.clone(),
            _ => Vec::new(),
        }
    }

    /// Replace the URLs stored for `date`
    pub fn set_urls(&mut self, date: &str, urls: Vec<Value>) {
        self.0.insert(storage_key(date), Value::Array(urls));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Whole-document persistence for the URL mapping
pub trait UrlStore: Send + Sync {
    /// Load the full mapping; failures yield an empty document
    fn read(&self) -> StoreDocument;

    /// Overwrite the persisted mapping with `document`
    fn write(&self, document: &StoreDocument) -> Result<(), StoreError>;
}
