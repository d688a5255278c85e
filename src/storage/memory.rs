// In-memory store used by handler tests

use std::sync::{Mutex, PoisonError};

use super::{StoreDocument, StoreError, UrlStore};

#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<StoreDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: StoreDocument) -> Self {
        Self {
            document: Mutex::new(document),
        }
    }

    /// Copy of the currently stored document
    pub fn snapshot(&self) -> StoreDocument {
        self.read()
    }
}

impl UrlStore for MemoryStore {
    fn read(&self) -> StoreDocument {
        self.document
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn write(&self, document: &StoreDocument) -> Result<(), StoreError> {
        *self
            .document
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = document.clone();
        Ok(())
    }
}
