//! In-memory store for image previews.
//!
//! Previews are the session-scoped analogue of browser object URLs: each one
//! is addressed by a ref of the form `preview://{document_id}` and lives until
//! its owning document is removed.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

const PREFIX: &str = "preview://";

/// Image bytes plus the media type they were uploaded with.
#[derive(Debug, Clone)]
pub struct Preview {
    pub media_type: String,
    pub data: Arc<[u8]>,
}

#[derive(Debug, Clone, Default)]
pub struct PreviewStore {
    inner: Arc<RwLock<HashMap<String, Preview>>>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a preview for a document, returns the preview ref.
    pub fn store(&self, document_id: &str, media_type: &str, data: Arc<[u8]>) -> String {
        let size = data.len();
        let mut store = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        store.insert(
            document_id.to_string(),
            Preview {
                media_type: media_type.to_string(),
                data,
            },
        );
        tracing::debug!("PreviewStore: stored '{}' ({} bytes)", document_id, size);
        format!("{}{}", PREFIX, document_id)
    }

    pub fn get(&self, preview_ref: &str) -> Option<Preview> {
        let document_id = preview_ref.strip_prefix(PREFIX)?;
        let store = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        store.get(document_id).cloned()
    }

    /// Release a preview. Returns true if it existed.
    pub fn release(&self, preview_ref: &str) -> bool {
        let Some(document_id) = preview_ref.strip_prefix(PREFIX) else {
            return false;
        };
        let mut store = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let released = store.remove(document_id).is_some();
        if released {
            tracing::debug!("PreviewStore: released '{}'", document_id);
        }
        released
    }

    /// Number of live previews.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
