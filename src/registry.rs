//! Document registry: the session's ordered list of uploaded documents.
//!
//! Entries are kept newest-first. All mutation goes through id-keyed
//! operations, each of which is a single write-lock critical section, so
//! concurrent updates for different ids never interfere.

use crate::preview_store::PreviewStore;
use crate::schema::ExtractedData;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Opaque unique document identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn generate() -> Self {
        Self(format!("doc_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Original upload: name, declared media type and raw bytes.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub media_type: String,
    pub data: Arc<[u8]>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Lifecycle status. Result payloads live inside the variant, so data is
/// present only on success and a message only on error.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentStatus {
    Idle,
    Processing,
    Success(ExtractedData),
    Error(String),
}

impl DocumentStatus {
    pub fn kind(&self) -> StatusKind {
        match self {
            Self::Idle => StatusKind::Idle,
            Self::Processing => StatusKind::Processing,
            Self::Success(_) => StatusKind::Success,
            Self::Error(_) => StatusKind::Error,
        }
    }
}

/// Payload-free status tag, as exposed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Idle,
    Processing,
    Success,
    Error,
}

impl StatusKind {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }

    /// Badge text shown next to a row.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Pending",
            Self::Processing => "Processing",
            Self::Success => "Success",
            Self::Error => "Failed",
        }
    }
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// One tracked document.
#[derive(Debug, Clone)]
pub struct DocumentEntry {
    pub id: DocumentId,
    pub source: SourceFile,
    /// `preview://` ref, only for image uploads.
    pub preview_ref: Option<String>,
    pub status: DocumentStatus,
}

impl DocumentEntry {
    pub fn extracted_data(&self) -> Option<&ExtractedData> {
        match &self.status {
            DocumentStatus::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            DocumentStatus::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// A requested status change.
#[derive(Debug, Clone)]
pub enum Transition {
    Start,
    Succeed(ExtractedData),
    Fail(String),
}

impl Transition {
    fn target(&self) -> StatusKind {
        match self {
            Self::Start => StatusKind::Processing,
            Self::Succeed(_) => StatusKind::Success,
            Self::Fail(_) => StatusKind::Error,
        }
    }

    fn into_status(self) -> DocumentStatus {
        match self {
            Self::Start => DocumentStatus::Processing,
            Self::Succeed(data) => DocumentStatus::Success(data),
            Self::Fail(message) => DocumentStatus::Error(message),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("document not found: {0}")]
    NotFound(DocumentId),
    #[error("invalid transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: DocumentId,
        from: StatusKind,
        to: StatusKind,
    },
}

/// Session-owned document registry. Cloning yields another handle to the
/// same state.
#[derive(Debug, Clone)]
pub struct Registry {
    entries: Arc<RwLock<VecDeque<DocumentEntry>>>,
    previews: PreviewStore,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::new())),
            previews: PreviewStore::new(),
        }
    }

    pub fn previews(&self) -> &PreviewStore {
        &self.previews
    }

    /// Register a new upload in `idle` status, newest-first.
    ///
    /// Each call goes to the front, so files added in one batch end up in
    /// reverse upload order.
    pub fn add(&self, source: SourceFile) -> DocumentId {
        let id = DocumentId::generate();
        let preview_ref = source
            .is_image()
            .then(|| self.previews.store(id.as_str(), &source.media_type, source.data.clone()));

        info!(
            "Registered {} ({}, {} bytes) as {}",
            source.name,
            source.media_type,
            source.size(),
            id
        );

        let entry = DocumentEntry {
            id: id.clone(),
            source,
            preview_ref,
            status: DocumentStatus::Idle,
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push_front(entry);
        id
    }

    /// Apply a status transition to the entry with `id`.
    ///
    /// Only `idle -> processing -> {success | error}` is allowed. A missing id
    /// yields `NotFound` and leaves the registry untouched.
    pub fn update_status(&self, id: &DocumentId, transition: Transition) -> Result<(), RegistryError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries
            .iter_mut()
            .find(|e| &e.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;

        let from = entry.status.kind();
        let to = transition.target();
        let allowed = match from {
            StatusKind::Idle => to == StatusKind::Processing,
            StatusKind::Processing => to.is_terminal(),
            StatusKind::Success | StatusKind::Error => false,
        };
        if !allowed {
            return Err(RegistryError::InvalidTransition {
                id: id.clone(),
                from,
                to,
            });
        }

        entry.status = transition.into_status();
        debug!("{}: {} -> {}", id, from, to);
        Ok(())
    }

    /// Remove the entry with `id` and release its preview. Returns true if it
    /// existed.
    pub fn remove(&self, id: &DocumentId) -> bool {
        let removed = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            entries
                .iter()
                .position(|e| &e.id == id)
                .and_then(|pos| entries.remove(pos))
        };

        match removed {
            Some(entry) => {
                if let Some(preview_ref) = &entry.preview_ref {
                    self.previews.release(preview_ref);
                }
                info!("Removed {} ({} previews live)", id, self.previews.len());
                true
            }
            None => false,
        }
    }

    /// Newest-first snapshot.
    pub fn list(&self) -> Vec<DocumentEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &DocumentId) -> Option<DocumentEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|e| &e.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::schema::TransactionCategory;

    pub(crate) fn sample_data(vendor: &str, amount: f64, category: TransactionCategory) -> ExtractedData {
        ExtractedData {
            transaction_date: "2024-01-01".to_string(),
            amount,
            currency_code: "USD".to_string(),
            description: "Coffee".to_string(),
            vendor_name: vendor.to_string(),
            invoice_number: "N/A".to_string(),
            category,
            confidence_score: 90.0,
        }
    }

    fn pdf(name: &str) -> SourceFile {
        SourceFile::new(name, "application/pdf", b"%PDF-1.4".to_vec())
    }

    fn jpeg(name: &str) -> SourceFile {
        SourceFile::new(name, "image/jpeg", vec![0xFF, 0xD8, 0xFF])
    }

    #[test]
    fn test_list_is_newest_first() {
        let registry = Registry::new();
        let a = registry.add(pdf("a.pdf"));
        let b = registry.add(jpeg("b.jpg"));
        let c = registry.add(pdf("c.pdf"));

        let ids: Vec<DocumentId> = registry.list().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![c, b, a]);
    }

    #[test]
    fn test_ids_unique() {
        let registry = Registry::new();
        let a = registry.add(pdf("same.pdf"));
        let b = registry.add(pdf("same.pdf"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_preview_only_for_images() {
        let registry = Registry::new();
        let p = registry.add(pdf("a.pdf"));
        let j = registry.add(jpeg("b.jpg"));

        assert!(registry.get(&p).unwrap().preview_ref.is_none());
        let preview_ref = registry.get(&j).unwrap().preview_ref.unwrap();
        assert_eq!(registry.previews().get(&preview_ref).unwrap().media_type, "image/jpeg");
    }

    #[test]
    fn test_full_lifecycle() {
        let registry = Registry::new();
        let id = registry.add(jpeg("r.jpg"));
        assert_eq!(registry.get(&id).unwrap().status, DocumentStatus::Idle);

        registry.update_status(&id, Transition::Start).unwrap();
        assert_eq!(registry.get(&id).unwrap().status.kind(), StatusKind::Processing);

        let data = sample_data("Cafe", 42.5, TransactionCategory::Expense);
        registry.update_status(&id, Transition::Succeed(data.clone())).unwrap();
        let entry = registry.get(&id).unwrap();
        assert_eq!(entry.extracted_data(), Some(&data));
        assert!(entry.error_message().is_none());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let registry = Registry::new();
        let id = registry.add(pdf("x.pdf"));
        registry.update_status(&id, Transition::Start).unwrap();
        registry.update_status(&id, Transition::Fail("Extraction failed".into())).unwrap();

        for transition in [
            Transition::Start,
            Transition::Fail("again".into()),
            Transition::Succeed(sample_data("v", 1.0, TransactionCategory::Other)),
        ] {
            let err = registry.update_status(&id, transition).unwrap_err();
            assert!(matches!(err, RegistryError::InvalidTransition { from: StatusKind::Error, .. }));
        }
        assert_eq!(registry.get(&id).unwrap().error_message(), Some("Extraction failed"));
    }

    #[test]
    fn test_cannot_skip_processing() {
        let registry = Registry::new();
        let id = registry.add(pdf("x.pdf"));
        let err = registry
            .update_status(&id, Transition::Fail("nope".into()))
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InvalidTransition {
                from: StatusKind::Idle,
                to: StatusKind::Error,
                ..
            }
        ));
    }

    #[test]
    fn test_update_after_remove_does_not_resurrect() {
        let registry = Registry::new();
        let keep = registry.add(pdf("keep.pdf"));
        let gone = registry.add(jpeg("gone.jpg"));
        registry.update_status(&gone, Transition::Start).unwrap();

        assert!(registry.remove(&gone));
        let err = registry
            .update_status(&gone, Transition::Succeed(sample_data("v", 1.0, TransactionCategory::Expense)))
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));

        let ids: Vec<DocumentId> = registry.list().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![keep]);
    }

    #[test]
    fn test_remove_releases_preview() {
        let registry = Registry::new();
        let id = registry.add(jpeg("a.jpg"));
        assert_eq!(registry.previews().len(), 1);

        assert!(registry.remove(&id));
        assert_eq!(registry.previews().len(), 0);
        assert!(!registry.remove(&id));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_concurrent_updates_for_different_ids() {
        let registry = Registry::new();
        let ids: Vec<DocumentId> = (0..32).map(|i| registry.add(pdf(&format!("{i}.pdf")))).collect();

        let handles: Vec<_> = ids
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, id)| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    registry.update_status(&id, Transition::Start).unwrap();
                    if i % 2 == 0 {
                        registry
                            .update_status(&id, Transition::Succeed(sample_data("v", i as f64, TransactionCategory::Expense)))
                            .unwrap();
                    } else {
                        registry.update_status(&id, Transition::Fail("x".into())).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let entries = registry.list();
        assert_eq!(entries.len(), 32);
        assert!(entries.iter().all(|e| e.status.kind().is_terminal()));
        assert_eq!(entries.iter().filter(|e| e.extracted_data().is_some()).count(), 16);
    }
}
