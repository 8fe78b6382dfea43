//! Drives each registered document to a terminal status exactly once.
//!
//! One task per document. Tasks share nothing but the [`Registry`], and all
//! of their writes go through `Registry::update_status`.

use crate::extractor::ExtractionBackend;
use crate::registry::{DocumentId, Registry, RegistryError, SourceFile, Transition};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Message stored on failed entries; the underlying cause only goes to logs.
pub const FAILURE_MESSAGE: &str = "Extraction failed";

/// How a processing run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Succeeded,
    Failed,
    /// The entry was removed, or already claimed by another run.
    Discarded,
}

#[derive(Clone)]
pub struct Orchestrator {
    registry: Registry,
    backend: Arc<dyn ExtractionBackend>,
}

impl Orchestrator {
    pub fn new(registry: Registry, backend: Arc<dyn ExtractionBackend>) -> Self {
        Self { registry, backend }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Register an upload and start processing it in the background.
    pub fn submit(&self, source: SourceFile) -> (DocumentId, JoinHandle<ProcessOutcome>) {
        let data = source.data.clone();
        let media_type = source.media_type.clone();
        let id = self.registry.add(source);
        let handle = self.spawn(id.clone(), data, media_type);
        (id, handle)
    }

    pub fn spawn(&self, id: DocumentId, data: Arc<[u8]>, media_type: String) -> JoinHandle<ProcessOutcome> {
        let this = self.clone();
        tokio::spawn(async move { this.process(&id, &data, &media_type).await })
    }

    /// Run one document through the backend and record the outcome.
    ///
    /// The entry is marked `processing` before the backend is called.
    pub async fn process(&self, id: &DocumentId, data: &[u8], media_type: &str) -> ProcessOutcome {
        if let Err(err) = self.registry.update_status(id, Transition::Start) {
            self.log_rejected(&err);
            return ProcessOutcome::Discarded;
        }
        info!("{}: processing with {}", id, self.backend.name());

        let (transition, outcome) = match self.backend.extract(data, media_type).await {
            Ok(extracted) => {
                info!(
                    "{}: extracted {} {} from {}",
                    id, extracted.amount, extracted.currency_code, extracted.vendor_name
                );
                (Transition::Succeed(extracted), ProcessOutcome::Succeeded)
            }
            Err(err) => {
                error!("{}: extraction failed: {}", id, err.cause());
                (Transition::Fail(FAILURE_MESSAGE.to_string()), ProcessOutcome::Failed)
            }
        };

        match self.registry.update_status(id, transition) {
            Ok(()) => outcome,
            Err(err) => {
                self.log_rejected(&err);
                ProcessOutcome::Discarded
            }
        }
    }

    fn log_rejected(&self, err: &RegistryError) {
        match err {
            RegistryError::NotFound(id) => debug!("{}: removed while in flight, result dropped", id),
            RegistryError::InvalidTransition { .. } => warn!("{}", err),
        }
    }
}
