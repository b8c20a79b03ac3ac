//! Owner of the live dataset.
//!
//! Exactly one dataset is visible at a time. A new upload replaces it by
//! swapping the `Arc`, so readers always hold either the old or the new
//! dataset in full. When uploads overlap, the one that started last wins.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::Dataset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct UploadTicket(u64);

#[derive(Debug, Default)]
struct Published {
    generation: u64,
    dataset: Option<Arc<Dataset>>,
}

#[derive(Debug, Default)]
pub struct DatasetStore {
    next_generation: AtomicU64,
    published: RwLock<Published>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot for an upload that is about to be processed.
    pub fn begin_upload(&self) -> UploadTicket {
        UploadTicket(self.next_generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Make `dataset` live unless a later upload has already been published.
    ///
    /// Returns the published dataset, or `None` when the result was stale.
    pub fn publish(&self, ticket: UploadTicket, dataset: Dataset) -> Option<Arc<Dataset>> {
        let mut published = self.published.write();
        if ticket.0 <= published.generation {
            debug!(
                "Discarding stale upload {} (live generation {})",
                ticket.0, published.generation
            );
            return None;
        }

        let dataset = Arc::new(dataset);
        published.generation = ticket.0;
        published.dataset = Some(Arc::clone(&dataset));
        info!(
            "Published dataset '{}' as generation {}",
            dataset.source_file, ticket.0
        );
        Some(dataset)
    }

    pub fn current(&self) -> Option<Arc<Dataset>> {
        self.published.read().dataset.clone()
    }
}
