//! FIFO waiting line of champion ad groups.

use campaign_core::error::{CampaignError, CampaignResult};
use campaign_core::types::QueueEntry;
use chrono::Utc;
use parking_lot::{Mutex, MutexGuard};
use std::collections::VecDeque;
use tracing::debug;

/// Strict arrival order, no deduplication: the same ad group enqueued twice
/// occupies two slots.
#[derive(Debug, Default)]
pub struct ChampionQueue {
    entries: Mutex<VecDeque<QueueEntry>>,
}

impl ChampionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the back; returns the new size.
    pub fn enqueue(&self, ad_group_id: &str, source_campaign_id: &str) -> usize {
        let mut entries = self.entries.lock();
        entries.push_back(QueueEntry {
            ad_group_id: ad_group_id.to_string(),
            source_campaign_id: source_campaign_id.to_string(),
            enqueued_at: Utc::now(),
        });
        debug!(ad_group_id, size = entries.len(), "champion enqueued");
        entries.len()
    }

    pub fn dequeue(&self) -> CampaignResult<QueueEntry> {
        self.entries.lock().pop_front().ok_or(CampaignError::QueueEmpty)
    }

    pub fn peek_all(&self) -> Vec<QueueEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn size(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Hold the queue for a multi-step operation. The rotation engine peeks,
    /// mutates the campaign, and pops only once nothing else can fail.
    pub(crate) fn lock(&self) -> MutexGuard<'_, VecDeque<QueueEntry>> {
        self.entries.lock()
    }
}
