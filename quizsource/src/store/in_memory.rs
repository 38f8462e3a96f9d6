//! An in-memory event store, useful for testing and development.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::{Error, EventRecord, EventStore, Result};

use dashmap::DashMap;

/// Thread-safe map keyed by aggregate_id
type StoreMap = DashMap<String, Vec<EventRecord>>;

/// An in-memory, thread-safe event store.
///
/// Clones share the same underlying log, so a clone handed to a second
/// session observes (and conflicts with) the first session's appends.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    events: Arc<StoreMap>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn append(&self, aggregate_id: &str, records: Vec<EventRecord>) -> Result<()> {
        // Holding the entry locks the stream for the whole check-then-push.
        let mut stream = self.events.entry(aggregate_id.to_string()).or_default();

        let next_version = stream.len() as u64;
        for (offset, record) in records.iter().enumerate() {
            if record.version != next_version + offset as u64 {
                debug!(
                    expected = next_version + offset as u64,
                    actual = record.version,
                    "rejecting append"
                );
                return Err(Error::Conflict);
            }
        }

        stream.extend(records);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load(&self, aggregate_id: &str) -> Result<Vec<EventRecord>> {
        match self.events.get(aggregate_id) {
            Some(stream) if !stream.is_empty() => Ok(stream.clone()),
            _ => Err(Error::NotFound(format!("aggregate '{aggregate_id}'"))),
        }
    }
}
