//! The persisted form of an event.
//!
//! Stores only ever see [`EventRecord`]s. Conversion back into a typed
//! [`EventEnvelope`] goes through the event type's discriminator registry, so
//! a record with an unknown discriminator surfaces as [`Error::Corruption`]
//! instead of being skipped.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Event, EventEnvelope, Result};

/// A raw, stored event: one row of the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// The ID of the aggregate this event belongs to.
    pub aggregate_id: String,
    /// The event discriminator.
    #[serde(rename = "type")]
    pub event_type: String,
    /// The position of the event in its aggregate's history.
    pub version: u64,
    /// The serialized event-specific fields.
    pub payload: Value,
    /// When the event was created, serialized as RFC 3339 UTC.
    pub created_at: DateTime<Utc>,
}

impl EventRecord {
    /// Serializes an envelope into a record.
    pub fn from_envelope<E: Event>(envelope: &EventEnvelope<E>) -> Result<Self> {
        Ok(Self {
            aggregate_id: envelope.aggregate_id().to_string(),
            event_type: envelope.event_type().to_string(),
            version: envelope.version(),
            payload: envelope.event().to_payload()?,
            created_at: envelope.created_at(),
        })
    }

    /// Reconstructs the typed envelope described by this record.
    pub fn into_envelope<E: Event>(self) -> Result<EventEnvelope<E>> {
        let event = E::from_payload(&self.event_type, self.payload).map_err(|e| match e {
            Error::Corruption(reason) => Error::Corruption(format!(
                "{reason} (aggregate '{}', version {})",
                self.aggregate_id, self.version
            )),
            other => other,
        })?;
        Ok(EventEnvelope::new(
            self.aggregate_id,
            self.version,
            self.created_at,
            event,
        ))
    }
}
