//! # Event-Sourced Quiz Participation
//!
//! `quizsource` records a learner's progress through quizzes as an
//! append-only sequence of domain events. Both the mutable [`Aggregate`] used
//! to validate new actions and the read-optimised projections used to report
//! progress are reconstructed purely by replaying that sequence.
//!
//! ## Core Concepts
//!
//! - **[`Event`]**: An immutable fact, identified on the wire by an explicit
//!   discriminator. Implemented with `#[derive(Event)]`.
//! - **[`EventEnvelope`]**: An event together with its aggregate id, version
//!   and creation timestamp.
//! - **[`Aggregate`]**: A consistency boundary that folds its history into
//!   state and emits new, pending events.
//! - **[`EventStore`]**: The append-only log, guarded by optimistic
//!   concurrency.
//! - **[`repository::Repository`]**: Loads aggregates by replay and saves their
//!   pending events.
//! - **[`projection`]**: Pure folds over a history producing the quiz overview
//!   and per-attempt detail.
//!
//! ## Example
//!
//! ```rust
//! use quizsource::{Command, participant::{CommandApplier, Participant}};
//! use quizsource::projection::QuizOverview;
//!
//! # fn main() -> quizsource::Result<()> {
//! let participant = Participant::create("learner-1")?;
//! let applier = CommandApplier::new();
//!
//! let participant = applier.apply(
//!     &Command::start_quiz("quiz-1", vec!["q1".into()]),
//!     participant,
//! )?;
//! let participant = applier.apply(
//!     &Command::select_answer("quiz-1", "q1", "a1", true),
//!     participant,
//! )?;
//! let participant = applier.apply(&Command::finish_quiz("quiz-1"), participant)?;
//!
//! let overview = QuizOverview::from_events(participant.events())?;
//! assert!(overview.latest_finished_attempt("quiz-1")?.pass);
//! # Ok(())
//! # }
//! ```
#![deny(missing_docs)]

extern crate self as quizsource;

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde_json::Value;

pub use async_trait::async_trait;
pub use quizsource_derive::Event;

pub mod command;
pub mod participant;
pub mod projection;
pub mod record;
pub mod repository;
pub mod service;
pub mod store;

pub use command::Command;
pub use participant::Violation;
pub use record::EventRecord;

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}

/// The error type for this crate.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum Error {
    /// Occurs when an append does not continue the stored history, meaning
    /// another writer advanced the aggregate first.
    #[error("aggregate conflict")]
    Conflict,
    /// Occurs when an aggregate, quiz or attempt could not be found.
    #[error("{0} not found")]
    NotFound(String),
    /// Occurs when an action breaks a business rule.
    #[error(transparent)]
    Validation(#[from] Violation),
    /// Occurs when a command carries a discriminator no handler exists for.
    #[error("unsupported command type '{0}'")]
    UnsupportedCommand(String),
    /// Occurs when a stored history cannot be interpreted, e.g. an unknown
    /// event discriminator or a version gap.
    #[error("corrupted event stream: {0}")]
    Corruption(String),
    /// Wraps an error from the underlying event store.
    #[error("event store error: {0}")]
    Store(String),
}

/// Coarse classification of an [`Error`], as surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The requested aggregate, quiz or attempt does not exist.
    NotFound,
    /// A business rule was violated; retrying the same input fails again.
    Validation,
    /// Optimistic concurrency conflict; reload and retry.
    Conflict,
    /// Corruption, unsupported schema or store failure.
    Internal,
}

impl Error {
    /// Returns the category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict => ErrorKind::Conflict,
            Self::UnsupportedCommand(_) | Self::Corruption(_) | Self::Store(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether reloading the aggregate and reapplying the command may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    /// A message that is safe to show to an end user.
    ///
    /// Not-found and validation errors keep their descriptive text; conflicts
    /// and internal failures never expose store details.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::NotFound | ErrorKind::Validation => self.to_string(),
            ErrorKind::Conflict => "the request conflicted with another update, try again".into(),
            ErrorKind::Internal => "internal error".into(),
        }
    }
}

/// A specialized `Result` type for this crate's operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A closed set of domain events with explicit wire discriminators.
///
/// Use `#[derive(Event)]` with an `#[event(name = "...")]` attribute on every
/// variant rather than implementing this by hand.
pub trait Event: Clone + Debug + PartialEq + Send + Sync + Sized + 'static {
    /// Every discriminator this event type knows about.
    const EVENT_TYPES: &'static [&'static str];

    /// Returns the discriminator of this event.
    fn event_type(&self) -> &'static str;

    /// Serializes the variant-specific payload.
    fn to_payload(&self) -> Result<Value>;

    /// Reconstructs the variant named by `event_type` from its payload.
    ///
    /// An unknown discriminator or a payload that does not fit the variant is
    /// an [`Error::Corruption`].
    fn from_payload(event_type: &str, payload: Value) -> Result<Self>;
}

/// An event together with the metadata that places it in its aggregate's
/// history.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope<E: Event> {
    aggregate_id: String,
    version: u64,
    created_at: DateTime<Utc>,
    event: E,
}

impl<E: Event> EventEnvelope<E> {
    /// Creates a new envelope.
    pub fn new(
        aggregate_id: impl Into<String>,
        version: u64,
        created_at: DateTime<Utc>,
        event: E,
    ) -> Self {
        Self {
            aggregate_id: aggregate_id.into(),
            version,
            created_at,
            event,
        }
    }

    /// Returns the ID of the aggregate this event belongs to.
    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
    /// Returns the position of this event in its aggregate's history.
    pub fn version(&self) -> u64 {
        self.version
    }
    /// Returns when the event was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    /// Returns the discriminator of the wrapped event.
    pub fn event_type(&self) -> &'static str {
        self.event.event_type()
    }
    /// Returns the event payload itself.
    pub fn event(&self) -> &E {
        &self.event
    }
    /// Consumes the envelope and returns the event.
    pub fn into_event(self) -> E {
        self.event
    }
}

/// An aggregate is a consistency boundary whose state is derived solely from
/// its own event history.
///
/// Versions start at 0. `current_version` is the version the next new event
/// receives, `persisted_version` the first version not yet durably stored, so
/// `persisted_version <= current_version` always holds.
pub trait Aggregate: Default + Send + Sync + 'static {
    /// The type of events that this aggregate produces.
    type Event: Event;

    /// Returns the unique identifier of the aggregate.
    fn id(&self) -> &str;

    /// Returns the version the next new event will receive.
    fn current_version(&self) -> u64;

    /// Returns the watermark up to which events are known to be stored.
    fn persisted_version(&self) -> u64;

    /// The single state transition function.
    ///
    /// Validates `event` against the current state and applies it. Replayed
    /// events pass `is_persisted = true`, which advances the persisted
    /// watermark when the event sits exactly on it.
    fn apply(&mut self, event: EventEnvelope<Self::Event>, is_persisted: bool) -> Result<()>;

    /// Returns the events not yet stored and advances the persisted watermark
    /// past them.
    fn take_pending_events(&mut self) -> Vec<EventEnvelope<Self::Event>>;

    /// Restores the aggregate's state by replaying a stored history.
    fn from_events<I: IntoIterator<Item = EventEnvelope<Self::Event>>>(events: I) -> Result<Self> {
        let mut aggregate = Self::default();
        for event in events {
            aggregate.apply(event, true)?;
        }
        Ok(aggregate)
    }
}

/// The Event Log Contract: an ordered, append-only store of event records
/// keyed by aggregate id.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends records to the history of `aggregate_id`.
    ///
    /// This operation must be atomic. It fails with [`Error::Conflict`] unless
    /// the records' versions continue the stored history exactly, i.e. the
    /// first record carries the number of events already stored and each
    /// following record the next version.
    async fn append(&self, aggregate_id: &str, records: Vec<EventRecord>) -> Result<()>;

    /// Loads the full history of `aggregate_id` in strictly increasing version
    /// order, or [`Error::NotFound`] when nothing is stored.
    async fn load(&self, aggregate_id: &str) -> Result<Vec<EventRecord>>;
}
