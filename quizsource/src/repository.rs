//! Provides a generic repository for interacting with aggregates.
use std::{marker::PhantomData, sync::Arc};

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::{Aggregate, Error, EventRecord, EventStore, Result};

/// Defines the standard interface for a repository.
#[async_trait]
pub trait Repository<A: Aggregate>: Send + Sync {
    /// Loads an aggregate instance by replaying its stored history.
    async fn load(&self, id: &str) -> Result<A>;
    /// Stores the aggregate's pending events.
    ///
    /// The pending events are drained from the aggregate before the append, so
    /// after a failed save the aggregate must be discarded and reloaded.
    async fn save(&self, aggregate: &mut A) -> Result<()>;
}

/// A generic, high-level repository for loading and saving aggregates.
///
/// Aggregates are never snapshotted: every load replays the full history, and
/// every save relies on the store's version check for concurrency control.
pub struct GenericRepository<A, S>
where
    A: Aggregate,
    S: EventStore,
{
    store: Arc<S>,
    _phantom: PhantomData<A>,
}

impl<A, S> GenericRepository<A, S>
where
    A: Aggregate,
    S: EventStore,
{
    /// Creates a new `GenericRepository`.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }
}

impl<A, S> Clone for GenericRepository<A, S>
where
    A: Aggregate,
    S: EventStore,
{
    fn clone(&self) -> Self {
        Self::new(self.store.clone())
    }
}

#[async_trait]
impl<A, S> Repository<A> for GenericRepository<A, S>
where
    A: Aggregate,
    S: EventStore + 'static,
{
    #[instrument(skip(self), fields(aggregate.id = %id))]
    async fn load(&self, id: &str) -> Result<A> {
        let records = self.store.load(id).await?;
        debug!(events = records.len(), "replaying history");

        let events = records
            .into_iter()
            .map(EventRecord::into_envelope::<A::Event>)
            .collect::<Result<Vec<_>>>()
            .inspect_err(|e| warn!(error = %e, "unreadable history"))?;

        A::from_events(events).inspect_err(|e| {
            if matches!(e, Error::Corruption(_)) {
                warn!(error = %e, "inconsistent history");
            }
        })
    }

    #[instrument(skip(self, aggregate), fields(aggregate.id = %aggregate.id()))]
    async fn save(&self, aggregate: &mut A) -> Result<()> {
        let pending = aggregate.take_pending_events();
        if pending.is_empty() {
            return Ok(());
        }

        let records = pending
            .iter()
            .map(EventRecord::from_envelope)
            .collect::<Result<Vec<_>>>()?;
        debug!(
            events = records.len(),
            first_version = records[0].version,
            "appending events"
        );

        self.store.append(aggregate.id(), records).await
    }
}

#[async_trait]
impl<A, R> Repository<A> for Arc<R>
where
    A: Aggregate,
    R: Repository<A> + Send + Sync,
{
    async fn load(&self, id: &str) -> Result<A> {
        (**self).load(id).await
    }

    async fn save(&self, aggregate: &mut A) -> Result<()> {
        (**self).save(aggregate).await
    }
}
