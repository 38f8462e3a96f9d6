//! A persistent `EventStore` implementation using `sled`.

use async_trait::async_trait;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use tracing::instrument;

use crate::{Error, EventRecord, EventStore, Result};

/// A persistent, thread-safe event store using `sled`.
///
/// Every aggregate gets its own `sled::Tree`. Keys are big-endian versions, so
/// the tree's natural order is version order.
#[derive(Clone)]
pub struct SledEventStore {
    db: sled::Db,
}

impl SledEventStore {
    /// Creates a new `SledEventStore`.
    pub fn new(db: sled::Db) -> Self {
        Self { db }
    }

    fn has_tree(&self, aggregate_id: &str) -> bool {
        self.db
            .tree_names()
            .iter()
            .any(|name| &name[..] == aggregate_id.as_bytes())
    }

    fn tree(&self, aggregate_id: &str) -> Result<sled::Tree> {
        self.db
            .open_tree(aggregate_id.as_bytes())
            .map_err(|e| Error::Store(e.to_string()))
    }
}

fn version_key(version: u64) -> [u8; 8] {
    version.to_be_bytes()
}

#[async_trait]
impl EventStore for SledEventStore {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn append(&self, aggregate_id: &str, records: Vec<EventRecord>) -> Result<()> {
        let tree = self.tree(aggregate_id)?;

        let mut rows = Vec::with_capacity(records.len());
        for record in &records {
            let value = serde_json::to_vec(record).map_err(|e| Error::Store(e.to_string()))?;
            rows.push((record.version, value));
        }

        // The version checks run inside the transaction, so two writers racing
        // for the same version cannot both commit.
        tree.transaction(|tx| {
            for (version, value) in &rows {
                if tx.get(version_key(*version))?.is_some() {
                    return Err(ConflictableTransactionError::Abort(Error::Conflict));
                }
                if *version > 0 && tx.get(version_key(version - 1))?.is_none() {
                    return Err(ConflictableTransactionError::Abort(Error::Conflict));
                }
                tx.insert(&version_key(*version)[..], value.as_slice())?;
            }
            Ok(())
        })
        .map_err(|e: TransactionError<Error>| match e {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => Error::Store(e.to_string()),
        })?;

        tree.flush_async()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load(&self, aggregate_id: &str) -> Result<Vec<EventRecord>> {
        // Opening a tree creates it, so reads of unknown ids must stop here.
        if !self.has_tree(aggregate_id) {
            return Err(Error::NotFound(format!("aggregate '{aggregate_id}'")));
        }
        let tree = self.tree(aggregate_id)?;

        let records = tree
            .iter()
            .map(|res| {
                let (_, v) = res.map_err(|e| Error::Store(e.to_string()))?;
                serde_json::from_slice(&v).map_err(|e| Error::Corruption(e.to_string()))
            })
            .collect::<Result<Vec<EventRecord>>>()?;

        if records.is_empty() {
            return Err(Error::NotFound(format!("aggregate '{aggregate_id}'")));
        }
        Ok(records)
    }
}
