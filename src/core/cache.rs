//! Fetch-and-cache orchestration.
//!
//! [`SnapshotCache::fetch_or_reuse`] is the only path that talks to both the
//! freshness policy and the snapshot store. Remote failures never escape it;
//! store failures always do.

use crate::core::error::VolumapperError;
use crate::core::freshness::{self, Decision};
use crate::core::store::{Partition, Snapshot, SnapshotStore};
use crate::core::time::{Clock, SystemClock};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

#[derive(Clone)]
pub struct SnapshotCache {
    store: Arc<SnapshotStore>,
    clock: Arc<dyn Clock>,
}

impl SnapshotCache {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<SnapshotStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn fetch_or_reuse<T, E, F>(
        &self,
        partition: &Partition,
        budget: Duration,
        force: bool,
        remote_fetch: F,
    ) -> Result<Vec<T>, VolumapperError>
    where
        T: Serialize + DeserializeOwned,
        E: Display,
        F: FnOnce() -> Result<Vec<T>, E>,
    {
        let latest = self.store.latest_instant(partition)?;
        let now = self.clock.now();

        match (freshness::decide(latest, now, budget, force), latest) {
            (Decision::Reuse, Some(instant)) => {
                debug!(partition = %partition, instant, "reusing cached snapshot");
                let snapshot: Snapshot<T> = self.store.read(partition, instant).map_err(|e| {
                    match e {
                        VolumapperError::NotFound(what) => VolumapperError::StoreCorrupted {
                            path: self.store.snapshot_path(partition, instant),
                            reason: format!("{} vanished after it was listed", what),
                        },
                        other => other,
                    }
                })?;
                Ok(snapshot.payload)
            }
            _ => {
                debug!(partition = %partition, force, ?latest, "fetching fresh results");
                match remote_fetch() {
                    Ok(records) if records.is_empty() => {
                        debug!(partition = %partition, "remote returned no records, nothing cached");
                        Ok(records)
                    }
                    Ok(records) => {
                        let snapshot = Snapshot::new(now, records);
                        self.store.write(partition, &snapshot)?;
                        Ok(snapshot.payload)
                    }
                    Err(e) => {
                        error!(partition = %partition, error = %e, "failed polling for {} data", partition.source);
                        Ok(Vec::new())
                    }
                }
            }
        }
    }
}
