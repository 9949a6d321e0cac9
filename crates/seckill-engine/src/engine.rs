//! Implementation of the two-tier stock deduction

use std::sync::Arc;
use std::time::Duration;

use seckill_core::{Outcome, StatsSnapshot};
use tracing::{debug, info, warn};

use crate::admission::Admission;
use crate::local::LocalSpike;
use crate::remote::{CounterStore, Deduction, RemoteSpikeKeys, StoreError};
use crate::stats::{PurchaseEvent, SpikeStats};

/// Result of one purchase attempt with the detail the buyer does not see
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Attempt {
    pub event: PurchaseEvent,
    /// Local sold count right after the attempt
    pub local_sold: u32,
}

impl Attempt {
    #[inline]
    pub fn outcome(&self) -> Outcome {
        self.event.outcome()
    }
}

/// Stock deduction engine for one SKU
///
/// A request first takes a unit from the process-local slice and only then
/// asks the store. Both steps run while holding the admission token, so at
/// most one request per process is between the two at any time.
pub struct SpikeEngine {
    admission: Admission<LocalSpike>,
    local_capacity: u32,
    keys: RemoteSpikeKeys,
    store: Arc<dyn CounterStore>,
    stats: SpikeStats,
}

impl std::fmt::Debug for SpikeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpikeEngine")
            .field("local_capacity", &self.local_capacity)
            .field("keys", &self.keys)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl SpikeEngine {
    /// Create a new [`SpikeEngine`]
    pub fn new(
        local_capacity: u32,
        admission_timeout: Duration,
        keys: RemoteSpikeKeys,
        store: Arc<dyn CounterStore>,
    ) -> Self {
        Self {
            admission: Admission::new(LocalSpike::new(local_capacity), admission_timeout),
            local_capacity,
            keys,
            store,
            stats: SpikeStats::default(),
        }
    }

    /// Try to sell one unit
    pub fn attempt_purchase(&self) -> Outcome {
        self.attempt().outcome()
    }

    /// Try to sell one unit, reporting how the attempt ended
    pub fn attempt(&self) -> Attempt {
        let (event, local_sold) = match self.admission.acquire() {
            None => {
                warn!(
                    timeout_ms = self.admission.timeout().as_millis() as u64,
                    "gave up waiting for admission"
                );
                (PurchaseEvent::AdmissionTimeout, self.stats.local_sold())
            }
            Some(mut local) => {
                let event = if local.try_deduct() {
                    self.stats.publish_local_sold(local.sold());
                    // the unit stays taken locally whatever the store says
                    self.remote_deduct()
                } else {
                    PurchaseEvent::LocalRejected
                };
                // read under the token, a later holder may raise the count
                (event, local.sold())
            }
        };

        self.stats.record(event);
        Attempt { event, local_sold }
    }

    fn remote_deduct(&self) -> PurchaseEvent {
        match self.store.deduct(&self.keys) {
            Ok(Deduction::Deducted { sold }) => {
                debug!(sold, key = %self.keys.order_key, "remote deduction succeeded");
                PurchaseEvent::Success
            }
            Ok(Deduction::Denied) => {
                info!(key = %self.keys.order_key, "remote stock exhausted");
                PurchaseEvent::RemoteDenied
            }
            Err(err) => {
                warn!(
                    error = %err,
                    key = %self.keys.order_key,
                    "remote deduction failed, reporting sold out"
                );
                PurchaseEvent::RemoteFailed
            }
        }
    }

    /// Set up the store record with `total` units and nothing sold
    pub fn provision(&self, total: u64) -> Result<(), StoreError> {
        self.store.provision(&self.keys, total)?;
        info!(total, key = %self.keys.order_key, "provisioned inventory record");
        Ok(())
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.local_capacity)
    }

    pub fn keys(&self) -> &RemoteSpikeKeys {
        &self.keys
    }

    pub fn store(&self) -> &Arc<dyn CounterStore> {
        &self.store
    }
}
