//! Outcome counters of the engine

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use seckill_core::{Outcome, StatsSnapshot};

/// How a single purchase attempt ended
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PurchaseEvent {
    Success,
    LocalRejected,
    RemoteDenied,
    RemoteFailed,
    AdmissionTimeout,
}

impl PurchaseEvent {
    /// What the buyer gets to see
    pub fn outcome(self) -> Outcome {
        match self {
            PurchaseEvent::Success => Outcome::Success,
            _ => Outcome::SoldOut,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PurchaseEvent::Success => "success",
            PurchaseEvent::LocalRejected => "local_rejected",
            PurchaseEvent::RemoteDenied => "remote_denied",
            PurchaseEvent::RemoteFailed => "remote_failed",
            PurchaseEvent::AdmissionTimeout => "admission_timeout",
        }
    }
}

#[derive(Debug, Default)]
pub struct SpikeStats {
    /// Mirror of the local sold count, written only by the admission holder
    local_sold: AtomicU32,
    success: AtomicU64,
    local_rejected: AtomicU64,
    remote_denied: AtomicU64,
    remote_failed: AtomicU64,
    admission_timeout: AtomicU64,
}

impl SpikeStats {
    pub fn record(&self, event: PurchaseEvent) {
        let counter = match event {
            PurchaseEvent::Success => &self.success,
            PurchaseEvent::LocalRejected => &self.local_rejected,
            PurchaseEvent::RemoteDenied => &self.remote_denied,
            PurchaseEvent::RemoteFailed => &self.remote_failed,
            PurchaseEvent::AdmissionTimeout => &self.admission_timeout,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("seckill.purchase", "result" => event.label()).increment(1);
    }

    pub fn publish_local_sold(&self, sold: u32) {
        self.local_sold.store(sold, Ordering::Release);
        metrics::gauge!("seckill.local_sold").set(f64::from(sold));
    }

    pub fn local_sold(&self) -> u32 {
        self.local_sold.load(Ordering::Acquire)
    }

    pub fn snapshot(&self, local_capacity: u32) -> StatsSnapshot {
        StatsSnapshot {
            local_capacity,
            local_sold: self.local_sold(),
            success: self.success.load(Ordering::Relaxed),
            local_rejected: self.local_rejected.load(Ordering::Relaxed),
            remote_denied: self.remote_denied.load(Ordering::Relaxed),
            remote_failed: self.remote_failed.load(Ordering::Relaxed),
            admission_timeout: self.admission_timeout.load(Ordering::Relaxed),
        }
    }
}
