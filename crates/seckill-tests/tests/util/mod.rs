use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use seckill_core::Config;
use seckill_engine::{
    CounterStore, Deduction, Inventory, MemoryCounterStore, RemoteSpikeKeys, StoreError,
};

#[allow(unused)]
pub fn keys() -> RemoteSpikeKeys {
    RemoteSpikeKeys::from_config(&Config::default())
}

/// In-memory store counting how often it was asked to deduct
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryCounterStore,
    calls: AtomicUsize,
}

impl CountingStore {
    /// Creates a store provisioned with `total` units.
    #[allow(unused)]
    pub fn provisioned(total: u64) -> Arc<Self> {
        let store = Arc::new(Self::default());
        store
            .provision(&keys(), total)
            .expect("in-memory provisioning cannot fail");
        store
    }

    #[allow(unused)]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    #[allow(unused)]
    pub fn sold(&self) -> u64 {
        self.inner.inventory(&keys()).map(|inv| inv.sold).unwrap_or(0)
    }
}

impl CounterStore for CountingStore {
    fn deduct(&self, keys: &RemoteSpikeKeys) -> Result<Deduction, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.deduct(keys)
    }

    fn provision(&self, keys: &RemoteSpikeKeys, total: u64) -> Result<(), StoreError> {
        self.inner.provision(keys, total)
    }

    fn inventory(&self, keys: &RemoteSpikeKeys) -> Result<Inventory, StoreError> {
        self.inner.inventory(keys)
    }
}

/// Store that cannot be reached
#[derive(Default)]
pub struct UnreachableStore {
    calls: AtomicUsize,
}

impl UnreachableStore {
    #[allow(unused)]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CounterStore for UnreachableStore {
    fn deduct(&self, _keys: &RemoteSpikeKeys) -> Result<Deduction, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable(String::from("connection refused")))
    }

    fn provision(&self, _keys: &RemoteSpikeKeys, _total: u64) -> Result<(), StoreError> {
        Err(StoreError::Unavailable(String::from("connection refused")))
    }

    fn inventory(&self, _keys: &RemoteSpikeKeys) -> Result<Inventory, StoreError> {
        Err(StoreError::Unavailable(String::from("connection refused")))
    }
}
