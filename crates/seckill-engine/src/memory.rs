//! In-process counter store
//!
//! Keeps records the way the Redis store lays them out (a hash of named
//! fields) behind one mutex, so a deduction is a single critical section.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::remote::{CounterStore, Deduction, Inventory, RemoteSpikeKeys, StoreError};

/// Counter store living in the current process
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    records: Mutex<HashMap<String, HashMap<String, u64>>>,
}

impl MemoryCounterStore {
    /// Create a new, empty [`MemoryCounterStore`].
    pub fn new() -> Self {
        Self::default()
    }
}

fn field(
    record: Option<&HashMap<String, u64>>,
    keys: &RemoteSpikeKeys,
    name: &str,
) -> Result<u64, StoreError> {
    record
        .and_then(|fields| fields.get(name))
        .copied()
        .ok_or_else(|| StoreError::NotProvisioned {
            key: keys.order_key.clone(),
            field: name.to_owned(),
        })
}

impl CounterStore for MemoryCounterStore {
    fn deduct(&self, keys: &RemoteSpikeKeys) -> Result<Deduction, StoreError> {
        let mut records = self.records.lock();
        let total = field(records.get(&keys.order_key), keys, &keys.total_field)?;

        // the total exists, so the record does too
        let fields = records.entry(keys.order_key.clone()).or_default();
        let sold = fields.entry(keys.sold_field.clone()).or_insert(0);
        if *sold < total {
            *sold += 1;
            Ok(Deduction::Deducted { sold: *sold })
        } else {
            Ok(Deduction::Denied)
        }
    }

    fn provision(&self, keys: &RemoteSpikeKeys, total: u64) -> Result<(), StoreError> {
        let mut records = self.records.lock();
        let fields = records.entry(keys.order_key.clone()).or_default();
        fields.insert(keys.total_field.clone(), total);
        fields.insert(keys.sold_field.clone(), 0);
        Ok(())
    }

    fn inventory(&self, keys: &RemoteSpikeKeys) -> Result<Inventory, StoreError> {
        let records = self.records.lock();
        let record = records.get(&keys.order_key);
        Ok(Inventory {
            total: field(record, keys, &keys.total_field)?,
            sold: field(record, keys, &keys.sold_field).unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use seckill_core::Config;

    use super::*;

    fn keys() -> RemoteSpikeKeys {
        RemoteSpikeKeys::from_config(&Config::default())
    }

    #[test]
    fn deducts_until_total() {
        let store = MemoryCounterStore::new();
        store.provision(&keys(), 2).unwrap();

        assert_eq!(store.deduct(&keys()).unwrap(), Deduction::Deducted { sold: 1 });
        assert_eq!(store.deduct(&keys()).unwrap(), Deduction::Deducted { sold: 2 });
        assert_eq!(store.deduct(&keys()).unwrap(), Deduction::Denied);
        assert_eq!(store.inventory(&keys()).unwrap(), Inventory { total: 2, sold: 2 });
    }

    #[test]
    fn missing_record_is_an_error() {
        let store = MemoryCounterStore::new();
        assert!(matches!(
            store.deduct(&keys()),
            Err(StoreError::NotProvisioned { .. })
        ));
        assert!(store.inventory(&keys()).is_err());
    }

    #[test]
    fn concurrent_deductions_never_exceed_total() {
        let store = MemoryCounterStore::new();
        store.provision(&keys(), 100).unwrap();

        let deducted: usize = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        (0..50)
                            .filter(|_| {
                                matches!(store.deduct(&keys()), Ok(Deduction::Deducted { .. }))
                            })
                            .count()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(deducted, 100);
        assert_eq!(store.inventory(&keys()).unwrap().sold, 100);
    }
}
