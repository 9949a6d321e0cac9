//! Redis-backed counter store

use std::time::Duration;

use redis::{Client, Script};

use crate::remote::{
    CounterStore, Deduction, Inventory, RemoteSpikeKeys, StoreError, DEDUCT_SCRIPT,
};

/// Counter store keeping the record in a Redis hash
///
/// Connections come from a bounded pool. A request that cannot check one out
/// within the pool timeout fails like any other store error.
pub struct RedisCounterStore {
    pool: r2d2::Pool<Client>,
    script: Script,
}

impl std::fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCounterStore")
            .field("pool", &self.pool.state())
            .field("script", &self.script.get_hash())
            .finish()
    }
}

impl RedisCounterStore {
    /// Create a new [`RedisCounterStore`].
    ///
    /// No connection is opened here; an unreachable server shows up as failed
    /// deductions rather than a startup error.
    pub fn new(url: &str, pool_size: u32, pool_timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let pool = r2d2::Pool::builder()
            .max_size(pool_size)
            .min_idle(Some(0))
            .connection_timeout(pool_timeout)
            .build_unchecked(client);
        Ok(Self {
            pool,
            script: Script::new(DEDUCT_SCRIPT),
        })
    }
}

impl CounterStore for RedisCounterStore {
    fn deduct(&self, keys: &RemoteSpikeKeys) -> Result<Deduction, StoreError> {
        let mut conn = self.pool.get()?;
        let sold: i64 = self
            .script
            .key(&keys.order_key)
            .arg(&keys.total_field)
            .arg(&keys.sold_field)
            .invoke(&mut *conn)?;

        Ok(match u64::try_from(sold) {
            Ok(sold) if sold > 0 => Deduction::Deducted { sold },
            _ => Deduction::Denied,
        })
    }

    fn provision(&self, keys: &RemoteSpikeKeys, total: u64) -> Result<(), StoreError> {
        let mut conn = self.pool.get()?;
        redis::cmd("HSET")
            .arg(&keys.order_key)
            .arg(&keys.total_field)
            .arg(total)
            .arg(&keys.sold_field)
            .arg(0)
            .query::<()>(&mut *conn)?;
        Ok(())
    }

    fn inventory(&self, keys: &RemoteSpikeKeys) -> Result<Inventory, StoreError> {
        let mut conn = self.pool.get()?;
        let (total, sold): (Option<u64>, Option<u64>) = redis::cmd("HMGET")
            .arg(&keys.order_key)
            .arg(&keys.total_field)
            .arg(&keys.sold_field)
            .query(&mut *conn)?;

        let total = total.ok_or_else(|| StoreError::NotProvisioned {
            key: keys.order_key.clone(),
            field: keys.total_field.clone(),
        })?;
        Ok(Inventory {
            total,
            sold: sold.unwrap_or(0),
        })
    }
}
