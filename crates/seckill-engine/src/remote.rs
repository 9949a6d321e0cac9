//! Atomic stock deduction against the authoritative counter store

use seckill_core::Config;

/// Script run by Redis as one indivisible unit.
///
/// `KEYS[1]` is the inventory hash, `ARGV[1]` the total field and `ARGV[2]`
/// the sold field. Returns the new sold count, or `0` when nothing is left.
pub const DEDUCT_SCRIPT: &str = r#"
local total = tonumber(redis.call('HGET', KEYS[1], ARGV[1]))
if not total then
    return redis.error_reply('inventory total is not provisioned')
end
local sold = tonumber(redis.call('HGET', KEYS[1], ARGV[2])) or 0
if sold < total then
    return redis.call('HINCRBY', KEYS[1], ARGV[2], 1)
end
return 0
"#;

/// Names of the authoritative inventory record in the store
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RemoteSpikeKeys {
    /// Hash holding the record
    pub order_key: String,
    /// Field holding the total stock
    pub total_field: String,
    /// Field holding the sold count
    pub sold_field: String,
}

impl RemoteSpikeKeys {
    pub fn from_config(config: &Config) -> Self {
        Self {
            order_key: config.order_key.clone(),
            total_field: config.total_field.clone(),
            sold_field: config.sold_field.clone(),
        }
    }
}

/// Answer of the store to one deduction
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Deduction {
    /// One unit was sold; `sold` is the new sold count
    Deducted { sold: u64 },
    /// The record is exhausted, nothing changed
    Denied,
}

/// Total and sold count of a record
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Inventory {
    pub total: u64,
    pub sold: u64,
}

/// Failure to reach the store or to run the deduction
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no store connection available: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("record `{key}` has no `{field}` field")]
    NotProvisioned { key: String, field: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Store holding the authoritative total and sold counts
///
/// Implementations must run [`CounterStore::deduct`] as one indivisible
/// read-check-increment with respect to every other caller, including
/// callers in other processes sharing the store.
pub trait CounterStore: Send + Sync {
    /// Sell one unit if `sold < total`.
    fn deduct(&self, keys: &RemoteSpikeKeys) -> Result<Deduction, StoreError>;

    /// Set up the record with `total` units and nothing sold.
    ///
    /// Operator helper; the purchase path never calls this.
    fn provision(&self, keys: &RemoteSpikeKeys, total: u64) -> Result<(), StoreError>;

    /// Read the current record.
    fn inventory(&self, keys: &RemoteSpikeKeys) -> Result<Inventory, StoreError>;
}

/// Deduct one unit, folding denial and failures into `false`.
///
/// Boolean view of [`CounterStore::deduct`] for callers that only need the
/// decision. The engine matches on the [`Deduction`] itself to count denials
/// and failures apart.
pub fn try_remote_deduct(store: &dyn CounterStore, keys: &RemoteSpikeKeys) -> bool {
    matches!(store.deduct(keys), Ok(Deduction::Deducted { .. }))
}
