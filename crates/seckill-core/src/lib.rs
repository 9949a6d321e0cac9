//! 🏗 Infrastructure for handling requests, etc.
#![warn(missing_docs)]

use std::path::PathBuf;
use std::time::Duration;

mod request;

pub use request::{
    Outcome, RawRequest, Request, RequestHandler, RequestKind, StatsSnapshot,
};

/// Backing store holding the authoritative inventory record
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StoreKind {
    /// Redis, reached through a connection pool
    Redis,
    /// Process-local store seeded with the given total stock
    ///
    /// Only meaningful for a single process (tests, demos).
    Memory {
        /// Total stock of the in-memory record
        total: u64,
    },
}

/// Configuration of the seckill engine
#[derive(Clone, Debug)]
pub struct Config {
    /// Slice of the total stock this process may sell without the store
    /// turning it down
    pub local_capacity: u32,
    /// Longest time a request waits for the admission token
    pub admission_timeout: Duration,

    /// Which store holds the authoritative record
    pub store: StoreKind,
    /// Redis connection URL
    pub redis_url: String,
    /// Maximum number of pooled Redis connections
    pub pool_size: u32,
    /// Longest time a request waits for a pooled connection
    pub pool_timeout: Duration,

    /// Key of the hash holding the inventory record
    pub order_key: String,
    /// Hash field holding the total stock
    pub total_field: String,
    /// Hash field holding the sold count
    pub sold_field: String,

    /// File the per-request audit lines are appended to
    pub audit_log: PathBuf,
    /// Number of audit lines that may be queued before new ones are dropped
    pub audit_queue: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            local_capacity: 150,
            admission_timeout: Duration::from_millis(1_000),
            store: StoreKind::Redis,
            redis_url: String::from("redis://127.0.0.1:6379"),
            pool_size: 64,
            pool_timeout: Duration::from_millis(500),
            order_key: String::from("ticket_hash_key"),
            total_field: String::from("ticket_total_nums"),
            sold_field: String::from("ticket_sold_nums"),
            audit_log: PathBuf::from("./stat.log"),
            audit_queue: 65_536,
        }
    }
}
