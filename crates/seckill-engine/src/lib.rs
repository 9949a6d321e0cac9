//! :rocket: Stock deduction engine of the seckill service.
//!
//! A purchase passes the [local gate][local] and is then confirmed by the
//! [authoritative store][remote], both while holding the
//! [admission token][admission]. The [engine] ties the three together and
//! the [handler] serves it to the HTTP layer.

#![allow(rustdoc::private_intra_doc_links)]
use std::path::PathBuf;
use std::sync::Arc;

use seckill_core::{Config, StoreKind};
use tracing::info;

mod admission;
mod audit;
mod engine;
mod handler;
mod local;
mod memory;
mod redis_store;
mod remote;
mod stats;

pub use admission::{Admission, AdmissionToken};
pub use audit::{audit_line, AuditLog};
pub use engine::{Attempt, SpikeEngine};
pub use handler::SpikeHandler;
pub use local::LocalSpike;
pub use memory::MemoryCounterStore;
pub use redis_store::RedisCounterStore;
pub use remote::{
    try_remote_deduct, CounterStore, Deduction, Inventory, RemoteSpikeKeys, StoreError,
    DEDUCT_SCRIPT,
};
pub use stats::PurchaseEvent;

/// Failure to assemble the engine at startup
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("counter store: {0}")]
    Store(#[from] StoreError),
    #[error("cannot open audit log {path:?}: {source}")]
    Audit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Entrypoint of the engine
///
/// Builds the counter store selected by `config` and hands it to
/// [`launch_with_store`].
pub fn launch(config: &Config) -> Result<SpikeHandler, LaunchError> {
    let keys = RemoteSpikeKeys::from_config(config);
    let store: Arc<dyn CounterStore> = match config.store {
        StoreKind::Redis => Arc::new(RedisCounterStore::new(
            &config.redis_url,
            config.pool_size,
            config.pool_timeout,
        )?),
        StoreKind::Memory { total } => {
            let store = MemoryCounterStore::new();
            store.provision(&keys, total)?;
            Arc::new(store)
        }
    };
    launch_with_store(config, store)
}

/// Assemble the engine and its handler around an existing counter store
///
/// One engine is created per call; the returned handler owns it together
/// with the audit writer.
pub fn launch_with_store(
    config: &Config,
    store: Arc<dyn CounterStore>,
) -> Result<SpikeHandler, LaunchError> {
    let keys = RemoteSpikeKeys::from_config(config);
    let engine = Arc::new(SpikeEngine::new(
        config.local_capacity,
        config.admission_timeout,
        keys,
        store,
    ));

    let audit =
        AuditLog::open(&config.audit_log, config.audit_queue).map_err(|source| LaunchError::Audit {
            path: config.audit_log.clone(),
            source,
        })?;

    info!(
        local_capacity = config.local_capacity,
        admission_timeout_ms = config.admission_timeout.as_millis() as u64,
        store = ?config.store,
        key = %config.order_key,
        "seckill engine launched"
    );
    Ok(SpikeHandler::new(engine, audit))
}
