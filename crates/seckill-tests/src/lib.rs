use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use eyre::{eyre, Result};
use seckill_core::{Config, StoreKind};
use seckill_engine::{CounterStore, MemoryCounterStore, RemoteSpikeKeys, SpikeEngine};
use tempfile::TempDir;

mod api;
pub use api::{Api, ApiResponse, UserSession};

pub struct TestCtxBuilder {
    /// Slice of the stock the engine may sell locally
    pub local_capacity: u32,
    /// Total stock of the record when the builder provisions it
    pub tickets: u64,
    /// Count of request handling threads
    pub handler_threads: u16,
    /// Longest wait for the admission token
    pub admission_timeout: Duration,

    /// Store shared with other contexts; a fresh in-memory one if unset
    pub store: Option<Arc<dyn CounterStore>>,
    /// Name of the inventory record; the server default if unset
    pub order_key: Option<String>,
}

impl TestCtxBuilder {
    /// Create a new test context builder with defaults mirroring the server
    pub fn new() -> Self {
        TestCtxBuilder {
            local_capacity: 150,
            tickets: 1_000,
            handler_threads: 2,
            admission_timeout: Duration::from_secs(5),
            store: None,
            order_key: None,
        }
    }

    /// Set the local slice of the stock
    pub fn with_local_capacity(mut self, capacity: u32) -> Self {
        self.local_capacity = capacity;
        self
    }

    /// Set the number of initially available tickets in the store
    ///
    /// Ignored when a store is supplied with [`Self::with_store`].
    pub fn with_tickets(mut self, tickets: u64) -> Self {
        self.tickets = tickets;
        self
    }

    /// Set the number of request handling threads to use
    pub fn with_handler_threads(mut self, threads: u16) -> Self {
        assert_ne!(threads, 0);
        self.handler_threads = threads;
        self
    }

    /// Set the admission timeout
    pub fn with_admission_timeout(mut self, timeout: Duration) -> Self {
        self.admission_timeout = timeout;
        self
    }

    /// Use an existing, already provisioned store
    pub fn with_store(mut self, store: Arc<dyn CounterStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a record other than the default one
    pub fn with_order_key(mut self, key: impl Into<String>) -> Self {
        self.order_key = Some(key.into());
        self
    }

    /// Get the [`seckill_core::Config`] for launching the engine
    fn config(&self, audit_log: PathBuf) -> Config {
        let defaults = Config::default();
        Config {
            order_key: self.order_key.clone().unwrap_or(defaults.order_key.clone()),
            local_capacity: self.local_capacity,
            admission_timeout: self.admission_timeout,
            store: StoreKind::Memory {
                total: self.tickets,
            },
            audit_log,
            ..defaults
        }
    }

    /// Build the test context
    pub async fn build(self) -> Result<TestCtx> {
        let audit_dir = tempfile::tempdir()?;
        let audit_log = audit_dir.path().join("stat.log");
        let config = self.config(audit_log.clone());

        let store = match self.store {
            Some(store) => store,
            None => {
                let store = MemoryCounterStore::new();
                store.provision(&RemoteSpikeKeys::from_config(&config), self.tickets)?;
                Arc::new(store)
            }
        };

        let (handler, api) = api::mock::start(self.handler_threads, config, store).await?;

        Ok(TestCtx {
            api,
            engine: handler.engine(),
            handler,
            local_capacity: self.local_capacity,
            audit_log,
            _audit_dir: audit_dir,
            drop_bomb: DropBomb,
        })
    }
}

impl Default for TestCtxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Test context
pub struct TestCtx {
    /// API allowing to interact with the engine
    pub api: Api,
    /// The engine behind the handler, for inspecting counters
    pub engine: Arc<SpikeEngine>,
    handler: api::mock::MockHandler,
    /// Local slice of the stock
    pub local_capacity: u32,

    audit_log: PathBuf,
    _audit_dir: TempDir,
    drop_bomb: DropBomb,
}

impl TestCtx {
    /// Shut the engine down and return the audit lines it wrote
    pub async fn finish(self) -> Result<Vec<String>> {
        std::mem::forget(self.drop_bomb);
        drop(self.api);
        self.handler.shutdown().await?;

        let contents = tokio::task::spawn_blocking({
            let path = self.audit_log.clone();
            move || std::fs::read_to_string(path)
        })
        .await
        .map_err(|err| eyre!("audit reader panicked: {err}"))??;
        Ok(contents.lines().map(String::from).collect())
    }
}

struct DropBomb;

impl Drop for DropBomb {
    fn drop(&mut self) {
        eprintln!("@TestAuthor: You should call `ctx.finish().await` to shut the engine down");
    }
}
