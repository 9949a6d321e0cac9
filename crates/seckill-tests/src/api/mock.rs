//! Mock API implementation directly using the `seckill-engine` crate

use std::sync::Arc;

use eyre::{eyre, Result};
use seckill_core::{Config, Outcome, RawRequest, Request, RequestHandler, StatsSnapshot};
use seckill_engine::{CounterStore, SpikeEngine, SpikeHandler};
use tokio::sync::oneshot;
use tokio::task::{self, JoinHandle};
use uuid::Uuid;

use super::{Api, RequestMsg, Response};

pub struct MockHandler {
    handler: Arc<SpikeHandler>,
    join_handles: Vec<JoinHandle<()>>,
}

struct MockRawRequest {
    response_channel: oneshot::Sender<Response>,
}

pub async fn start(
    threads: u16,
    config: Config,
    store: Arc<dyn CounterStore>,
) -> Result<(MockHandler, Api)> {
    let handler = Arc::new(
        task::spawn_blocking(move || seckill_engine::launch_with_store(&config, store)).await??,
    );

    let it = (0..threads).map(|_| {
        let (sender, receiver) = flume::bounded::<RequestMsg>(65536);
        let handler = handler.clone();
        let handle = task::spawn_blocking(move || {
            let handler = &*handler;
            for msg in receiver.into_iter() {
                let raw = Box::new(MockRawRequest {
                    response_channel: msg.response_channel,
                });
                handler.handle(Request::from_raw(msg.kind, msg.customer_id, raw))
            }
        });
        (sender, handle)
    });
    let (senders, join_handles) = it.unzip();

    let mock_handler = MockHandler {
        handler,
        join_handles,
    };
    Ok((mock_handler, Api::new(senders)))
}

impl MockHandler {
    pub fn engine(&self) -> Arc<SpikeEngine> {
        self.handler.engine().clone()
    }

    pub async fn shutdown(self) -> Result<()> {
        for handle in self.join_handles {
            handle.await?;
        }
        let handler = Arc::into_inner(self.handler)
            .ok_or_else(|| eyre!("handler still shared after all threads ended"))?;
        task::spawn_blocking(move || handler.shutdown()).await?;
        Ok(())
    }
}

impl RawRequest for MockRawRequest {
    fn respond_with_outcome(self: Box<Self>, outcome: Outcome, customer_id: Uuid) {
        let response = Response::Outcome {
            outcome,
            customer_id,
        };
        self.response_channel.send(response).unwrap()
    }

    fn respond_with_stats(self: Box<Self>, stats: StatsSnapshot, customer_id: Uuid) {
        let response = Response::Stats { stats, customer_id };
        self.response_channel.send(response).unwrap()
    }

    fn respond_with_string(self: Box<Self>, text: String, customer_id: Uuid) {
        let response = Response::Text { text, customer_id };
        self.response_channel.send(response).unwrap()
    }
}
