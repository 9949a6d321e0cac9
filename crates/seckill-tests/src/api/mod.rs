use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use eyre::Result;
use flume::Sender;
use seckill_core::{Outcome, RequestKind, StatsSnapshot};
use tokio::sync::oneshot;
use uuid::Uuid;

pub mod mock;

#[derive(Debug)]
enum Response {
    Outcome { outcome: Outcome, customer_id: Uuid },
    Stats { stats: StatsSnapshot, customer_id: Uuid },
    Text { text: String, customer_id: Uuid },
}

struct RequestMsg {
    kind: RequestKind,
    customer_id: Uuid,
    response_channel: oneshot::Sender<Response>,
}

pub struct Api {
    /// One channel per handler thread
    channels: Arc<Vec<Sender<RequestMsg>>>,
    /// Channel the next clone is bound to
    next_index: Arc<AtomicUsize>,

    my_channel: Sender<RequestMsg>,
}

impl Api {
    fn new(channels: Vec<Sender<RequestMsg>>) -> Self {
        let my_channel = channels[0].clone();
        Self {
            channels: Arc::new(channels),
            next_index: Arc::new(AtomicUsize::new(1)),
            my_channel,
        }
    }
}

impl Clone for Api {
    fn clone(&self) -> Self {
        // spread clones over the handler threads
        let my_index = self.next_index.fetch_add(1, Ordering::Relaxed) % self.channels.len();
        Self {
            channels: self.channels.clone(),
            next_index: self.next_index.clone(),
            my_channel: self.channels[my_index].clone(),
        }
    }
}

impl Api {
    async fn make_request(&self, kind: RequestKind, customer_id: Option<Uuid>) -> Result<Response> {
        let (sender, receiver) = oneshot::channel();
        let msg = RequestMsg {
            kind,
            customer_id: customer_id.unwrap_or_else(Uuid::new_v4),
            response_channel: sender,
        };
        self.my_channel.send_async(msg).await?;
        Ok(receiver.await?)
    }

    pub async fn buy_ticket(&self, customer_id: Option<Uuid>) -> Result<ApiResponse<Outcome>> {
        let kind = RequestKind::BuyTicket;
        Ok(match self.make_request(kind, customer_id).await? {
            Response::Outcome {
                outcome,
                customer_id,
            } => ApiResponse {
                customer_id,
                result: outcome,
            },
            resp => panic!("{kind:?} must not be answered by {resp:?}"),
        })
    }

    pub async fn get_stats(&self) -> Result<ApiResponse<StatsSnapshot>> {
        let kind = RequestKind::Stats;
        Ok(match self.make_request(kind, None).await? {
            Response::Stats { stats, customer_id } => ApiResponse {
                customer_id,
                result: stats,
            },
            resp => panic!("{kind:?} must not be answered by {resp:?}"),
        })
    }

    pub async fn debug(&self) -> Result<ApiResponse<String>> {
        let kind = RequestKind::Debug;
        Ok(match self.make_request(kind, None).await? {
            Response::Text { text, customer_id } => ApiResponse {
                customer_id,
                result: text,
            },
            resp => panic!("{kind:?} must not be answered by {resp:?}"),
        })
    }

    pub fn create_user_session(&self) -> UserSession {
        UserSession {
            api: self,
            customer_id: Uuid::new_v4(),
            purchased: 0,
        }
    }
}

pub struct ApiResponse<T> {
    pub customer_id: Uuid,
    pub result: T,
}

pub struct UserSession<'a> {
    pub api: &'a Api,
    pub customer_id: Uuid,
    /// Tickets this customer got so far
    pub purchased: u32,
}

impl UserSession<'_> {
    pub async fn buy_ticket(&mut self) -> Result<ApiResponse<Outcome>> {
        let response = self.api.buy_ticket(Some(self.customer_id)).await?;
        if response.result.is_success() {
            self.purchased += 1;
        }
        Ok(response)
    }
}
