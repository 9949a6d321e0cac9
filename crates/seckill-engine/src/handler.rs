//! Implementation of the request handler
use std::sync::Arc;

use seckill_core::{Request, RequestHandler, RequestKind};
use tracing::debug;

use crate::audit::{audit_line, AuditLog};
use crate::engine::SpikeEngine;

/// Request handler in front of the [`SpikeEngine`]
///
/// ⚠️ This struct implements the [`RequestHandler`] trait and is exposed from
/// the crate root, so the HTTP server and the tester use it as
/// `seckill_engine::SpikeHandler`.
#[derive(Debug)]
pub struct SpikeHandler {
    engine: Arc<SpikeEngine>,
    audit: AuditLog,
}

impl SpikeHandler {
    /// Create a new [`SpikeHandler`]
    pub fn new(engine: Arc<SpikeEngine>, audit: AuditLog) -> Self {
        Self { engine, audit }
    }

    pub fn engine(&self) -> &Arc<SpikeEngine> {
        &self.engine
    }
}

impl RequestHandler for SpikeHandler {
    fn handle(&self, rq: Request) {
        match rq.kind() {
            RequestKind::BuyTicket => {
                let customer = rq.customer_id();
                let attempt = self.engine.attempt();
                debug!(%customer, event = attempt.event.label(), "purchase attempt");
                rq.respond_with_outcome(attempt.outcome());
                // the buyer already has the answer; the audit line is best effort
                self.audit.record(audit_line(&attempt, customer));
            }
            RequestKind::Stats => {
                rq.respond_with_stats(self.engine.stats());
            }
            RequestKind::Debug => {
                rq.respond_with_string("Happy Debugging! 🚫🐛");
            }
        }
    }

    fn shutdown(self) {
        // flush the audit trail
        self.audit.close();
    }
}
