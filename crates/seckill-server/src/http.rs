//! 🏗 HTTP request implementation

use std::io::{Read, Write};

use seckill_core::{Outcome, RequestKind, StatsSnapshot};
use serde_json::json;
use tiny_http::{Header, Response};
use tracing::warn;
use uuid::Uuid;

/// Length of any hyphenated UUID
const UUID_LEN: usize = b"a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8".len();

struct HTTPRequest(tiny_http::Request);

impl seckill_core::RawRequest for HTTPRequest {
    fn respond_with_outcome(self: Box<Self>, outcome: Outcome, customer: Uuid) {
        let body = json!({ "code": outcome.code(), "msg": outcome.message() });
        self.respond_json(body, customer)
    }

    fn respond_with_stats(self: Box<Self>, stats: StatsSnapshot, customer: Uuid) {
        let body = json!({
            "local_capacity": stats.local_capacity,
            "local_sold": stats.local_sold,
            "success": stats.success,
            "local_rejected": stats.local_rejected,
            "remote_denied": stats.remote_denied,
            "remote_failed": stats.remote_failed,
            "admission_timeout": stats.admission_timeout,
        });
        self.respond_json(body, customer)
    }

    fn respond_with_string(self: Box<Self>, s: String, customer: Uuid) {
        self.respond(Response::from_string(s).with_status_code(200), customer)
    }
}

impl HTTPRequest {
    fn respond_json(self, body: serde_json::Value, customer: Uuid) {
        let mut res = Response::from_string(body.to_string()).with_status_code(200);
        add_header(&mut res, b"Content-Type", b"application/json");
        self.respond(res, customer)
    }

    /// Add HTTP headers (CORS, X-Customer-Id) to `res` and send it
    fn respond<R: Read>(self, mut res: Response<R>, customer: Uuid) {
        add_response_cors_headers(&mut res);

        let mut cid = Vec::<u8>::with_capacity(UUID_LEN);
        // writing into a Vec cannot fail
        let _ = write!(&mut cid, "{}", customer.hyphenated());
        add_header(&mut res, b"X-Customer-Id", &cid);

        send(self.0, res);
    }
}

/// Send `res`; a buyer that hung up is not an error worth more than a warning
fn send<R: Read>(rq: tiny_http::Request, res: Response<R>) {
    if let Err(err) = rq.respond(res) {
        warn!(error = %err, "HTTP response failed");
    }
}

/// Parse the given HTTP request
///
/// If [`None`] is returned, the request was already answered with a
/// corresponding error message.
pub fn parse(rq: tiny_http::Request) -> Option<seckill_core::Request> {
    use tiny_http::Method::*;

    let kind = match (rq.method(), rq.url()) {
        (Options, _) => {
            let mut res = Response::empty(204);
            add_response_cors_headers(&mut res);
            send(rq, res);
            return None;
        }
        (Get, "/buy/ticket") | (Post, "/buy/ticket") => RequestKind::BuyTicket,
        (Get, "/api/stats") => RequestKind::Stats,
        (Get, url) | (Post, url) => {
            if url.starts_with("/api/debug") {
                RequestKind::Debug
            } else {
                let mut res = Response::from_string(
                    "🦀 could not find the service you are looking for!

Valid requests are:
  GET  /buy/ticket
  POST /buy/ticket
  GET  /api/stats
  GET  /api/debug(.*)
  POST /api/debug(.*)",
                )
                .with_status_code(404);
                add_response_cors_headers(&mut res);
                send(rq, res);
                return None;
            }
        }
        _ => {
            let mut res = Response::empty(405);
            add_response_cors_headers(&mut res);
            send(rq, res);
            return None;
        }
    };

    let mut cid = None;
    for hdr in rq.headers() {
        if hdr.field.equiv("x-customer-id") {
            if let Ok(id) = Uuid::parse_str(hdr.value.as_str()) {
                cid = Some(id);
            }
        }
    }

    Some(seckill_core::Request::from_raw(
        kind,
        cid.unwrap_or_else(Uuid::new_v4),
        Box::new(HTTPRequest(rq)),
    ))
}

fn add_header<R: Read>(res: &mut Response<R>, field: &[u8], value: &[u8]) {
    // only fails for non-ASCII input, which never reaches this point
    if let Ok(header) = Header::from_bytes(field, value) {
        res.add_header(header);
    }
}

/// Add CORS headers to `res`
fn add_response_cors_headers<R: Read>(res: &mut Response<R>) {
    add_header(res, b"Access-Control-Request-Method", b"*");
    add_header(res, b"Access-Control-Allow-Origin", b"*");
    add_header(res, b"Access-Control-Allow-Headers", b"*");
    add_header(res, b"Access-Control-Expose-Headers", b"*");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_bodies_match_wire_format() {
        let success = json!({ "code": Outcome::Success.code(), "msg": Outcome::Success.message() });
        let sold_out = json!({ "code": Outcome::SoldOut.code(), "msg": Outcome::SoldOut.message() });
        assert_eq!(success.to_string(), r#"{"code":1,"msg":"success"}"#);
        assert_eq!(sold_out.to_string(), r#"{"code":-1,"msg":"sold out"}"#);
    }
}
