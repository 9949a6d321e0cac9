use uuid::Uuid;

/// Kind of the request
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum RequestKind {
    /// Try to buy one unit of the stock on sale
    ///
    /// The request carries no payload. It is answered with an [`Outcome`].
    BuyTicket,

    /// Retrieve a snapshot of the local stock and the outcome counters
    Stats,

    /// Useful for sending information for debugging
    Debug,
}

/// Result of a purchase attempt as seen by the buyer
///
/// There is no third "try again" state: store failures and admission
/// timeouts are reported as [`Outcome::SoldOut`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Outcome {
    /// One unit was deducted from the authoritative record
    Success,
    /// Nothing was sold to this request
    SoldOut,
}

impl Outcome {
    /// Numeric code of the JSON response body
    #[inline]
    pub fn code(self) -> i32 {
        match self {
            Outcome::Success => 1,
            Outcome::SoldOut => -1,
        }
    }

    /// Message of the JSON response body
    #[inline]
    pub fn message(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::SoldOut => "sold out",
        }
    }

    /// Whether a unit was sold
    #[inline]
    pub fn is_success(self) -> bool {
        self == Outcome::Success
    }
}

/// Point-in-time view of the engine's local stock and counters
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct StatsSnapshot {
    /// Local slice of the stock
    pub local_capacity: u32,
    /// Units that passed the local gate so far
    pub local_sold: u32,
    /// Purchases confirmed by the store
    pub success: u64,
    /// Requests turned down by the local gate
    pub local_rejected: u64,
    /// Requests the store denied because the record is exhausted
    pub remote_denied: u64,
    /// Requests that failed because the store could not be reached or
    /// the script failed
    pub remote_failed: u64,
    /// Requests that gave up waiting for the admission token
    pub admission_timeout: u64,
}

/// Request sent from a buyer
pub struct Request {
    kind: RequestKind,
    customer: Uuid,
    raw: Box<dyn RawRequest + Send>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("kind", &self.kind)
            .field("customer", &self.customer)
            .field("raw", &format_args!(".."))
            .finish()
    }
}

/// Interface for handling requests from buyers
pub trait RequestHandler {
    /// Handle a request
    ///
    /// This method may be called concurrently from different threads.
    fn handle(&self, request: Request);

    /// Shut the engine down
    ///
    /// This method waits for all threads spawned by the engine (e.g., the
    /// audit writer) to have terminated.
    fn shutdown(self);
}

/// A raw request, implemented by the HTTP server
pub trait RawRequest {
    /// Respond with the outcome of a purchase attempt
    fn respond_with_outcome(self: Box<Self>, outcome: Outcome, customer: Uuid);
    /// Respond with a stats snapshot
    fn respond_with_stats(self: Box<Self>, stats: StatsSnapshot, customer: Uuid);
    /// Respond with a string
    fn respond_with_string(self: Box<Self>, s: String, customer: Uuid);
}

impl Request {
    /// Get the request's kind
    #[inline]
    pub fn kind(&self) -> &RequestKind {
        &self.kind
    }

    /// Get the customer's id
    ///
    /// If the customer did not send the corresponding HTTP header, it is
    /// randomly generated.
    #[inline]
    pub fn customer_id(&self) -> Uuid {
        self.customer
    }

    /// Respond with the outcome of a purchase attempt.
    ///
    /// This method blocks until the response has been sent.
    #[inline]
    pub fn respond_with_outcome(self, outcome: Outcome) {
        self.raw.respond_with_outcome(outcome, self.customer);
    }

    /// Respond with a stats snapshot.
    ///
    /// This method blocks until the response has been sent.
    #[inline]
    pub fn respond_with_stats(self, stats: StatsSnapshot) {
        self.raw.respond_with_stats(stats, self.customer);
    }

    /// Respond with an arbitrary string
    ///
    /// This method blocks until the response has been sent.
    #[inline]
    pub fn respond_with_string(self, s: impl Into<String>) {
        self.raw.respond_with_string(s.into(), self.customer);
    }

    /// Create a new request from a [`RawRequest`]
    ///
    /// Used by the HTTP server and by testing infrastructure.
    #[inline]
    pub fn from_raw(kind: RequestKind, customer: Uuid, raw: Box<dyn RawRequest + Send>) -> Self {
        Self {
            kind,
            customer,
            raw,
        }
    }
}
