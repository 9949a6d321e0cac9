//! Best-effort audit trail of purchase attempts
//!
//! Lines are handed to a dedicated writer thread through a bounded channel.
//! The purchase path never waits on the file: when the queue is full the line
//! is dropped.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{debug, warn};

use crate::engine::Attempt;

/// Format the audit line for one attempt
pub fn audit_line(attempt: &Attempt, customer: uuid::Uuid) -> String {
    let result = u8::from(attempt.outcome().is_success());
    format!(
        "result:{result},localSales:{},customer:{customer}",
        attempt.local_sold
    )
}

pub struct AuditLog {
    sender: Option<Sender<String>>,
    writer_thread: Option<JoinHandle<()>>,
    dropped: AtomicU64,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("open", &self.sender.is_some())
            .field("dropped", &self.dropped)
            .finish()
    }
}

impl AuditLog {
    /// Open (or create) `path` for appending and start the writer thread
    pub fn open(path: &Path, queue: usize) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let (sender, receiver) = bounded(queue.max(1));
        let writer_thread = thread::Builder::new()
            .name(String::from("audit_writer"))
            .spawn(move || write_lines(BufWriter::new(file), receiver))?;

        Ok(Self {
            sender: Some(sender),
            writer_thread: Some(writer_thread),
            dropped: AtomicU64::new(0),
        })
    }

    /// Queue `line` for writing without blocking
    pub fn record(&self, line: String) {
        let Some(sender) = &self.sender else {
            return;
        };
        match sender.try_send(line) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("audit queue full, dropping line");
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("audit writer gone, dropping line");
            }
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stop accepting lines, write out the queue and wait for the writer
    pub fn close(mut self) {
        // closing the channel ends the writer loop once the queue is drained
        drop(self.sender.take());
        if let Some(handle) = self.writer_thread.take() {
            if handle.join().is_err() {
                warn!("audit writer panicked");
            }
        }
        let dropped = self.dropped();
        if dropped > 0 {
            warn!(dropped, "audit lines were dropped");
        }
    }
}

fn write_lines(mut out: BufWriter<File>, receiver: Receiver<String>) {
    for line in receiver.iter() {
        if let Err(err) = writeln!(out, "{line}") {
            warn!(error = %err, "failed to write audit line");
        }
        if receiver.is_empty() {
            if let Err(err) = out.flush() {
                warn!(error = %err, "failed to flush audit log");
            }
        }
    }
    if let Err(err) = out.flush() {
        warn!(error = %err, "failed to flush audit log");
    }
}
