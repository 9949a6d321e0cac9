//! Implementation of the process-local stock gate

/// Slice of the stock this process may sell before every further request is
/// turned away without asking the store
///
/// The gate is only reachable through an [`AdmissionToken`], so the
/// check-and-increment in [`LocalSpike::try_deduct`] never runs concurrently.
///
/// [`AdmissionToken`]: crate::admission::AdmissionToken
#[derive(Debug)]
pub struct LocalSpike {
    /// Units this process may sell, fixed at startup
    capacity: u32,
    /// Units that passed the gate; never decreases
    sold: u32,
}

impl LocalSpike {
    /// Create a new [`LocalSpike`] with nothing sold yet.
    pub fn new(capacity: u32) -> Self {
        Self { capacity, sold: 0 }
    }

    /// Take one unit from the local slice.
    ///
    /// Returns `false` once the slice is exhausted. A unit taken here is not
    /// given back when the store later turns the request down.
    pub fn try_deduct(&mut self) -> bool {
        if self.sold < self.capacity {
            self.sold += 1;
            true
        } else {
            false
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn sold(&self) -> u32 {
        self.sold
    }

    #[cfg(test)]
    pub fn remaining(&self) -> u32 {
        self.capacity - self.sold
    }
}
