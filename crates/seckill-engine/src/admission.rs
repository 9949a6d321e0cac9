//! Single-slot admission token serializing stock mutations

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

/// Admits at most one holder at a time to the guarded value
///
/// Waiting is bounded by the timeout given at construction. Waiters are not
/// served in arrival order.
#[derive(Debug)]
pub struct Admission<T> {
    slot: Mutex<T>,
    timeout: Duration,
}

/// Proof of holding the admission slot
///
/// The slot is released when the token is dropped, on every exit path.
#[derive(Debug)]
pub struct AdmissionToken<'a, T>(MutexGuard<'a, T>);

impl<T> Admission<T> {
    /// Create a new [`Admission`] guarding `value`.
    pub fn new(value: T, timeout: Duration) -> Self {
        Self {
            slot: Mutex::new(value),
            timeout,
        }
    }

    /// Wait for the slot.
    ///
    /// Returns [`None`] if the slot did not become free within the timeout.
    /// A waiter that gives up leaves the guarded value untouched.
    pub fn acquire(&self) -> Option<AdmissionToken<'_, T>> {
        self.slot.try_lock_for(self.timeout).map(AdmissionToken)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[cfg(test)]
    pub fn into_inner(self) -> T {
        self.slot.into_inner()
    }
}

impl<T> Deref for AdmissionToken<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for AdmissionToken<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;
    use std::thread;

    use super::*;

    #[test]
    fn holders_never_overlap() {
        let admission = Admission::new(0u32, Duration::from_secs(10));
        let inside = AtomicBool::new(false);
        let (seen_send, seen_recv) = mpsc::channel();

        thread::scope(|s| {
            for _ in 0..16 {
                let seen_send = seen_send.clone();
                let admission = &admission;
                let inside = &inside;
                s.spawn(move || {
                    for _ in 0..100 {
                        let mut token = admission.acquire().unwrap();
                        assert!(!inside.swap(true, Ordering::SeqCst), "two holders at once");
                        let before = *token;
                        thread::yield_now();
                        *token = before + 1;
                        seen_send.send(before).unwrap();
                        inside.store(false, Ordering::SeqCst);
                    }
                });
            }
        });
        drop(seen_send);

        let seen: Vec<u32> = seen_recv.into_iter().collect();
        let distinct: HashSet<u32> = seen.iter().copied().collect();
        assert_eq!(seen.len(), 1_600);
        assert_eq!(distinct.len(), 1_600, "a pre-increment value was observed twice");
        assert_eq!(admission.into_inner(), 1_600);
    }

    #[test]
    fn gives_up_after_timeout() {
        let admission = Admission::new(7u32, Duration::from_millis(20));
        let held = admission.acquire().unwrap();

        thread::scope(|s| {
            let waiter = s.spawn(|| admission.acquire().is_none());
            assert!(waiter.join().unwrap());
        });

        assert_eq!(*held, 7);
        drop(held);
        assert!(admission.acquire().is_some(), "slot must be free after release");
    }

    #[test]
    fn released_when_holder_panics() {
        let admission = Admission::new(0u32, Duration::from_millis(200));

        let result = thread::scope(|s| {
            s.spawn(|| {
                let mut token = admission.acquire().unwrap();
                *token += 1;
                panic!("holder died");
            })
            .join()
        });
        assert!(result.is_err());

        let token = admission.acquire().expect("slot must be released on unwind");
        assert_eq!(*token, 1);
    }
}
