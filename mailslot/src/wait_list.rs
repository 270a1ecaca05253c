use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::cancel::CancelToken;

/// How a parked caller came back.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Wake {
    Notified,
    Cancelled,
}

/// Resumable handle for one suspended caller. A fresh waiter is made for every
/// suspension, so the notified flag never needs resetting.
#[derive(Debug, Default)]
pub struct Waiter {
    notified: Mutex<bool>,
    cv: Condvar,
}

#[inline]
fn lock_flag(m: &Mutex<bool>) -> MutexGuard<'_, bool> {
    // The flag is a plain bool, a panic elsewhere cannot leave it half-written.
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Waiter {
    pub fn new() -> Arc<Waiter> {
        Arc::new(Waiter::default())
    }

    /// Returns false when the waiter had already been notified.
    pub fn notify(&self) -> bool {
        let mut notified = lock_flag(&self.notified);
        if *notified {
            return false;
        }
        *notified = true;
        self.cv.notify_one();
        true
    }

    pub fn is_notified(&self) -> bool {
        *lock_flag(&self.notified)
    }

    /// Wakes the parked thread without marking it notified, so it re-checks the token.
    pub(crate) fn interrupt(&self) {
        let _guard = lock_flag(&self.notified);
        self.cv.notify_all();
    }

    /// Blocks the calling thread until notified or until `cancel` fires.
    /// Cancellation wins when both happened.
    pub fn park(self: &Arc<Self>, cancel: &CancelToken) -> Wake {
        let _registration = cancel.register(self);
        let mut notified = lock_flag(&self.notified);
        loop {
            if cancel.is_cancelled() {
                return Wake::Cancelled;
            }
            if *notified {
                return Wake::Notified;
            }
            notified = self
                .cv
                .wait(notified)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// FIFO of suspended callers for one direction of one slot.
///
/// Entries are pushed and removed only while the owning slot's lock is held, and
/// only the waiter itself removes its entry.
#[derive(Debug, Default)]
pub struct WaitList {
    waiters: VecDeque<Arc<Waiter>>,
}

impl WaitList {
    pub fn new() -> WaitList {
        WaitList::default()
    }

    pub fn enqueue(&mut self) -> Arc<Waiter> {
        let waiter = Waiter::new();
        self.waiters.push_back(Arc::clone(&waiter));
        waiter
    }

    /// Returns false when the entry is missing, which means the list is damaged.
    pub fn remove(&mut self, waiter: &Arc<Waiter>) -> bool {
        match self.waiters.iter().position(|w| Arc::ptr_eq(w, waiter)) {
            Some(pos) => {
                self.waiters.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Notifies the oldest waiter that has not been notified yet.
    ///
    /// Waiters already woken but not yet back under the lock are skipped; waking
    /// them again would swallow the notification.
    pub fn notify_one(&self) -> bool {
        self.waiters.iter().any(|w| w.notify())
    }

    pub fn notify_all(&self) -> usize {
        self.waiters.iter().filter(|w| w.notify()).count()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}
