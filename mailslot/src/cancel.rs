use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use log::info;
use signal_hook::iterator::Signals;

use crate::errors::Result;
use crate::wait_list::Waiter;

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    parked: Mutex<Vec<Arc<Waiter>>>,
}

/// Cooperative cancellation shared by any number of callers.
///
/// Once cancelled a token stays cancelled; every wait that observes it returns
/// `Cancelled`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

pub(crate) struct Registration<'a> {
    token: &'a CancelToken,
    waiter: Arc<Waiter>,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let mut parked = self
            .token
            .inner
            .parked
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(pos) = parked.iter().position(|w| Arc::ptr_eq(w, &self.waiter)) {
            parked.swap_remove(pos);
        }
    }
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let parked: Vec<Arc<Waiter>> = self
            .inner
            .parked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for waiter in parked {
            waiter.interrupt();
        }
    }

    pub(crate) fn register(&self, waiter: &Arc<Waiter>) -> Registration<'_> {
        self.inner
            .parked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(waiter));
        Registration {
            token: self,
            waiter: Arc::clone(waiter),
        }
    }

    /// Cancels this token when any of `signals` is delivered to the process.
    pub fn cancel_on_signals(&self, signals: &[i32]) -> Result<thread::JoinHandle<()>> {
        let mut signals = Signals::new(signals)?;
        let token = self.clone();
        let handle = thread::Builder::new()
            .name("mailslot-signals".to_string())
            .spawn(move || {
                if let Some(sig) = signals.forever().next() {
                    info!("signal {} received, cancelling pending waits", sig);
                    token.cancel();
                }
            })?;
        Ok(handle)
    }
}
