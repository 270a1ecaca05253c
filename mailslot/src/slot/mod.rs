use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, TryLockError};

use log::{debug, error, info};

use crate::cancel::CancelToken;
use crate::core::{check_segment_size, BlockingMode, SlotConfig, ABSOLUTE_MAX_SEGMENT_SIZE, CAPACITY};
use crate::errors::{MailslotError, Result};
use crate::message::Message;
use crate::wait_list::{Wake, WaitList};

/// Which side of the slot a caller waits on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Read,
    Write,
}

/// Everything guarded by the slot lock.
#[derive(Debug, Default)]
pub(crate) struct SlotState {
    pub(crate) queue: VecDeque<Message>,
    pub(crate) used_space: usize,
    pub(crate) pending_readers: WaitList,
    pub(crate) pending_writers: WaitList,
}

impl SlotState {
    #[inline]
    pub(crate) fn fits(&self, len: usize) -> bool {
        self.used_space + len <= CAPACITY
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.used_space += message.len();
        self.queue.push_back(message);
    }

    pub(crate) fn pop(&mut self) -> Option<Message> {
        let message = self.queue.pop_front()?;
        self.used_space -= message.len();
        Some(message)
    }

    #[inline]
    fn wait_list(&mut self, direction: Direction) -> &mut WaitList {
        match direction {
            Direction::Read => &mut self.pending_readers,
            Direction::Write => &mut self.pending_writers,
        }
    }
}

/// One independent FIFO mailslot.
///
/// The configuration fields are atomics so the suspend loops can re-read them
/// between wake-ups; they are only ever stored while the state lock is held.
#[derive(Debug)]
pub struct Slot {
    id: usize,
    state: Mutex<SlotState>,
    max_segment_size: AtomicUsize,
    read_blocking: AtomicBool,
    write_blocking: AtomicBool,
    corrupt: AtomicBool,
}

impl Slot {
    pub fn new(id: usize, cfg: &SlotConfig) -> Result<Slot> {
        let max_segment_size = check_segment_size(cfg.max_segment_size)?;
        Ok(Slot {
            id,
            state: Mutex::new(SlotState::default()),
            max_segment_size: AtomicUsize::new(max_segment_size),
            read_blocking: AtomicBool::new(cfg.read_mode.is_blocking()),
            write_blocking: AtomicBool::new(cfg.write_mode.is_blocking()),
            corrupt: AtomicBool::new(false),
        })
    }

    pub fn with_defaults(id: usize) -> Slot {
        Slot {
            id,
            state: Mutex::new(SlotState::default()),
            max_segment_size: AtomicUsize::new(ABSOLUTE_MAX_SEGMENT_SIZE),
            read_blocking: AtomicBool::new(true),
            write_blocking: AtomicBool::new(true),
            corrupt: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn mode(&self, direction: Direction) -> BlockingMode {
        let flag = match direction {
            Direction::Read => &self.read_blocking,
            Direction::Write => &self.write_blocking,
        };
        BlockingMode::from_flag(flag.load(Ordering::Acquire))
    }

    /// Flags the slot as unusable and builds the error every later call returns.
    pub(crate) fn mark_corrupt(&self, reason: &'static str) -> MailslotError {
        if !self.corrupt.swap(true, Ordering::SeqCst) {
            error!("slot {}: {}, service damaged", self.id, reason);
        }
        MailslotError::CorruptState {
            slot: self.id,
            reason,
        }
    }

    #[inline]
    fn ensure_healthy(&self) -> Result<()> {
        if self.corrupt.load(Ordering::SeqCst) {
            return Err(MailslotError::CorruptState {
                slot: self.id,
                reason: "slot disabled after an earlier invariant violation",
            });
        }
        Ok(())
    }

    /// Takes the lock regardless of mode; used for bookkeeping that must happen.
    pub(crate) fn lock_state(&self) -> Result<MutexGuard<'_, SlotState>> {
        self.state
            .lock()
            .map_err(|_| self.mark_corrupt("lock poisoned"))
    }

    /// Blocking mode waits for the lock unless the caller is already cancelled,
    /// non-blocking mode gives up at once.
    pub(crate) fn acquire(
        &self,
        mode: BlockingMode,
        cancel: &CancelToken,
    ) -> Result<MutexGuard<'_, SlotState>> {
        self.ensure_healthy()?;
        match mode {
            BlockingMode::Blocking => {
                if cancel.is_cancelled() {
                    return Err(MailslotError::Cancelled);
                }
                self.lock_state()
            }
            BlockingMode::NonBlocking => match self.state.try_lock() {
                Ok(guard) => Ok(guard),
                Err(TryLockError::WouldBlock) => {
                    debug!("slot {}: lock busy in non-blocking mode", self.id);
                    Err(MailslotError::WouldBlock)
                }
                Err(TryLockError::Poisoned(_)) => Err(self.mark_corrupt("lock poisoned")),
            },
        }
    }

    /// Parks the caller on `direction`'s wait list and returns with the lock held
    /// again, taken under whatever blocking mode is current at wake-up.
    ///
    /// On every exit path the caller's wait-list entry is gone.
    pub(crate) fn suspend<'a>(
        &'a self,
        mut guard: MutexGuard<'a, SlotState>,
        direction: Direction,
        cancel: &CancelToken,
    ) -> Result<MutexGuard<'a, SlotState>> {
        let waiter = guard.wait_list(direction).enqueue();
        drop(guard);

        debug!("slot {}: {:?} caller goes to sleep", self.id, direction);
        let wake = waiter.park(cancel);

        let reacquired = match wake {
            Wake::Cancelled => Err(MailslotError::Cancelled),
            Wake::Notified => self.acquire(self.mode(direction), cancel),
        };
        let mut guard = match reacquired {
            Ok(guard) => guard,
            Err(err @ MailslotError::CorruptState { .. }) => return Err(err),
            Err(err) => {
                // Not allowed to continue, but the entry still has to go.
                let mut guard = self.lock_state()?;
                if !guard.wait_list(direction).remove(&waiter) {
                    return Err(self.mark_corrupt("waiter missing from its wait list"));
                }
                if direction == Direction::Read && waiter.is_notified() {
                    guard.pending_readers.notify_one();
                }
                debug!("slot {}: {:?} caller left the wait list: {}", self.id, direction, err);
                return Err(err);
            }
        };

        if !guard.wait_list(direction).remove(&waiter) {
            return Err(self.mark_corrupt("waiter missing from its wait list"));
        }
        debug!("slot {}: {:?} caller has been woken up", self.id, direction);
        Ok(guard)
    }

    pub fn max_segment_size(&self) -> usize {
        self.max_segment_size.load(Ordering::Acquire)
    }

    /// Applies to writes issued after the call; queued messages are left alone.
    pub fn set_max_segment_size(&self, n: usize) -> Result<()> {
        self.ensure_healthy()?;
        let n = check_segment_size(n)?;
        let _guard = self.lock_state()?;
        self.max_segment_size.store(n, Ordering::Release);
        info!("slot {}: max segment size set to {}", self.id, n);
        Ok(())
    }

    pub fn read_mode(&self) -> BlockingMode {
        self.mode(Direction::Read)
    }

    pub fn write_mode(&self) -> BlockingMode {
        self.mode(Direction::Write)
    }

    pub fn set_read_mode(&self, mode: BlockingMode) -> Result<()> {
        self.ensure_healthy()?;
        let _guard = self.lock_state()?;
        self.read_blocking.store(mode.is_blocking(), Ordering::Release);
        info!("slot {}: read mode set to {}", self.id, mode);
        Ok(())
    }

    pub fn set_write_mode(&self, mode: BlockingMode) -> Result<()> {
        self.ensure_healthy()?;
        let _guard = self.lock_state()?;
        self.write_blocking.store(mode.is_blocking(), Ordering::Release);
        info!("slot {}: write mode set to {}", self.id, mode);
        Ok(())
    }

    pub fn free_space(&self) -> Result<usize> {
        Ok(CAPACITY - self.used_space()?)
    }

    pub fn used_space(&self) -> Result<usize> {
        self.ensure_healthy()?;
        Ok(self.lock_state()?.used_space)
    }

    pub fn queued_messages(&self) -> Result<usize> {
        self.ensure_healthy()?;
        Ok(self.lock_state()?.queue.len())
    }

    pub fn pending_readers(&self) -> Result<usize> {
        self.ensure_healthy()?;
        Ok(self.lock_state()?.pending_readers.len())
    }

    pub fn pending_writers(&self) -> Result<usize> {
        self.ensure_healthy()?;
        Ok(self.lock_state()?.pending_writers.len())
    }

    /// Drops every queued message and returns how many there were.
    pub(crate) fn drain(&mut self) -> usize {
        let state = match self.state.get_mut() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        let dropped = state.queue.len();
        state.queue.clear();
        state.used_space = 0;
        dropped
    }
}
