use log::debug;

use crate::cancel::CancelToken;
use crate::core::{BlockingMode, ABSOLUTE_MAX_SEGMENT_SIZE};
use crate::errors::{MailslotError, Result};
use crate::message::Message;
use crate::slot::{Direction, Slot};

impl Slot {
    /// Removes the head message and returns its payload. Never cancelled.
    pub fn read(&self, max_len: usize) -> Result<Vec<u8>> {
        self.read_cancellable(max_len, &CancelToken::new())
    }

    pub fn read_cancellable(&self, max_len: usize, cancel: &CancelToken) -> Result<Vec<u8>> {
        Ok(self.take(max_len, cancel)?.into_payload())
    }

    /// Copies the head message into `buf` and returns its size.
    pub fn read_into(&self, buf: &mut [u8], cancel: &CancelToken) -> Result<usize> {
        let message = self.take(buf.len(), cancel)?;
        let len = message.len();
        buf[..len].copy_from_slice(message.as_bytes());
        Ok(len)
    }

    /// Detaches the head message once one exists and fits in `max_len` bytes.
    ///
    /// A head message larger than the request stays queued for a later reader.
    fn take(&self, max_len: usize, cancel: &CancelToken) -> Result<Message> {
        debug!("slot {}: read of up to {} bytes", self.id(), max_len);
        if max_len == 0 {
            return Err(MailslotError::InvalidLength);
        }
        // Clamped to the hard ceiling, not to the slot's current writer limit.
        let max_len = max_len.min(ABSOLUTE_MAX_SEGMENT_SIZE);

        let mut state = self.acquire(self.read_mode(), cancel)?;
        let head_len = loop {
            if let Some(head) = state.queue.front() {
                break head.len();
            }
            if self.read_mode() == BlockingMode::NonBlocking {
                debug!("slot {}: nothing to read in non-blocking mode", self.id());
                return Err(MailslotError::WouldBlock);
            }
            state = self.suspend(state, Direction::Read, cancel)?;
        };

        if max_len < head_len {
            debug!(
                "slot {}: read of {} bytes is smaller than the {}-byte head message",
                self.id(),
                max_len,
                head_len
            );
            // The message stays queued; let a parked reader with a bigger buffer try.
            state.pending_readers.notify_one();
            return Err(MailslotError::BufferTooSmall {
                needed: head_len,
                available: max_len,
            });
        }

        let message = match state.pop() {
            Some(message) => message,
            None => return Err(self.mark_corrupt("queue emptied under the lock")),
        };
        // Every writer re-checks its own length against the freed space.
        state.pending_writers.notify_all();
        drop(state);
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use crate::cancel::CancelToken;
    use crate::core::{BlockingMode, SlotConfig, ABSOLUTE_MAX_SEGMENT_SIZE, CAPACITY};
    use crate::errors::{MailslotError, Result};
    use crate::slot::Slot;

    fn slot() -> Slot {
        Slot::new(1, &SlotConfig::default()).unwrap()
    }

    #[test]
    fn hello_round_trip_restores_space() -> Result<()> {
        let s = slot();
        let before = s.free_space()?;
        s.write(b"hello")?;
        assert_eq!(s.free_space()?, before - 5);
        assert_eq!(s.read(5)?, b"hello".to_vec());
        assert_eq!(s.free_space()?, before);
        Ok(())
    }

    #[test]
    fn zero_length_read() {
        assert!(matches!(slot().read(0), Err(MailslotError::InvalidLength)));
    }

    #[test]
    fn small_buffer_leaves_message_queued() -> Result<()> {
        let s = slot();
        s.write(b"hello")?;
        match s.read(3) {
            Err(MailslotError::BufferTooSmall { needed, available }) => {
                assert_eq!((needed, available), (5, 3));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(s.queued_messages()?, 1);
        assert_eq!(s.free_space()?, CAPACITY - 5);
        assert_eq!(s.read(64)?, b"hello".to_vec());
        Ok(())
    }

    #[test]
    fn request_is_clamped_to_hard_ceiling() -> Result<()> {
        let s = slot();
        let full = vec![9u8; ABSOLUTE_MAX_SEGMENT_SIZE];
        s.write(&full)?;
        // The writer limit is lowered, yet a reader still gets the whole message.
        s.set_max_segment_size(16)?;
        assert_eq!(s.read(usize::MAX)?, full);
        Ok(())
    }

    #[test]
    fn non_blocking_read_on_empty_slot() -> Result<()> {
        let s = slot();
        s.set_read_mode(BlockingMode::NonBlocking)?;
        assert!(matches!(s.read(8), Err(MailslotError::WouldBlock)));
        assert_eq!(s.pending_readers()?, 0);
        assert_eq!(s.free_space()?, CAPACITY);
        Ok(())
    }

    #[test]
    fn read_into_reports_message_size() -> Result<()> {
        let s = slot();
        s.write(b"abc")?;
        let mut buf = [0u8; 16];
        let n = s.read_into(&mut buf, &CancelToken::new())?;
        assert_eq!(n, 3);
        assert_eq!(&buf[..n], b"abc");
        Ok(())
    }

    #[test]
    fn boundaries_and_order_preserved() -> Result<()> {
        let s = slot();
        let messages: Vec<Vec<u8>> = (1..=50usize)
            .map(|i| vec![(i % 251) as u8; i * 7 % ABSOLUTE_MAX_SEGMENT_SIZE + 1])
            .collect();
        for m in &messages {
            s.write(m)?;
        }
        for m in &messages {
            assert_eq!(&s.read(ABSOLUTE_MAX_SEGMENT_SIZE)?, m);
        }
        assert_eq!(s.free_space()?, CAPACITY);
        Ok(())
    }
}
