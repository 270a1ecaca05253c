use log::debug;

use crate::cancel::CancelToken;
use crate::core::BlockingMode;
use crate::errors::{MailslotError, Result};
use crate::message::Message;
use crate::slot::{Direction, Slot};

impl Slot {
    /// Appends `bytes` as one message and returns its length. Never cancelled.
    pub fn write(&self, bytes: &[u8]) -> Result<usize> {
        self.write_cancellable(bytes, &CancelToken::new())
    }

    /// Appends `bytes` as one message, waiting for room when the slot is full and
    /// writes are blocking.
    pub fn write_cancellable(&self, bytes: &[u8], cancel: &CancelToken) -> Result<usize> {
        let len = bytes.len();
        let limit = self.max_segment_size();
        debug!("slot {}: write of {} bytes", self.id(), len);
        if len == 0 || len > limit {
            return Err(MailslotError::MessageTooLarge { len, limit });
        }

        // Copy before locking so allocation never stalls other lock holders.
        let message = Message::copy_from(bytes);

        let mut state = self.acquire(self.write_mode(), cancel)?;
        while !state.fits(len) {
            if self.write_mode() == BlockingMode::NonBlocking {
                debug!("slot {}: insufficient space for a non-blocking write", self.id());
                return Err(MailslotError::WouldBlock);
            }
            state = self.suspend(state, Direction::Write, cancel)?;
        }

        state.push(message);
        // One new message can satisfy at most one pending read.
        state.pending_readers.notify_one();
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{BlockingMode, SlotConfig, ABSOLUTE_MAX_SEGMENT_SIZE, CAPACITY};
    use crate::errors::{MailslotError, Result};
    use crate::slot::Slot;

    fn slot() -> Slot {
        Slot::new(0, &SlotConfig::default()).unwrap()
    }

    #[test]
    fn write_accounts_space() -> Result<()> {
        let s = slot();
        assert_eq!(s.write(b"hello")?, 5);
        assert_eq!(s.free_space()?, CAPACITY - 5);
        assert_eq!(s.queued_messages()?, 1);
        Ok(())
    }

    #[test]
    fn rejects_empty_and_oversized() -> Result<()> {
        let s = slot();
        assert!(matches!(
            s.write(b""),
            Err(MailslotError::MessageTooLarge { len: 0, .. })
        ));
        let big = vec![0u8; ABSOLUTE_MAX_SEGMENT_SIZE + 1];
        assert!(matches!(s.write(&big), Err(MailslotError::MessageTooLarge { .. })));
        assert_eq!(s.free_space()?, CAPACITY);
        Ok(())
    }

    #[test]
    fn lowered_segment_limit() -> Result<()> {
        let s = slot();
        s.write(b"queued before")?;
        s.set_max_segment_size(2)?;
        match s.write(b"abcd") {
            Err(MailslotError::MessageTooLarge { len, limit }) => {
                assert_eq!((len, limit), (4, 2));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(s.write(b"ab")?, 2);
        // Messages written under the old limit stay readable.
        assert_eq!(s.read(ABSOLUTE_MAX_SEGMENT_SIZE)?, b"queued before".to_vec());
        Ok(())
    }

    #[test]
    fn non_blocking_write_on_full_slot() -> Result<()> {
        let s = slot();
        s.set_write_mode(BlockingMode::NonBlocking)?;
        let chunk = vec![7u8; ABSOLUTE_MAX_SEGMENT_SIZE];
        for _ in 0..CAPACITY / ABSOLUTE_MAX_SEGMENT_SIZE {
            s.write(&chunk)?;
        }
        assert_eq!(s.free_space()?, 0);
        assert!(matches!(s.write(b"x"), Err(MailslotError::WouldBlock)));
        assert_eq!(s.free_space()?, 0);
        assert_eq!(s.queued_messages()?, CAPACITY / ABSOLUTE_MAX_SEGMENT_SIZE);
        assert_eq!(s.pending_writers()?, 0);
        Ok(())
    }
}
