use std::convert::TryFrom;

use log::{debug, info};

use crate::cancel::CancelToken;
use crate::core::BlockingMode;
use crate::errors::{MailslotError, Result};
use crate::slot::Slot;

pub const CHANGE_WRITE_BLOCKING_MODE: u32 = 3;
pub const CHANGE_READ_BLOCKING_MODE: u32 = 4;
pub const CHANGE_MAX_SEGMENT_SIZE: u32 = 5;
pub const GET_MAX_SEGMENT_SIZE: u32 = 6;
pub const GET_FREE_SPACE: u32 = 7;
pub const GET_WRITE_BLOCKING_MODE: u32 = 8;
pub const GET_READ_BLOCKING_MODE: u32 = 9;

/// An opened slot, shaped like a character device: read, write and ioctl.
#[derive(Debug, Clone)]
pub struct SlotFile<'a> {
    slot: &'a Slot,
    cancel: CancelToken,
}

impl<'a> SlotFile<'a> {
    pub(crate) fn new(slot: &'a Slot) -> SlotFile<'a> {
        SlotFile {
            slot,
            cancel: CancelToken::new(),
        }
    }

    /// Waits made through this handle end with `Cancelled` once `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancelToken) -> SlotFile<'a> {
        self.cancel = cancel;
        self
    }

    pub fn slot(&self) -> &'a Slot {
        self.slot
    }

    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.slot.read_into(buf, &self.cancel)
    }

    pub fn write(&self, bytes: &[u8]) -> Result<usize> {
        self.slot.write_cancellable(bytes, &self.cancel)
    }

    /// Dispatches a control command; getters return the value, setters return 0.
    pub fn ioctl(&self, cmd: u32, arg: u64) -> Result<u64> {
        debug!("slot {}: ioctl cmd = {}, arg = {}", self.slot.id(), cmd, arg);
        match cmd {
            CHANGE_WRITE_BLOCKING_MODE => {
                self.slot.set_write_mode(BlockingMode::try_from(arg)?)?;
                Ok(0)
            }
            CHANGE_READ_BLOCKING_MODE => {
                self.slot.set_read_mode(BlockingMode::try_from(arg)?)?;
                Ok(0)
            }
            CHANGE_MAX_SEGMENT_SIZE => {
                let n = usize::try_from(arg).map_err(|_| MailslotError::InvalidArgument {
                    what: "max segment size",
                    value: arg,
                })?;
                self.slot.set_max_segment_size(n)?;
                Ok(0)
            }
            GET_MAX_SEGMENT_SIZE => Ok(self.slot.max_segment_size() as u64),
            GET_FREE_SPACE => Ok(self.slot.free_space()? as u64),
            GET_WRITE_BLOCKING_MODE => Ok(self.slot.write_mode().raw()),
            GET_READ_BLOCKING_MODE => Ok(self.slot.read_mode().raw()),
            other => Err(MailslotError::UnknownCommand(other)),
        }
    }
}

impl Drop for SlotFile<'_> {
    fn drop(&mut self) {
        info!("close called on slot {}", self.slot.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ABSOLUTE_MAX_SEGMENT_SIZE, CAPACITY};
    use crate::registry::SlotRegistry;

    #[test]
    fn read_write_through_handle() -> Result<()> {
        let reg = SlotRegistry::new();
        let file = reg.open(9)?;
        assert_eq!(file.write(b"hello")?, 5);
        assert_eq!(file.ioctl(GET_FREE_SPACE, 0)?, (CAPACITY - 5) as u64);
        let mut buf = [0u8; 5];
        assert_eq!(file.read(&mut buf)?, 5);
        assert_eq!(&buf, b"hello");
        assert_eq!(file.ioctl(GET_FREE_SPACE, 0)?, CAPACITY as u64);
        Ok(())
    }

    #[test]
    fn ioctl_modes() -> Result<()> {
        let reg = SlotRegistry::new();
        let file = reg.open(0)?;
        assert_eq!(file.ioctl(GET_READ_BLOCKING_MODE, 0)?, 0);
        file.ioctl(CHANGE_READ_BLOCKING_MODE, 1)?;
        assert_eq!(file.ioctl(GET_READ_BLOCKING_MODE, 0)?, 1);
        file.ioctl(CHANGE_WRITE_BLOCKING_MODE, 1)?;
        assert_eq!(file.ioctl(GET_WRITE_BLOCKING_MODE, 0)?, 1);
        let mut buf = [0u8; 4];
        assert!(matches!(file.read(&mut buf), Err(MailslotError::WouldBlock)));
        match file.ioctl(CHANGE_WRITE_BLOCKING_MODE, 2) {
            Err(e @ MailslotError::InvalidArgument { .. }) => assert_eq!(e.errno(), libc::EINVAL),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(file.ioctl(GET_WRITE_BLOCKING_MODE, 0)?, 1);
        Ok(())
    }

    #[test]
    fn ioctl_segment_size() -> Result<()> {
        let reg = SlotRegistry::new();
        let file = reg.open(0)?;
        assert_eq!(file.ioctl(GET_MAX_SEGMENT_SIZE, 0)?, ABSOLUTE_MAX_SEGMENT_SIZE as u64);
        file.ioctl(CHANGE_MAX_SEGMENT_SIZE, 2)?;
        assert_eq!(file.ioctl(GET_MAX_SEGMENT_SIZE, 0)?, 2);
        assert!(matches!(
            file.write(b"four"),
            Err(MailslotError::MessageTooLarge { .. })
        ));
        assert_eq!(file.write(b"ok")?, 2);
        assert!(file.ioctl(CHANGE_MAX_SEGMENT_SIZE, 0).is_err());
        assert!(file.ioctl(CHANGE_MAX_SEGMENT_SIZE, 1025).is_err());
        assert!(file.ioctl(CHANGE_MAX_SEGMENT_SIZE, u64::MAX).is_err());
        Ok(())
    }

    #[test]
    fn unknown_command() -> Result<()> {
        let reg = SlotRegistry::new();
        let file = reg.open(0)?;
        match file.ioctl(42, 0) {
            Err(e @ MailslotError::UnknownCommand(42)) => assert_eq!(e.errno(), libc::ENOTTY),
            other => panic!("unexpected {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn cancelled_handle_does_not_wait() -> Result<()> {
        let reg = SlotRegistry::new();
        let token = CancelToken::new();
        token.cancel();
        let file = reg.open(2)?.with_cancel(token);
        let mut buf = [0u8; 8];
        assert!(matches!(file.read(&mut buf), Err(MailslotError::Cancelled)));
        assert_eq!(reg.slot(2)?.pending_readers()?, 0);
        Ok(())
    }
}
