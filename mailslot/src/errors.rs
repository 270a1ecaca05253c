use std::io;

use thiserror::Error;

use crate::core::MAX_SLOTS;

#[derive(Debug, Error)]
pub enum MailslotError {
    #[error("slot id {0} is outside [0, {})", MAX_SLOTS)]
    InvalidSlot(usize),
    #[error("read length must be at least one byte")]
    InvalidLength,
    #[error("message of {len} bytes is outside the accepted range 1..={limit}")]
    MessageTooLarge { len: usize, limit: usize },
    #[error("head message needs {needed} bytes but the read accepts only {available}")]
    BufferTooSmall { needed: usize, available: usize },
    #[error("operation would block")]
    WouldBlock,
    #[error("wait cancelled")]
    Cancelled,
    #[error("invalid {what}: {value}")]
    InvalidArgument { what: &'static str, value: u64 },
    #[error("inappropriate control command {0}")]
    UnknownCommand(u32),
    #[error("slot {slot} is damaged: {reason}")]
    CorruptState { slot: usize, reason: &'static str },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("config error: {0}")]
    Config(#[from] confy::ConfyError),
    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, MailslotError>;

impl MailslotError {
    /// The errno a character-device front end hands back for this error.
    pub fn errno(&self) -> i32 {
        match self {
            MailslotError::InvalidSlot(_) => libc::ENXIO,
            MailslotError::InvalidLength | MailslotError::MessageTooLarge { .. } => libc::EMSGSIZE,
            MailslotError::BufferTooSmall { .. } | MailslotError::InvalidArgument { .. } => {
                libc::EINVAL
            }
            MailslotError::WouldBlock => libc::EAGAIN,
            MailslotError::Cancelled => libc::EINTR,
            MailslotError::UnknownCommand(_) => libc::ENOTTY,
            MailslotError::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
            MailslotError::CorruptState { .. }
            | MailslotError::Config(_)
            | MailslotError::Toml(_) => libc::EIO,
        }
    }

    /// True for errors a caller may simply retry later.
    pub fn is_transient(&self) -> bool {
        matches!(self, MailslotError::WouldBlock | MailslotError::BufferTooSmall { .. })
    }
}
