use std::convert::TryFrom;
use std::fmt;
use std::path::Path;

use serde_derive::{Deserialize, Serialize};

use crate::errors::{MailslotError, Result};

/// Total bytes a slot may hold across all of its queued messages.
pub const CAPACITY: usize = 1 << 20;
/// Hard ceiling for a single message, and for the length a reader may ask for.
pub const ABSOLUTE_MAX_SEGMENT_SIZE: usize = 1 << 10;
pub const MAX_SLOTS: usize = 256;

/// Per-direction policy for an operation that cannot proceed right now.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockingMode {
    Blocking,
    NonBlocking,
}

impl BlockingMode {
    /// Encoding used on the control interface.
    pub fn raw(self) -> u64 {
        match self {
            BlockingMode::Blocking => 0,
            BlockingMode::NonBlocking => 1,
        }
    }

    #[inline]
    pub(crate) fn from_flag(blocking: bool) -> BlockingMode {
        if blocking {
            BlockingMode::Blocking
        } else {
            BlockingMode::NonBlocking
        }
    }

    #[inline]
    pub(crate) fn is_blocking(self) -> bool {
        self == BlockingMode::Blocking
    }
}

impl Default for BlockingMode {
    fn default() -> Self {
        BlockingMode::Blocking
    }
}

impl TryFrom<u64> for BlockingMode {
    type Error = MailslotError;

    fn try_from(raw: u64) -> Result<Self> {
        match raw {
            0 => Ok(BlockingMode::Blocking),
            1 => Ok(BlockingMode::NonBlocking),
            other => Err(MailslotError::InvalidArgument {
                what: "blocking mode",
                value: other,
            }),
        }
    }
}

impl fmt::Display for BlockingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockingMode::Blocking => write!(f, "blocking"),
            BlockingMode::NonBlocking => write!(f, "non-blocking"),
        }
    }
}

#[inline]
pub(crate) fn check_segment_size(n: usize) -> Result<usize> {
    if n < 1 || n > ABSOLUTE_MAX_SEGMENT_SIZE {
        return Err(MailslotError::InvalidArgument {
            what: "max segment size",
            value: n as u64,
        });
    }
    Ok(n)
}

/// Settings every slot starts with when a registry is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotConfig {
    pub max_segment_size: usize,
    pub read_mode: BlockingMode,
    pub write_mode: BlockingMode,
}

impl Default for SlotConfig {
    fn default() -> Self {
        SlotConfig {
            max_segment_size: ABSOLUTE_MAX_SEGMENT_SIZE,
            read_mode: BlockingMode::Blocking,
            write_mode: BlockingMode::Blocking,
        }
    }
}

impl SlotConfig {
    pub fn validate(&self) -> Result<()> {
        check_segment_size(self.max_segment_size).map(|_| ())
    }
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailslotConfig {
    pub slots: SlotConfig,
}

impl MailslotConfig {
    /// Loads the config file, creating it with defaults when it does not exist yet.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<MailslotConfig> {
        let cfg: MailslotConfig = confy::load_path(path.as_ref())?;
        cfg.slots.validate()?;
        Ok(cfg)
    }

    pub fn from_toml(text: &str) -> Result<MailslotConfig> {
        let cfg: MailslotConfig = toml::from_str(text)?;
        cfg.slots.validate()?;
        Ok(cfg)
    }
}
