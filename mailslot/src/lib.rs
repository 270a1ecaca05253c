pub mod cancel;
pub mod core;
pub mod device;
pub mod errors;
pub mod message;
mod reader;
pub mod registry;
pub mod slot;
pub mod wait_list;
mod writer;

#[cfg(test)]
mod tests;

pub use crate::cancel::CancelToken;
pub use crate::core::{
    BlockingMode, MailslotConfig, SlotConfig, ABSOLUTE_MAX_SEGMENT_SIZE, CAPACITY, MAX_SLOTS,
};
pub use crate::device::SlotFile;
pub use crate::errors::{MailslotError, Result};
pub use crate::registry::{global, SlotRegistry};
pub use crate::slot::Slot;
