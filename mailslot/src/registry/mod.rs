use log::info;
use once_cell::sync::Lazy;

use crate::core::{MailslotConfig, SlotConfig, MAX_SLOTS};
use crate::device::SlotFile;
use crate::errors::{MailslotError, Result};
use crate::slot::Slot;

/// Fixed table of `MAX_SLOTS` independent slots, indexed by slot id.
#[derive(Debug)]
pub struct SlotRegistry {
    slots: Box<[Slot]>,
}

static GLOBAL: Lazy<SlotRegistry> = Lazy::new(SlotRegistry::new);

/// Process-wide registry, built on first use and kept for the process lifetime.
pub fn global() -> &'static SlotRegistry {
    &GLOBAL
}

impl SlotRegistry {
    pub fn new() -> SlotRegistry {
        let slots = (0..MAX_SLOTS)
            .map(Slot::with_defaults)
            .collect::<Vec<_>>()
            .into_boxed_slice();
        info!("mailslot registry ready with {} slots", MAX_SLOTS);
        SlotRegistry { slots }
    }

    pub fn with_config(cfg: &MailslotConfig) -> Result<SlotRegistry> {
        SlotRegistry::with_slot_config(&cfg.slots)
    }

    pub fn with_slot_config(cfg: &SlotConfig) -> Result<SlotRegistry> {
        let slots = (0..MAX_SLOTS)
            .map(|id| Slot::new(id, cfg))
            .collect::<Result<Vec<_>>>()?
            .into_boxed_slice();
        info!(
            "mailslot registry ready with {} slots (segment {}, read {}, write {})",
            MAX_SLOTS, cfg.max_segment_size, cfg.read_mode, cfg.write_mode
        );
        Ok(SlotRegistry { slots })
    }

    pub fn slot(&self, id: usize) -> Result<&Slot> {
        self.slots.get(id).ok_or(MailslotError::InvalidSlot(id))
    }

    /// Resolves `id` to a handle, the way opening the device node would.
    pub fn open(&self, id: usize) -> Result<SlotFile<'_>> {
        let slot = self.slot(id)?;
        info!("open called on slot {}", id);
        Ok(SlotFile::new(slot))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Discards the residual messages of every slot; returns how many were dropped.
    pub fn drain(&mut self) -> usize {
        self.slots.iter_mut().map(Slot::drain).sum()
    }
}

impl Default for SlotRegistry {
    fn default() -> Self {
        SlotRegistry::new()
    }
}

impl Drop for SlotRegistry {
    fn drop(&mut self) {
        let dropped = self.drain();
        info!("mailslot registry torn down, {} residual messages dropped", dropped);
    }
}
