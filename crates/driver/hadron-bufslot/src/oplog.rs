//! Bounded operation log for post-mortem diagnostics.
//!
//! Capacity 1024, FIFO, oldest entry dropped on overflow. Allocated only
//! when [`crate::config::BufSlotConfig::ops_history`] is set; otherwise
//! absent from the table entirely.

use alloc::vec::Vec;

use planck_noalloc::ringbuf::RingBuf;

use crate::id::SlotIndex;
use crate::op::SlotOp;
use crate::status::Status;

/// One recorded transition: the slot it happened to, the operation applied,
/// and the status word before and after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpRecord {
    /// The slot the operation was applied to.
    pub index: SlotIndex,
    /// The operation applied.
    pub op: SlotOp,
    /// Status before the operation.
    pub status_before: Status,
    /// Status after the operation.
    pub status_after: Status,
}

/// `RingBuf`'s usable capacity is `SIZE - 1`, so this holds the spec's 1024
/// usable entries.
const CAPACITY_PLUS_ONE: usize = 1025;

/// The bounded operation log.
pub struct OpLog {
    buf: RingBuf<OpRecord, CAPACITY_PLUS_ONE>,
}

impl OpLog {
    /// Creates an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buf: RingBuf::new(),
        }
    }

    /// Appends `record`, evicting the oldest entry if the log is full.
    pub fn push(&mut self, record: OpRecord) {
        if self.buf.is_full() {
            self.buf.pop();
        }
        self.buf.push(record);
    }

    /// Number of records currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Discards all records (used on reconfiguration commit).
    pub fn clear(&mut self) {
        while self.buf.pop().is_some() {}
    }

    /// Returns every record in FIFO order without discarding them.
    ///
    /// The source's dump routine drains the log as it logs it; this
    /// implementation pops everything into a `Vec` and pushes it straight
    /// back so the log's contents survive a diagnostic dump.
    pub fn entries_in_order(&mut self) -> Vec<OpRecord> {
        let mut entries = Vec::with_capacity(self.buf.len());
        while let Some(record) = self.buf.pop() {
            entries.push(record);
        }
        for &record in &entries {
            self.buf.push(record);
        }
        entries
    }
}

impl Default for OpLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: u32) -> OpRecord {
        OpRecord {
            index: SlotIndex::new(index),
            op: SlotOp::SetDpbRef,
            status_before: Status::UNUSED,
            status_after: Status::from_bits(Status::DPB_REF),
        }
    }

    #[test]
    fn push_and_len() {
        let mut log = OpLog::new();
        assert!(log.is_empty());
        log.push(record(0));
        log.push(record(1));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn fifo_order_preserved_by_snapshot() {
        let mut log = OpLog::new();
        for i in 0..5 {
            log.push(record(i));
        }
        let entries = log.entries_in_order();
        let indices: Vec<u32> = entries.iter().map(|r| r.index.as_u32()).collect();
        assert_eq!(indices, [0, 1, 2, 3, 4]);
        // Snapshot must not consume the log.
        assert_eq!(log.len(), 5);
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut log = OpLog::new();
        for i in 0..1030 {
            log.push(record(i));
        }
        assert_eq!(log.len(), 1024);
        let entries = log.entries_in_order();
        assert_eq!(entries.first().unwrap().index.as_u32(), 6);
        assert_eq!(entries.last().unwrap().index.as_u32(), 1029);
    }

    #[test]
    fn clear_empties_log() {
        let mut log = OpLog::new();
        log.push(record(0));
        log.clear();
        assert!(log.is_empty());
    }
}
