//! The two error tiers.
//!
//! Recoverable conditions ([`SlotTableError`]) are returned to the caller.
//! Invariant violations ([`InvariantViolation`]) are programming errors on
//! the caller's side; a table that hits one dumps its full state and aborts
//! rather than continuing with a corrupted slot — silent continuation would
//! alias one frame buffer across two pictures.

use core::fmt;

use crate::id::SlotIndex;
use crate::op::SlotOp;
use crate::status::Status;

/// A recoverable error: the caller should retry or bail cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotTableError {
    /// A required collaborator handle was absent. Kept for contract parity
    /// with collaborators that pass optional handles; a `&SlotTable` itself
    /// is always valid once constructed.
    NullInput,
    /// The display queue has no entries.
    DisplayQueueEmpty,
    /// The display queue's head slot is still `IN_USE` (hardware has not
    /// finished writing it); the caller should retry after completion.
    DisplayHeadNotReady,
}

impl fmt::Display for SlotTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullInput => write!(f, "null input"),
            Self::DisplayQueueEmpty => write!(f, "display queue is empty"),
            Self::DisplayHeadNotReady => write!(f, "display queue head is still in use"),
        }
    }
}

/// A fatal invariant violation: the caller's bookkeeping is broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    /// `HW_REFCOUNT` went negative on `index`.
    NegativeHwRefcount {
        /// The slot that hit the violation.
        index: SlotIndex,
        /// The operation that caused it.
        op: SlotOp,
        /// Status immediately before the operation.
        status_before: Status,
        /// Status the operation would have produced.
        status_after: Status,
    },
    /// `index` is not less than the table's slot count.
    IndexOutOfRange {
        /// The out-of-range index.
        index: SlotIndex,
        /// The table's current slot count.
        count: u32,
    },
    /// `get_unused` found no slot with a zero status word.
    NoFreeSlot,
    /// `set_hw_dst` was called on a slot that is not marked `IN_USE`.
    SetHwDstNotInUse {
        /// The slot in question.
        index: SlotIndex,
    },
    /// `set_buffer` attempted to replace an existing buffer attachment on a
    /// slot that also has a frame attached. The source only tolerates buffer
    /// replacement on stream-buffer slots (no frame); a framed slot is
    /// expected to gain its first buffer exactly once.
    BufferReplaceOnFramedSlot {
        /// The slot in question.
        index: SlotIndex,
    },
    /// `deinit` was called with a non-empty display queue or a slot whose
    /// status is not zero.
    DeinitWithLiveState,
    /// `ready` was called while `info_changed` was clear.
    ReadyWithoutChange,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeHwRefcount {
                index,
                op,
                status_before,
                status_after,
            } => write!(
                f,
                "slot {index}: {op} took hw_refcount negative (before: {status_before}, after: {status_after})"
            ),
            Self::IndexOutOfRange { index, count } => {
                write!(f, "slot index {index} out of range (count {count})")
            }
            Self::NoFreeSlot => write!(f, "no free slot available"),
            Self::SetHwDstNotInUse { index } => {
                write!(f, "slot {index}: set_hw_dst called while not IN_USE")
            }
            Self::BufferReplaceOnFramedSlot { index } => write!(
                f,
                "slot {index}: set_buffer attempted to replace a buffer on a framed slot"
            ),
            Self::DeinitWithLiveState => {
                write!(f, "deinit called with a non-empty display queue or live slot")
            }
            Self::ReadyWithoutChange => write!(f, "ready called while info_changed was clear"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_all_recoverable_variants() {
        assert_eq!(format!("{}", SlotTableError::NullInput), "null input");
        assert_eq!(
            format!("{}", SlotTableError::DisplayQueueEmpty),
            "display queue is empty"
        );
        assert_eq!(
            format!("{}", SlotTableError::DisplayHeadNotReady),
            "display queue head is still in use"
        );
    }

    #[test]
    fn display_invariant_violation() {
        let v = InvariantViolation::IndexOutOfRange {
            index: SlotIndex::new(9),
            count: 4,
        };
        assert_eq!(format!("{v}"), "slot index 9 out of range (count 4)");
    }

    #[test]
    fn recoverable_errors_are_not_fatal_variants() {
        // NoFreeSlot is only ever an InvariantViolation, never SlotTableError.
        let err = InvariantViolation::NoFreeSlot;
        assert_eq!(format!("{err}"), "no free slot available");
    }
}
