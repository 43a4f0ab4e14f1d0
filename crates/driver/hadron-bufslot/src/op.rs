//! The state machine: a pure transition function from `(Status, SlotOp)` to
//! the next `Status`, plus the one invariant ([`Status::hw_refcount`]
//! non-negative) checked after every transition.

use crate::status::Status;

/// An operation applied to a slot's status word.
///
/// Every operation produces exactly one [`crate::oplog::OpRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOp {
    /// Reset the status to zero.
    Init,
    /// Set `IN_USE`.
    SetNotReady,
    /// Clear `IN_USE`.
    ClrNotReady,
    /// Set `DPB_REF`.
    SetDpbRef,
    /// Clear `DPB_REF`.
    ClrDpbRef,
    /// Set `DISPLAY`.
    SetDisplay,
    /// Clear `DISPLAY`.
    ClrDisplay,
    /// Set `HW_DST`.
    SetHwDst,
    /// Clear `HW_DST`.
    ClrHwDst,
    /// Add 1 to `HW_REFCOUNT`.
    IncHwRef,
    /// Subtract 1 from `HW_REFCOUNT`.
    DecHwRef,
    /// Set `HAS_FRAME`.
    SetFrame,
    /// Clear `HAS_FRAME`.
    ClrFrame,
    /// Set `HAS_BUFFER`.
    SetBuffer,
    /// Clear `HAS_BUFFER`.
    ClrBuffer,
}

impl SlotOp {
    /// A short, fixed-width name for diagnostic output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::SetNotReady => "set not ready",
            Self::ClrNotReady => "clr not ready",
            Self::SetDpbRef => "set dpb ref",
            Self::ClrDpbRef => "clr dpb ref",
            Self::SetDisplay => "set display",
            Self::ClrDisplay => "clr display",
            Self::SetHwDst => "set hw dst",
            Self::ClrHwDst => "clr hw dst",
            Self::IncHwRef => "inc hw ref",
            Self::DecHwRef => "dec hw ref",
            Self::SetFrame => "set frame",
            Self::ClrFrame => "clr frame",
            Self::SetBuffer => "set buffer",
            Self::ClrBuffer => "clr buffer",
        }
    }
}

impl core::fmt::Display for SlotOp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// `HW_REFCOUNT` went negative after applying an operation.
///
/// The caller decremented a reference it never held; this is always a bug
/// on the caller's side, never a transient condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegativeHwRefcount {
    /// The operation that caused the violation.
    pub op: SlotOp,
    /// Status before the operation.
    pub status_before: Status,
    /// Status after the operation (the one that failed the check).
    pub status_after: Status,
}

/// Applies `op` to `status`, returning the new status.
///
/// Pure and non-panicking: the only failure mode is `HW_REFCOUNT` going
/// negative, reported rather than asserted so this function stays testable
/// in isolation. Every other invariant in the data model is enforced by the
/// facade in `table.rs`, which has the table-wide context (slot index,
/// frame/buffer attachment) this function does not.
pub fn apply(status: Status, op: SlotOp) -> Result<Status, NegativeHwRefcount> {
    let bits = status.bits();
    let new_bits = match op {
        SlotOp::Init => 0,
        SlotOp::SetNotReady => bits | Status::IN_USE,
        SlotOp::ClrNotReady => bits & !Status::IN_USE,
        SlotOp::SetDpbRef => bits | Status::DPB_REF,
        SlotOp::ClrDpbRef => bits & !Status::DPB_REF,
        SlotOp::SetDisplay => bits | Status::DISPLAY,
        SlotOp::ClrDisplay => bits & !Status::DISPLAY,
        SlotOp::SetHwDst => bits | Status::HW_DST,
        SlotOp::ClrHwDst => bits & !Status::HW_DST,
        // Increments/decrements the whole word, matching the source: the
        // refcount lives in the low 16 bits and is never expected to reach
        // the boundary in practice.
        SlotOp::IncHwRef => bits.wrapping_add(1),
        SlotOp::DecHwRef => bits.wrapping_sub(1),
        SlotOp::SetFrame => bits | Status::HAS_FRAME,
        SlotOp::ClrFrame => bits & !Status::HAS_FRAME,
        SlotOp::SetBuffer => bits | Status::HAS_BUFFER,
        SlotOp::ClrBuffer => bits & !Status::HAS_BUFFER,
    };
    let status_after = Status::from_bits(new_bits);
    if status_after.hw_refcount() < 0 {
        return Err(NegativeHwRefcount {
            op,
            status_before: status,
            status_after,
        });
    }
    Ok(status_after)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_zeroes_status() {
        let s = Status::from_bits(0xffff_ffff & !Status::HW_REFCOUNT_MASK);
        let s = apply(s, SlotOp::Init).unwrap();
        assert_eq!(s.bits(), 0);
    }

    #[test]
    fn set_clr_not_ready() {
        let s = apply(Status::UNUSED, SlotOp::SetNotReady).unwrap();
        assert!(s.is_in_use());
        let s = apply(s, SlotOp::ClrNotReady).unwrap();
        assert!(!s.is_in_use());
    }

    #[test]
    fn inc_dec_hw_ref() {
        let s = apply(Status::UNUSED, SlotOp::IncHwRef).unwrap();
        assert_eq!(s.hw_refcount(), 1);
        let s = apply(s, SlotOp::DecHwRef).unwrap();
        assert_eq!(s.hw_refcount(), 0);
    }

    #[test]
    fn dec_hw_ref_below_zero_is_rejected() {
        let err = apply(Status::UNUSED, SlotOp::DecHwRef).unwrap_err();
        assert_eq!(err.op, SlotOp::DecHwRef);
        assert_eq!(err.status_after.hw_refcount(), -1);
    }

    #[test]
    fn set_dpb_ref_idempotent_at_bit_level() {
        let s = apply(Status::UNUSED, SlotOp::SetDpbRef).unwrap();
        let s2 = apply(s, SlotOp::SetDpbRef).unwrap();
        assert_eq!(s, s2);
    }

    #[test]
    fn set_frame_and_buffer_do_not_affect_releasable() {
        let s = apply(Status::UNUSED, SlotOp::SetFrame).unwrap();
        let s = apply(s, SlotOp::SetBuffer).unwrap();
        assert!(s.releasable());
        assert!(s.has_frame());
        assert!(s.has_buffer());
    }
}
