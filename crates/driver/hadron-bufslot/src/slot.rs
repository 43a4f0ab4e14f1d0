//! Per-slot state and the collaborator contract it attaches to.

use crate::id::SlotIndex;
use crate::status::Status;

/// The contract a picture-metadata value object must satisfy to be held by a
/// slot.
///
/// This is the idiomatic translation of the source's `init` / `copy`
/// (deep-copy) / `set_buffer` / `destroy` contract: `Clone` stands in for
/// `init` + deep `copy` (a clone is always a fresh, independent descriptor),
/// and ordinary `Drop` stands in for `destroy` — attaching or detaching a
/// frame is just storing or dropping an `Option<F>`.
pub trait FrameDescriptor: Clone {
    /// A reference-counted handle to a physical memory region. `Clone` is
    /// expected to increment the underlying reference count (as `inc_ref`
    /// does) and `Drop` to decrement it (as `dec_ref` does, reclaiming at
    /// zero).
    type Buffer: Clone;

    /// Plumbs `buffer` into this frame, as the source's `mpp_frame_set_buffer`
    /// does. Does not affect the slot's own buffer attachment.
    fn attach_buffer(&mut self, buffer: &Self::Buffer);
}

/// One entry in the slot table.
pub struct SlotEntry<F: FrameDescriptor> {
    index: SlotIndex,
    status: Status,
    frame: Option<F>,
    buffer: Option<F::Buffer>,
}

impl<F: FrameDescriptor> SlotEntry<F> {
    /// Creates a fresh, unused entry at `index`.
    #[must_use]
    pub const fn new(index: SlotIndex) -> Self {
        Self {
            index,
            status: Status::UNUSED,
            frame: None,
            buffer: None,
        }
    }

    /// This slot's stable index.
    #[must_use]
    pub const fn index(&self) -> SlotIndex {
        self.index
    }

    /// The current status word.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Overwrites the status word. Callers must route every transition
    /// through [`crate::op::apply`] first; this setter exists so the table
    /// facade can commit the already-validated result.
    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    /// The attached frame descriptor, if any.
    #[must_use]
    pub const fn frame(&self) -> Option<&F> {
        self.frame.as_ref()
    }

    /// The attached buffer handle, if any.
    #[must_use]
    pub const fn buffer(&self) -> Option<&F::Buffer> {
        self.buffer.as_ref()
    }

    /// Whether a frame is attached.
    #[must_use]
    pub const fn has_frame(&self) -> bool {
        self.frame.is_some()
    }

    /// Whether a buffer is attached.
    #[must_use]
    pub const fn has_buffer(&self) -> bool {
        self.buffer.is_some()
    }

    /// Resets this entry to its just-constructed state (used when
    /// reinitialising a slot array on `setup`/`ready`).
    pub fn reset(&mut self, index: SlotIndex) {
        self.index = index;
        self.status = Status::UNUSED;
        self.frame = None;
        self.buffer = None;
    }

    /// Deep-copies `incoming` into the slot's attached frame, creating one
    /// first if none is attached yet. Mirrors the source's "init if absent,
    /// then copy" sequence, collapsed since a fresh `clone()` already is a
    /// deep, independent copy.
    pub fn attach_frame(&mut self, incoming: &F) {
        self.frame = Some(incoming.clone());
    }

    /// Destroys the attached frame, if any.
    pub fn clear_frame(&mut self) {
        self.frame = None;
    }

    /// Attaches `buffer`, releasing any previously-held buffer handle first
    /// (a `dec_ref` on the old one) and plumbing the new handle into the
    /// attached frame, if any.
    pub fn attach_buffer(&mut self, buffer: &F::Buffer) {
        self.buffer = Some(buffer.clone());
        if let Some(frame) = &mut self.frame {
            frame.attach_buffer(buffer);
        }
    }

    /// Releases the attached buffer handle, if any (a `dec_ref`).
    pub fn clear_buffer(&mut self) {
        self.buffer = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use core::cell::Cell;

    #[derive(Clone)]
    struct TestFrame {
        buffers_attached: Rc<Cell<u32>>,
    }

    impl FrameDescriptor for TestFrame {
        type Buffer = Rc<Cell<u32>>;

        fn attach_buffer(&mut self, buffer: &Self::Buffer) {
            self.buffers_attached.set(self.buffers_attached.get() + 1);
            let _ = buffer;
        }
    }

    #[test]
    fn fresh_entry_is_unused() {
        let entry = SlotEntry::<TestFrame>::new(SlotIndex::new(0));
        assert!(entry.status().releasable());
        assert!(!entry.has_frame());
        assert!(!entry.has_buffer());
    }

    #[test]
    fn attach_and_clear_frame() {
        let mut entry = SlotEntry::<TestFrame>::new(SlotIndex::new(0));
        let frame = TestFrame {
            buffers_attached: Rc::new(Cell::new(0)),
        };
        entry.attach_frame(&frame);
        assert!(entry.has_frame());
        entry.clear_frame();
        assert!(!entry.has_frame());
    }

    #[test]
    fn attach_buffer_plumbs_into_frame() {
        let mut entry = SlotEntry::<TestFrame>::new(SlotIndex::new(0));
        let frame = TestFrame {
            buffers_attached: Rc::new(Cell::new(0)),
        };
        entry.attach_frame(&frame);
        let buf = Rc::new(Cell::new(0u32));
        entry.attach_buffer(&buf);
        assert!(entry.has_buffer());
        assert_eq!(
            entry.frame().unwrap().buffers_attached.get(),
            1,
            "attaching a buffer to a framed slot must plumb it into the frame"
        );
    }

    #[test]
    fn reset_clears_everything() {
        let mut entry = SlotEntry::<TestFrame>::new(SlotIndex::new(0));
        entry.set_status(Status::from_bits(Status::IN_USE));
        entry.reset(SlotIndex::new(3));
        assert_eq!(entry.index(), SlotIndex::new(3));
        assert!(entry.status().releasable());
    }
}
