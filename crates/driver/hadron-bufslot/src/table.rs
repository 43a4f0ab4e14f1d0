//! The public façade: holds the slot array, the mutex, the display queue,
//! the op log, and the reconfiguration state.
//!
//! A single mutex guards every mutating operation and every read that
//! observes slot state, with exactly two documented exceptions:
//! [`SlotTable::get_hw_dst`] and [`SlotTable::get_size`], both backed by
//! atomics rather than the lock.

use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use alloc::vec::Vec;

use hadron_core::sync::SpinLock;

use crate::config::{BufSlotConfig, TraceFlags};
use crate::display_queue::DisplayQueue;
use crate::error::{InvariantViolation, SlotTableError};
use crate::id::SlotIndex;
use crate::op::{self, SlotOp};
use crate::oplog::{OpLog, OpRecord};
use crate::slot::{FrameDescriptor, SlotEntry};
use crate::status::Status;

/// A pending `(count, size)` stashed by `setup(..., changed = true)` until
/// `ready()` commits it.
#[derive(Debug, Clone, Copy)]
struct PendingConfig {
    count: u32,
    size: (u32, u32),
}

struct Inner<F: FrameDescriptor> {
    slots: Vec<SlotEntry<F>>,
    display: DisplayQueue,
    oplog: Option<OpLog>,
    config: BufSlotConfig,
    pending: Option<PendingConfig>,
    decode_count: u32,
    display_count: u32,
    unrefer_count: u32,
}

impl<F: FrameDescriptor> Inner<F> {
    fn new(config: BufSlotConfig) -> Self {
        Self {
            slots: Vec::new(),
            display: DisplayQueue::new(),
            oplog: config.ops_history().then(OpLog::new),
            config,
            pending: None,
            decode_count: 0,
            display_count: 0,
            unrefer_count: 0,
        }
    }
}

/// Packs `(width, height)` into a single `u64` so [`SlotTable::get_size`] can
/// read it without the mutex.
const fn pack_size(size: (u32, u32)) -> u64 {
    (size.0 as u64) << 32 | size.1 as u64
}

const fn unpack_size(bits: u64) -> (u32, u32) {
    ((bits >> 32) as u32, bits as u32)
}

/// The buffer-slot table.
///
/// Generic over the picture-metadata type `F`, which must satisfy
/// [`FrameDescriptor`]. Every public method takes `&self`: the table's
/// interior mutability lives entirely behind its [`SpinLock`], so it can be
/// shared across threads as a plain `&SlotTable<F>` or `Arc<SlotTable<F>>`.
pub struct SlotTable<F: FrameDescriptor> {
    inner: SpinLock<Inner<F>>,
    output_index: AtomicU32,
    size: AtomicU64,
}

impl<F: FrameDescriptor> SlotTable<F> {
    /// Constructs an empty table. The slot array and count are not yet
    /// established; call [`setup`](Self::setup) next.
    #[must_use]
    pub fn new(config: BufSlotConfig) -> Self {
        Self {
            inner: SpinLock::new(Inner::new(config)),
            output_index: AtomicU32::new(0),
            size: AtomicU64::new(0),
        }
    }

    // -- Lifecycle ---------------------------------------------------------

    /// First call (table empty): allocates `count` slots and records
    /// `size`. Subsequent calls with `changed = false` extend the array in
    /// place if `count` has grown (existing entries and indices are
    /// preserved). Subsequent calls with `changed = true` stash
    /// `(count, size)` as a pending configuration without touching the
    /// slots currently in use; call [`ready`](Self::ready) once every
    /// holder has drained.
    pub fn setup(&self, count: u32, size: (u32, u32), changed: bool) {
        let mut inner = self.inner.lock();

        if inner.slots.is_empty() {
            inner.slots = (0..count).map(|i| SlotEntry::new(SlotIndex::new(i))).collect();
            self.size.store(pack_size(size), Ordering::Release);
            return;
        }

        if changed {
            inner.pending = Some(PendingConfig { count, size });
            return;
        }

        let current = inner.slots.len() as u32;
        if count > current {
            let start = inner.slots.len() as u32;
            inner
                .slots
                .extend((start..count).map(|i| SlotEntry::new(SlotIndex::new(i))));
        }
    }

    /// Observes the `info_changed` flag.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.inner.lock().pending.is_some()
    }

    /// Commits a pending configuration raised by `setup(..., true)`.
    ///
    /// Replaces `size`; if `count` differs from the current count,
    /// reallocates the slot array and reinitialises every entry. Clears the
    /// op log and the `info_changed` flag.
    ///
    /// # Panics
    ///
    /// Aborts if no configuration is pending.
    pub fn ready(&self) {
        let mut inner = self.inner.lock();
        let Some(pending) = inner.pending else {
            self.fatal(&mut inner, InvariantViolation::ReadyWithoutChange);
        };

        if pending.count as usize != inner.slots.len() {
            inner.slots = (0..pending.count)
                .map(|i| SlotEntry::new(SlotIndex::new(i)))
                .collect();
        } else {
            for (i, slot) in inner.slots.iter_mut().enumerate() {
                slot.reset(SlotIndex::new(i as u32));
            }
        }

        if let Some(log) = &mut inner.oplog {
            log.clear();
        }
        self.size.store(pack_size(pending.size), Ordering::Release);
        inner.pending = None;
    }

    /// Observes the current frame size without locking.
    #[must_use]
    pub fn get_size(&self) -> (u32, u32) {
        unpack_size(self.size.load(Ordering::Acquire))
    }

    /// Number of records currently held in the operation log, or `None` if
    /// `OPS_HISTORY` was not enabled at construction and no log was
    /// allocated. Cleared to `Some(0)` on a successful [`ready`](Self::ready)
    /// commit.
    #[must_use]
    pub fn op_log_len(&self) -> Option<usize> {
        self.inner.lock().oplog.as_ref().map(OpLog::len)
    }

    /// Precondition: display queue empty and every slot has status zero.
    ///
    /// # Panics
    ///
    /// Aborts if the precondition does not hold.
    pub fn deinit(&self) {
        let mut inner = self.inner.lock();
        let live = !inner.display.is_empty()
            || inner.slots.iter().any(|s| s.status() != Status::UNUSED);
        if live {
            self.fatal(&mut inner, InvariantViolation::DeinitWithLiveState);
        }
        inner.slots.clear();
        inner.pending = None;
        if let Some(log) = &mut inner.oplog {
            log.clear();
        }
        self.size.store(0, Ordering::Release);
        self.output_index.store(0, Ordering::Release);
    }

    // -- Allocation ----------------------------------------------------------

    /// Linear scan for the first slot with status exactly zero; transitions
    /// it `SET_NOT_READY` and returns its index.
    ///
    /// # Panics
    ///
    /// Aborts if no free slot exists: the caller's slot-recycling logic is
    /// broken and continuing would mis-alias a buffer.
    pub fn get_unused(&self) -> SlotIndex {
        let mut inner = self.inner.lock();
        let Some(pos) = inner.slots.iter().position(|s| s.status() == Status::UNUSED) else {
            self.fatal(&mut inner, InvariantViolation::NoFreeSlot);
        };
        let index = SlotIndex::new(pos as u32);
        self.transition(&mut inner, index, SlotOp::SetNotReady);
        index
    }

    // -- Reference set/clear -------------------------------------------------

    /// Sets `DPB_REF`.
    pub fn set_dpb_ref(&self, index: SlotIndex) {
        let mut inner = self.inner.lock();
        self.transition(&mut inner, index, SlotOp::SetDpbRef);
    }

    /// Clears `DPB_REF`, then runs the release check.
    pub fn clr_dpb_ref(&self, index: SlotIndex) {
        let mut inner = self.inner.lock();
        self.transition(&mut inner, index, SlotOp::ClrDpbRef);
        inner.unrefer_count += 1;
        self.check_entry_unused(&mut inner, index);
    }

    /// Sets `DISPLAY` and appends to the display queue, re-seating the slot
    /// if it was already queued.
    pub fn set_display(&self, index: SlotIndex) {
        let mut inner = self.inner.lock();
        self.transition(&mut inner, index, SlotOp::SetDisplay);
        inner.display.set_display(index);
    }

    /// Attaches `frame` (creating the slot's own frame descriptor if none is
    /// attached yet) and marks the slot as the hardware write target.
    /// Records [`get_hw_dst`](Self::get_hw_dst)'s return value.
    ///
    /// # Panics
    ///
    /// Aborts if the slot is not currently marked `IN_USE`.
    pub fn set_hw_dst(&self, index: SlotIndex, frame: &F) {
        let mut inner = self.inner.lock();
        let slot_idx = self.check_index(&mut inner, index);
        if !inner.slots[slot_idx].status().is_in_use() {
            self.fatal(&mut inner, InvariantViolation::SetHwDstNotInUse { index });
        }
        inner.slots[slot_idx].attach_frame(frame);
        self.transition(&mut inner, index, SlotOp::SetHwDst);
        self.transition(&mut inner, index, SlotOp::SetFrame);
        self.output_index.store(index.as_u32(), Ordering::Release);
    }

    /// Clears `HW_DST` and `IN_USE` (decode complete), increments the
    /// decode counter, then runs the release check.
    pub fn clr_hw_dst(&self, index: SlotIndex) {
        let mut inner = self.inner.lock();
        self.transition(&mut inner, index, SlotOp::ClrHwDst);
        self.transition(&mut inner, index, SlotOp::ClrNotReady);
        inner.decode_count += 1;
        self.check_entry_unused(&mut inner, index);
    }

    /// Returns the most-recently-designated hardware destination, without
    /// locking (backed by an atomic, per the spec's own preference — see
    /// `DESIGN.md`).
    #[must_use]
    pub fn get_hw_dst(&self) -> SlotIndex {
        SlotIndex::new(self.output_index.load(Ordering::Acquire))
    }

    /// Adds 1 to `HW_REFCOUNT`.
    pub fn inc_hw_ref(&self, index: SlotIndex) {
        let mut inner = self.inner.lock();
        self.transition(&mut inner, index, SlotOp::IncHwRef);
    }

    /// Subtracts 1 from `HW_REFCOUNT`, then runs the release check.
    ///
    /// # Panics
    ///
    /// Aborts if this would take `HW_REFCOUNT` negative.
    pub fn dec_hw_ref(&self, index: SlotIndex) {
        let mut inner = self.inner.lock();
        self.transition(&mut inner, index, SlotOp::DecHwRef);
        self.check_entry_unused(&mut inner, index);
    }

    /// Attaches `buffer` to the slot, releasing any buffer it already held.
    ///
    /// Replacing an existing buffer is only legal on a slot with no frame
    /// attached (a "stream buffer" slot, per the source); replacing one on a
    /// framed slot is a fatal invariant violation rather than a silent
    /// aliasing bug. Attaching a buffer to a previously-bufferless slot is
    /// always legal. When a frame is attached, the buffer is additionally
    /// plumbed into it.
    ///
    /// # Panics
    ///
    /// Aborts if the slot already has both a buffer and a frame attached.
    pub fn set_buffer(&self, index: SlotIndex, buffer: &F::Buffer) {
        let mut inner = self.inner.lock();
        let slot_idx = self.check_index(&mut inner, index);
        if inner.slots[slot_idx].has_buffer() && inner.slots[slot_idx].has_frame() {
            self.fatal(
                &mut inner,
                InvariantViolation::BufferReplaceOnFramedSlot { index },
            );
        }
        inner.slots[slot_idx].attach_buffer(buffer);
        self.transition(&mut inner, index, SlotOp::SetBuffer);
    }

    /// Returns the attached buffer handle, if any. Returns an owned clone
    /// rather than a borrowed reference, since the slot may release its own
    /// attachment concurrently.
    #[must_use]
    pub fn get_buffer(&self, index: SlotIndex) -> Option<F::Buffer> {
        let mut inner = self.inner.lock();
        let slot_idx = self.check_index(&mut inner, index);
        inner.slots[slot_idx].buffer().cloned()
    }

    /// Pops the head of the display queue and returns a deep copy of its
    /// attached frame. Fails if the queue is empty or the head is still
    /// `IN_USE` (hardware has not finished writing it) — in the latter case
    /// the queue is left untouched and the caller should retry.
    pub fn get_display(&self) -> Result<F, SlotTableError> {
        let mut inner = self.inner.lock();
        let Some(head) = inner.display.peek_front() else {
            return Err(SlotTableError::DisplayQueueEmpty);
        };
        let slot_idx = head.as_usize();
        if inner.slots[slot_idx].status().is_in_use() {
            return Err(SlotTableError::DisplayHeadNotReady);
        }
        inner.display.pop_front();

        let frame = inner.slots[slot_idx]
            .frame()
            .expect("display-queued slot must have an attached frame")
            .clone();

        self.transition(&mut inner, head, SlotOp::ClrDisplay);
        inner.display_count += 1;
        self.check_entry_unused(&mut inner, head);
        Ok(frame)
    }

    // -- Internals -----------------------------------------------------------

    fn check_index(&self, inner: &mut Inner<F>, index: SlotIndex) -> usize {
        let count = inner.slots.len() as u32;
        if index.as_u32() >= count {
            self.fatal(inner, InvariantViolation::IndexOutOfRange { index, count });
        }
        index.as_usize()
    }

    /// Applies `op` to `index`'s status, committing the result and recording
    /// it in the op log if one is allocated.
    fn transition(&self, inner: &mut Inner<F>, index: SlotIndex, slot_op: SlotOp) -> Status {
        let slot_idx = self.check_index(inner, index);
        let status_before = inner.slots[slot_idx].status();
        let status_after = match op::apply(status_before, slot_op) {
            Ok(status) => status,
            Err(violation) => self.fatal(
                inner,
                InvariantViolation::NegativeHwRefcount {
                    index,
                    op: violation.op,
                    status_before: violation.status_before,
                    status_after: violation.status_after,
                },
            ),
        };
        inner.slots[slot_idx].set_status(status_after);

        if inner.config.trace.contains(TraceFlags::OPS_RUNTIME) {
            hadron_core::kdebug!(
                "bufslot: index {index} op {slot_op} status in {:08x} out {:08x}",
                status_before.bits(),
                status_after.bits()
            );
        }

        if let Some(log) = &mut inner.oplog {
            log.push(OpRecord {
                index,
                op: slot_op,
                status_before,
                status_after,
            });
        }

        status_after
    }

    /// Runs the release check: if the release mask is zero, destroys the
    /// attached frame, if any (emitting `CLR_FRAME`), then releases the
    /// slot's own buffer handle and emits `CLR_BUFFER`.
    ///
    /// The slot's buffer attachment is a strong reference independent of the
    /// frame's (see `FrameDescriptor::attach_buffer`'s contract in
    /// `slot.rs`), so it is always dropped here regardless of whether a
    /// frame was also attached.
    fn check_entry_unused(&self, inner: &mut Inner<F>, index: SlotIndex) {
        let slot_idx = index.as_usize();
        if !inner.slots[slot_idx].status().releasable() {
            return;
        }
        if inner.slots[slot_idx].has_frame() {
            inner.slots[slot_idx].clear_frame();
            self.transition(inner, index, SlotOp::ClrFrame);
        }
        inner.slots[slot_idx].clear_buffer();
        self.transition(inner, index, SlotOp::ClrBuffer);
    }

    /// Logs the full table state and operation history, then aborts.
    fn fatal(&self, inner: &mut Inner<F>, violation: InvariantViolation) -> ! {
        self.dump(inner);
        panic!("bufslot: {violation}");
    }

    /// Logs a diagnostic dump of the table: slot count, tracing counters,
    /// a per-slot flag summary, then the operation log in FIFO order.
    fn dump(&self, inner: &mut Inner<F>) {
        let (width, height) = self.get_size();
        hadron_core::kerr!(
            "bufslot: dumping {} slots, size {}x{}",
            inner.slots.len(),
            width,
            height
        );
        hadron_core::kerr!(
            "bufslot: decode {} display {} unrefer {}",
            inner.decode_count,
            inner.display_count,
            inner.unrefer_count
        );
        for slot in &inner.slots {
            hadron_core::kerr!("bufslot: slot {:2} {}", slot.index(), slot.status());
        }
        hadron_core::kerr!("bufslot: operation history:");
        if let Some(log) = &mut inner.oplog {
            for record in log.entries_in_order() {
                hadron_core::kerr!(
                    "bufslot: index {:2} op {:13} status in {:08x} out {:08x}",
                    record.index,
                    record.op,
                    record.status_before.bits(),
                    record.status_after.bits()
                );
            }
        }
    }
}

/// Deterministic concurrency check for the release-exactly-once invariant:
/// two independent reference holders (`DPB_REF`, one outstanding `HW_REF`)
/// clearing their references in either order must release the attached
/// buffer exactly once, never zero and never twice. Run with
/// `RUSTFLAGS="--cfg loom" cargo test --release -p hadron-bufslot loom_`.
#[cfg(loom)]
mod loom_tests {
    use super::*;
    use core::sync::atomic::AtomicUsize;
    use loom::sync::Arc;

    #[derive(Clone)]
    struct Frame;

    /// Stands in for a `Buffer`'s `inc_ref`/`dec_ref` pair: `Clone` bumps the
    /// live count, `Drop` decrements it and records a reclaim the instant it
    /// hits zero — exactly once, no matter which strong reference happens to
    /// be the last one dropped.
    struct CountingBuffer {
        live: Arc<AtomicUsize>,
        reclaims: Arc<AtomicUsize>,
    }

    impl CountingBuffer {
        fn new(reclaims: Arc<AtomicUsize>) -> Self {
            Self {
                live: Arc::new(AtomicUsize::new(1)),
                reclaims,
            }
        }
    }

    impl Clone for CountingBuffer {
        fn clone(&self) -> Self {
            self.live.fetch_add(1, Ordering::SeqCst);
            Self {
                live: Arc::clone(&self.live),
                reclaims: Arc::clone(&self.reclaims),
            }
        }
    }

    impl Drop for CountingBuffer {
        fn drop(&mut self) {
            if self.live.fetch_sub(1, Ordering::SeqCst) == 1 {
                self.reclaims.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    impl FrameDescriptor for Frame {
        type Buffer = CountingBuffer;

        fn attach_buffer(&mut self, _buffer: &Self::Buffer) {}
    }

    #[test]
    fn release_fires_exactly_once_regardless_of_clear_order() {
        loom::model(|| {
            let t = Arc::new(SlotTable::<Frame>::new(BufSlotConfig::silent()));
            t.setup(1, (64, 64), false);
            let idx = t.get_unused();
            t.set_hw_dst(idx, &Frame);
            t.clr_hw_dst(idx);
            t.set_dpb_ref(idx);
            t.inc_hw_ref(idx);

            let reclaims = Arc::new(AtomicUsize::new(0));
            // The slot's own clone (made inside `set_buffer`) is the only
            // strong reference left once this temporary drops.
            t.set_buffer(idx, &CountingBuffer::new(Arc::clone(&reclaims)));

            let t1 = Arc::clone(&t);
            let h1 = loom::thread::spawn(move || t1.clr_dpb_ref(idx));
            let t2 = Arc::clone(&t);
            let h2 = loom::thread::spawn(move || t2.dec_hw_ref(idx));

            h1.join().unwrap();
            h2.join().unwrap();

            assert_eq!(reclaims.load(Ordering::SeqCst), 1);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use core::cell::Cell;

    #[derive(Clone)]
    struct Frame {
        payload: u32,
        attached_buffers: Rc<Cell<u32>>,
    }

    impl FrameDescriptor for Frame {
        type Buffer = Rc<Cell<u32>>;

        fn attach_buffer(&mut self, _buffer: &Self::Buffer) {
            self.attached_buffers.set(self.attached_buffers.get() + 1);
        }
    }

    fn frame(payload: u32) -> Frame {
        Frame {
            payload,
            attached_buffers: Rc::new(Cell::new(0)),
        }
    }

    fn table() -> SlotTable<Frame> {
        SlotTable::new(BufSlotConfig {
            trace: TraceFlags::OPS_HISTORY,
        })
    }

    // Scenario 1: allocation exhaustion.
    #[test]
    fn get_unused_returns_slots_in_order() {
        let t = table();
        t.setup(4, (1024, 1024), false);
        assert_eq!(t.get_unused(), SlotIndex::new(0));
        assert_eq!(t.get_unused(), SlotIndex::new(1));
        assert_eq!(t.get_unused(), SlotIndex::new(2));
        assert_eq!(t.get_unused(), SlotIndex::new(3));
    }

    #[test]
    #[should_panic]
    fn get_unused_aborts_when_exhausted() {
        let t = table();
        t.setup(4, (1024, 1024), false);
        for _ in 0..4 {
            t.get_unused();
        }
        t.get_unused();
    }

    // Scenario 2: round trip through hw dst, display, dpb ref.
    #[test]
    fn round_trip_releases_slot() {
        let t = table();
        t.setup(4, (1024, 1024), false);
        let idx = t.get_unused();
        assert_eq!(idx, SlotIndex::new(0));

        let f = frame(42);
        t.set_hw_dst(idx, &f);
        t.set_dpb_ref(idx);
        t.clr_hw_dst(idx);
        t.set_display(idx);

        let out = t.get_display().unwrap();
        assert_eq!(out.payload, 42);

        t.clr_dpb_ref(idx);
    }

    // Scenario 3: hardware read-after-write keeps a slot alive.
    #[test]
    fn hw_ref_blocks_release() {
        let t = table();
        t.setup(4, (1024, 1024), false);
        let idx = t.get_unused();
        let f = frame(1);
        t.set_hw_dst(idx, &f);
        t.clr_hw_dst(idx);

        t.inc_hw_ref(idx);
        t.clr_dpb_ref(idx); // no-op ref to clear, but exercises the release check path
        t.dec_hw_ref(idx);
    }

    // Scenario 4: display ordering.
    #[test]
    fn display_queue_preserves_enqueue_order() {
        let t = table();
        t.setup(4, (1024, 1024), false);
        for i in 0..4 {
            let idx = t.get_unused();
            assert_eq!(idx, SlotIndex::new(i));
            let f = frame(i);
            t.set_hw_dst(idx, &f);
            t.clr_hw_dst(idx);
        }

        t.set_display(SlotIndex::new(2));
        t.set_display(SlotIndex::new(0));
        t.set_display(SlotIndex::new(1));

        assert_eq!(t.get_display().unwrap().payload, 2);
        assert_eq!(t.get_display().unwrap().payload, 0);
        assert_eq!(t.get_display().unwrap().payload, 1);
    }

    // Scenario 5: display before the hardware destination completes.
    #[test]
    fn display_fails_while_still_in_use() {
        let t = table();
        t.setup(4, (1024, 1024), false);
        let idx = t.get_unused();
        let f = frame(7);
        t.set_hw_dst(idx, &f);
        t.set_display(idx);

        assert_eq!(t.get_display(), Err(SlotTableError::DisplayHeadNotReady));

        t.clr_hw_dst(idx);
        assert_eq!(t.get_display().unwrap().payload, 7);
    }

    // Scenario 6: growing reconfiguration without a stream parameter change.
    #[test]
    fn setup_grow_without_change_preserves_indices() {
        let t = table();
        t.setup(4, (1024, 1024), false);
        let idx = t.get_unused();
        assert_eq!(idx, SlotIndex::new(0));

        t.setup(6, (1024, 1024), false);
        assert_eq!(t.get_unused(), SlotIndex::new(1));
        assert_eq!(t.get_unused(), SlotIndex::new(2));
        assert_eq!(t.get_unused(), SlotIndex::new(3));
        assert_eq!(t.get_unused(), SlotIndex::new(4));
        assert_eq!(t.get_unused(), SlotIndex::new(5));
    }

    #[test]
    fn reconfiguration_changed_defers_until_ready() {
        let t = table();
        t.setup(4, (1024, 1024), false);
        t.setup(6, (2048, 2048), true);

        assert!(t.is_changed());
        assert_eq!(t.get_size(), (1024, 1024));

        // Existing slots keep working until drained.
        let idx = t.get_unused();
        let f = frame(0);
        t.set_hw_dst(idx, &f);
        t.clr_hw_dst(idx);

        t.ready();
        assert!(!t.is_changed());
        assert_eq!(t.get_size(), (2048, 2048));
        assert_eq!(t.op_log_len(), Some(0));
    }

    #[test]
    fn op_log_absent_without_ops_history_flag() {
        let t = SlotTable::<Frame>::new(BufSlotConfig::silent());
        t.setup(1, (64, 64), false);
        assert_eq!(t.op_log_len(), None);
    }

    #[test]
    fn get_hw_dst_tracks_most_recent_set() {
        let t = table();
        t.setup(2, (64, 64), false);
        let a = t.get_unused();
        let b = t.get_unused();
        t.set_hw_dst(a, &frame(1));
        assert_eq!(t.get_hw_dst(), a);
        t.set_hw_dst(b, &frame(2));
        assert_eq!(t.get_hw_dst(), b);
    }

    #[test]
    fn set_buffer_on_unframed_slot_replaces_cleanly() {
        let t = table();
        t.setup(1, (64, 64), false);
        let idx = t.get_unused();
        let buf_a = Rc::new(Cell::new(1u32));
        let buf_b = Rc::new(Cell::new(2u32));
        t.set_buffer(idx, &buf_a);
        t.set_buffer(idx, &buf_b);
        assert_eq!(t.get_buffer(idx).unwrap().get(), 2);
    }

    #[test]
    #[should_panic]
    fn set_buffer_twice_on_framed_slot_aborts() {
        let t = table();
        t.setup(1, (64, 64), false);
        let idx = t.get_unused();
        t.set_hw_dst(idx, &frame(1));
        let buf_a = Rc::new(Cell::new(1u32));
        let buf_b = Rc::new(Cell::new(2u32));
        t.set_buffer(idx, &buf_a);
        t.set_buffer(idx, &buf_b);
    }

    #[test]
    fn deinit_clears_table() {
        let t = table();
        t.setup(2, (64, 64), false);
        let idx = t.get_unused();
        let f = frame(1);
        t.set_hw_dst(idx, &f);
        t.clr_hw_dst(idx);
        t.deinit();
        assert_eq!(t.get_size(), (0, 0));
    }

    #[test]
    #[should_panic]
    fn deinit_with_live_slot_aborts() {
        let t = table();
        t.setup(2, (64, 64), false);
        t.get_unused();
        t.deinit();
    }

    #[test]
    #[should_panic]
    fn index_out_of_range_aborts() {
        let t = table();
        t.setup(1, (64, 64), false);
        t.set_dpb_ref(SlotIndex::new(5));
    }

    // Idempotence boundary: repeating `set_dpb_ref` is idempotent at the
    // status-bit level, but the op log records each call.
    #[test]
    fn set_dpb_ref_is_bit_idempotent_but_logged_every_call() {
        let t = table();
        t.setup(1, (1024, 1024), false);
        let idx = t.get_unused();

        let before = t.op_log_len().unwrap();
        t.set_dpb_ref(idx);
        t.set_dpb_ref(idx);
        t.set_dpb_ref(idx);
        assert_eq!(t.op_log_len().unwrap(), before + 3);

        t.clr_dpb_ref(idx);
    }

    // Idempotence boundary: `inc_hw_ref` is NOT idempotent — each call adds
    // another outstanding reference that must be matched by a `dec_hw_ref`.
    #[test]
    fn inc_hw_ref_is_not_idempotent() {
        let t = table();
        t.setup(1, (64, 64), false);
        let idx = t.get_unused();
        t.set_hw_dst(idx, &frame(1));
        t.clr_hw_dst(idx);

        t.inc_hw_ref(idx);
        t.inc_hw_ref(idx);
        t.dec_hw_ref(idx);
        t.dec_hw_ref(idx);
    }
}
