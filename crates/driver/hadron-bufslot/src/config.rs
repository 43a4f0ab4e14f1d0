//! Construction-time configuration.
//!
//! The source reads a process-wide `buf_slot_debug` environment variable
//! once at table construction. This re-expresses that mask as configuration
//! threaded through [`crate::table::SlotTable::new`] instead of process-global
//! state.

bitflags::bitflags! {
    /// Verbosity categories understood by the logging sink, matching the
    /// independent bits of the source's `buf_slot_debug` mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TraceFlags: u32 {
        /// Trace function entry.
        const FUNCTION = 0x0000_0001;
        /// Trace setup / reconfiguration.
        const SETUP = 0x0000_0002;
        /// Trace per-operation status transitions.
        const OPS_RUNTIME = 0x0000_0010;
        /// Trace buffer attach/detach.
        const BUFFER = 0x0000_0100;
        /// Trace frame attach/detach.
        const FRAME = 0x0000_0200;
        /// Enable the bounded operation log (see [`crate::oplog::OpLog`]).
        const OPS_HISTORY = 0x1000_0000;
    }
}

impl core::fmt::Display for TraceFlags {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        bitflags::parser::to_writer(self, f)
    }
}

/// Configuration for a [`crate::table::SlotTable`], supplied at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufSlotConfig {
    /// Which verbosity categories the table should trace through the
    /// logging sink.
    pub trace: TraceFlags,
}

impl BufSlotConfig {
    /// All tracing disabled, no operation log.
    #[must_use]
    pub const fn silent() -> Self {
        Self {
            trace: TraceFlags::empty(),
        }
    }

    /// Whether the operation log should be allocated.
    #[must_use]
    pub const fn ops_history(self) -> bool {
        self.trace.contains(TraceFlags::OPS_HISTORY)
    }
}

impl Default for BufSlotConfig {
    fn default() -> Self {
        Self::silent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_has_no_ops_history() {
        assert!(!BufSlotConfig::silent().ops_history());
    }

    #[test]
    fn ops_history_flag_enables_log() {
        let cfg = BufSlotConfig {
            trace: TraceFlags::OPS_HISTORY,
        };
        assert!(cfg.ops_history());
    }

    #[test]
    fn trace_flags_are_independent() {
        let cfg = BufSlotConfig {
            trace: TraceFlags::BUFFER | TraceFlags::FRAME,
        };
        assert!(cfg.trace.contains(TraceFlags::BUFFER));
        assert!(cfg.trace.contains(TraceFlags::FRAME));
        assert!(!cfg.ops_history());
    }
}
