//! Post-build artifact generation: HBTF/HKIF backtrace data and initrd archives.

pub mod hbtf;
pub mod hkif;
pub mod initrd;
pub mod iso;
