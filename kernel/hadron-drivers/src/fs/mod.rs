//! Filesystem implementations for Hadron OS.
//!
//! Provides concrete filesystem drivers that are registered via linker-section
//! entries and discovered by the kernel at boot.

pub mod fat;
pub mod initramfs;
pub mod iso9660;
pub mod ramfs;
