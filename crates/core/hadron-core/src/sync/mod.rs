//! Synchronization primitives for the kernel.
//!
//! Provides [`SpinLock`], [`Semaphore`], and [`WaitQueue`], suitable for use
//! in `static` items and usable before any allocator or scheduler is
//! available.

mod spinlock;

pub mod semaphore;
pub mod stress;
pub mod waitqueue;

pub use semaphore::{Semaphore, SemaphoreAcquireFuture, SemaphorePermit};
pub use spinlock::{SpinLock, SpinLockGuard};
pub use waitqueue::{WaitFuture, WaitQueue};
