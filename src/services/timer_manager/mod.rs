//! TimerManager service: responsibility and boundaries
//!
//! A generic one-shot software timer scheduler: a single worker thread sleeps on a
//! condition variable until the nearest deadline of an indexed min-heap, then runs
//! every due callback outside the lock. It knows nothing about windows or input
//! events; ANR policy lives in `anr_manager`.

mod timer_heap;
mod timer_manager;

pub use self::timer_heap::TimerId;
pub use self::timer_manager::{TimerManager, TimerMgrState};
