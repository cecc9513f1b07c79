//! AnrManager service: responsibility and boundaries
//!
//! Maps input-event acknowledgement deadlines onto `TimerManager`: one timer per
//! pending (window, event) pair, cumulative receipts, and a single escalation per
//! non-responding window. Escalations leave the worker thread as `AnrEvent`s on a
//! channel; this module never talks to UI or diagnostics code directly.

mod anr_manager;
mod event_stage;

pub use self::anr_manager::{AnrManager, AnrObserver, AnrSwitch, AppInfoGetter, UNKNOWN_BUNDLE_NAME};
