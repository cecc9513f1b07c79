//! AnrHandler service: responsibility and boundaries
//!
//! The app-process side of ANR detection. It remembers which session stage each
//! input event belongs to (as weak handles, so a destroyed window simply drops out)
//! and forwards "event consumed" receipts, at most one in flight per window.

mod anr_handler;
mod local_session_stage;
mod r#trait;

pub use self::anr_handler::AnrHandler;
pub use self::local_session_stage::LocalSessionStage;
pub use self::r#trait::SessionStage;
