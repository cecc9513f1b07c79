pub mod anr_handler;
pub mod anr_manager;
pub mod dispatch_simulator;
pub mod lru_cache;
pub mod timer_manager;

pub use anr_handler::{AnrHandler, LocalSessionStage, SessionStage};
pub use anr_manager::AnrManager;
pub use dispatch_simulator::DispatchSimulator;
pub use lru_cache::LruCache;
pub use timer_manager::{TimerId, TimerManager};
