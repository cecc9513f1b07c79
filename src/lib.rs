//! Обнаружение ANR (Application Not Responding) для оконного менеджера.
//!
//! `TimerManager` ведёт одноразовые дедлайны на отдельном потоке, `AnrManager`
//! ставит дедлайн на каждое неподтверждённое событие ввода и эскалирует окна,
//! пропустившие его, `AnrHandler` отправляет подтверждения со стороны приложения.

pub mod utils;

pub mod config;
pub mod error;
pub mod events;
pub mod services;

pub use config::Config;
pub use error::{AnrError, Result};
pub use events::{AnrEvent, AppBundleInfo, AppInfo};
pub use services::{AnrHandler, AnrManager, LruCache, TimerId, TimerManager};
