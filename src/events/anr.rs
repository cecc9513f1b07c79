use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Информация о процессе, владеющем окном
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppInfo {
    pub pid: i32,
    pub process_name: String,
}

impl AppInfo {
    pub fn new(pid: i32, process_name: impl Into<String>) -> Self {
        Self {
            pid,
            process_name: process_name.into(),
        }
    }
}

impl fmt::Display for AppInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.process_name.is_empty() {
            write!(f, "pid {}", self.pid)
        } else {
            write!(f, "\"{}\" (pid {})", self.process_name, self.pid)
        }
    }
}

/// Результат внешнего поиска пакета по pid
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppBundleInfo {
    pub bundle_name: String,
    pub uid: i32,
}

impl AppBundleInfo {
    pub fn new(bundle_name: impl Into<String>, uid: i32) -> Self {
        Self {
            bundle_name: bundle_name.into(),
            uid,
        }
    }
}

/// Окно не подтвердило входное событие вовремя
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnrEvent {
    pub persistent_id: i32,
    pub event_id: i32,
    pub pid: i32,
    pub process_name: String,
    pub bundle_name: String,
    pub timestamp: SystemTime,
}

impl AnrEvent {
    pub fn new(persistent_id: i32, event_id: i32, app: AppInfo, bundle_name: String) -> Self {
        Self {
            persistent_id,
            event_id,
            pid: app.pid,
            process_name: app.process_name,
            bundle_name,
            timestamp: SystemTime::now(),
        }
    }
}

impl fmt::Display for AnrEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ANR: окно {} событие {} pid {} процесс \"{}\" пакет \"{}\"",
            self.persistent_id, self.event_id, self.pid, self.process_name, self.bundle_name
        )
    }
}
