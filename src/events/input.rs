use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Входное событие, доставленное окну диспетчером ввода
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub persistent_id: i32,
    pub event_id: i32,
    pub kind: InputEventKind,
    pub timestamp: Instant,
}

impl InputEvent {
    pub fn new(persistent_id: i32, event_id: i32, kind: InputEventKind) -> Self {
        Self {
            persistent_id,
            event_id,
            kind,
            timestamp: Instant::now(),
        }
    }

    /// Время создания события в миллисекундах от `origin`
    pub fn action_time(&self, origin: Instant) -> i64 {
        self.timestamp.saturating_duration_since(origin).as_millis() as i64
    }
}

impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} #{} -> окно {}",
            self.kind, self.event_id, self.persistent_id
        )
    }
}

/// Тип входного события
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputEventKind {
    Key,
    Pointer,
    Axis,
}

impl InputEventKind {
    pub fn cycle(index: u64) -> Self {
        match index % 3 {
            0 => Self::Pointer,
            1 => Self::Key,
            _ => Self::Axis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn action_time_is_relative_to_origin() {
        let origin = Instant::now();
        let mut event = InputEvent::new(1, 10, InputEventKind::Key);
        event.timestamp = origin + Duration::from_millis(25);

        assert_eq!(event.action_time(origin), 25);
        assert!(event.to_string().contains("#10"));
    }

    #[test]
    fn kinds_cycle() {
        assert_eq!(InputEventKind::cycle(0), InputEventKind::Pointer);
        assert_eq!(InputEventKind::cycle(4), InputEventKind::Key);
    }
}
