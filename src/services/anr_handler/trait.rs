use crate::error::Result;

/// Remote endpoint of a window session that must be told an input event was consumed
pub trait SessionStage: Send + Sync {
    /// Persistent id of the window this stage belongs to
    fn persistent_id(&self) -> i32;

    /// Deliver a cumulative receipt: every event up to `event_id` was consumed
    fn notify_event_consumed(&self, event_id: i32) -> Result<()>;
}
