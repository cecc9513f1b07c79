use crate::debug_if_enabled;
use crate::error::Result;
use crate::services::anr_manager::AnrManager;
use std::sync::Arc;

use super::r#trait::SessionStage;

/// Session stage в том же процессе, что и `AnrManager`: подтверждение
/// сразу снимает таймеры окна.
pub struct LocalSessionStage {
    persistent_id: i32,
    anr_manager: Arc<AnrManager>,
}

impl LocalSessionStage {
    pub fn new(persistent_id: i32, anr_manager: Arc<AnrManager>) -> Self {
        Self {
            persistent_id,
            anr_manager,
        }
    }
}

impl SessionStage for LocalSessionStage {
    fn persistent_id(&self) -> i32 {
        self.persistent_id
    }

    fn notify_event_consumed(&self, event_id: i32) -> Result<()> {
        let removed = self.anr_manager.mark_processed(self.persistent_id, event_id);
        debug_if_enabled!(
            "Окно {}: подтверждение {} сняло таймеров: {}",
            self.persistent_id, event_id, removed
        );
        Ok(())
    }
}
