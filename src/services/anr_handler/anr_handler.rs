use crate::debug_if_enabled;
use crate::error::AnrError;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

use super::r#trait::SessionStage;

const INVALID_EVENT_ID: i32 = -1;

struct StageEntry {
    persistent_id: i32,
    stage: Weak<dyn SessionStage>,
}

#[derive(Debug)]
struct ReceiptState {
    send_status: bool,
    current_event_id_to_receipt: i32,
    latest_event_id: i32,
}

impl Default for ReceiptState {
    fn default() -> Self {
        Self {
            send_status: false,
            current_event_id_to_receipt: INVALID_EVENT_ID,
            latest_event_id: INVALID_EVENT_ID,
        }
    }
}

#[derive(Default)]
struct HandlerState {
    // Упорядочено по id события: очистка просроченных идёт диапазоном
    session_stages: BTreeMap<i32, StageEntry>,
    windows: HashMap<i32, ReceiptState>,
}

impl HandlerState {
    fn persistent_id_of_event(&self, event_id: i32) -> Option<i32> {
        self.session_stages.get(&event_id).map(|entry| entry.persistent_id)
    }

    fn clear_expired_events(&mut self, persistent_id: i32, event_id: i32) {
        let before = self.session_stages.len();
        self.session_stages
            .retain(|id, entry| !(entry.persistent_id == persistent_id && *id <= event_id));
        debug_if_enabled!(
            "Окно {}: очищено событий {}, осталось {}",
            persistent_id,
            before - self.session_stages.len(),
            self.session_stages.len()
        );
    }
}

/// Клиентская сторона ANR: отправка подтверждений обработки событий окнам.
///
/// Подтверждения накопительные, поэтому пока одно подтверждение окна в пути,
/// новые только поднимают отметку последнего события; после завершения
/// отправки уходит одно подтверждение на эту отметку.
#[derive(Default)]
pub struct AnrHandler {
    state: Mutex<HandlerState>,
}

impl AnrHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Запомнить, какому session stage принадлежит событие
    pub fn set_session_stage(&self, event_id: i32, stage: &Arc<dyn SessionStage>) {
        let persistent_id = stage.persistent_id();
        debug_if_enabled!("Событие {} -> окно {}", event_id, persistent_id);
        self.state.lock().session_stages.insert(
            event_id,
            StageEntry {
                persistent_id,
                stage: Arc::downgrade(stage),
            },
        );
    }

    pub fn handle_event_consumed(&self, event_id: i32, action_time: i64) {
        if event_id < 0 {
            debug!("Пропуск события с неверным id {}", event_id);
            return;
        }

        let persistent_id = {
            let mut state = self.state.lock();
            let Some(persistent_id) = state.persistent_id_of_event(event_id) else {
                debug!("Событие {} не зарегистрировано", event_id);
                return;
            };

            let receipt = state.windows.entry(persistent_id).or_default();
            receipt.latest_event_id = receipt.latest_event_id.max(event_id);
            if receipt.send_status {
                debug_if_enabled!(
                    "Окно {}: подтверждение {} в пути, событие {} отложено",
                    persistent_id, receipt.current_event_id_to_receipt, event_id
                );
                return;
            }
            receipt.send_status = true;
            receipt.current_event_id_to_receipt = receipt.latest_event_id;
            persistent_id
        };

        debug_if_enabled!(
            "Событие {} окна {} обработано, action_time {}",
            event_id, persistent_id, action_time
        );
        self.send_event(persistent_id);
    }

    pub fn update_latest_event_id(&self, event_id: i32) {
        let mut state = self.state.lock();
        let Some(persistent_id) = state.persistent_id_of_event(event_id) else {
            return;
        };
        let receipt = state.windows.entry(persistent_id).or_default();
        receipt.latest_event_id = receipt.latest_event_id.max(event_id);
    }

    pub fn on_window_destroyed(&self, persistent_id: i32) {
        let mut state = self.state.lock();
        state.windows.remove(&persistent_id);
        state
            .session_stages
            .retain(|_, entry| entry.persistent_id != persistent_id);
        info!("Окно {} уничтожено, состояние подтверждений очищено", persistent_id);
    }

    pub fn is_receipt_in_flight(&self, persistent_id: i32) -> bool {
        self.state
            .lock()
            .windows
            .get(&persistent_id)
            .is_some_and(|receipt| receipt.send_status)
    }

    pub fn registered_event_count(&self) -> usize {
        self.state.lock().session_stages.len()
    }

    // Отправка идёт без удержания мьютекса; повторяется, пока отметка уходит вперёд
    fn send_event(&self, persistent_id: i32) {
        loop {
            let (event_id, stage) = {
                let state = self.state.lock();
                let Some(receipt) = state.windows.get(&persistent_id) else {
                    return;
                };
                let event_id = receipt.current_event_id_to_receipt;
                let stage = state
                    .session_stages
                    .get(&event_id)
                    .and_then(|entry| entry.stage.upgrade());
                (event_id, stage)
            };

            match stage {
                Some(stage) => {
                    if let Err(e) = stage.notify_event_consumed(event_id) {
                        warn!("Не удалось отправить подтверждение {} окну {}: {}", event_id, persistent_id, e);
                    }
                }
                None => warn!(
                    "{}, подтверждение {} не отправлено",
                    AnrError::SessionStageGone(persistent_id),
                    event_id
                ),
            }

            let mut state = self.state.lock();
            state.clear_expired_events(persistent_id, event_id);
            let Some(receipt) = state.windows.get_mut(&persistent_id) else {
                return;
            };
            if receipt.latest_event_id > event_id {
                receipt.current_event_id_to_receipt = receipt.latest_event_id;
                continue;
            }
            receipt.send_status = false;
            receipt.current_event_id_to_receipt = INVALID_EVENT_ID;
            return;
        }
    }
}
