use crate::services::timer_manager::TimerId;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Событие, ожидающее подтверждения, и таймер, который его сторожит.
/// После срабатывания ANR событие остаётся ожидающим, но уже без таймера.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PendingEvent {
    pub event_id: i32,
    pub timer_id: Option<TimerId>,
}

#[derive(Debug, Default)]
struct WindowStage {
    // Обычно у окна одно-два неподтверждённых события
    events: SmallVec<[PendingEvent; 4]>,
    anr_triggered: bool,
}

impl WindowStage {
    // Отвязать таймеры от событий; события остаются до подтверждения
    fn detach_timers(&mut self) -> Vec<TimerId> {
        self.events
            .iter_mut()
            .filter_map(|e| e.timer_id.take())
            .collect()
    }
}

/// Учёт неподтверждённых событий по окнам (persistent id)
#[derive(Debug, Default)]
pub(crate) struct EventStage {
    windows: HashMap<i32, WindowStage>,
}

impl EventStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_anr_event(&mut self, persistent_id: i32, event_id: i32, timer_id: TimerId) {
        self.windows
            .entry(persistent_id)
            .or_default()
            .events
            .push(PendingEvent {
                event_id,
                timer_id: Some(timer_id),
            });
    }

    /// Событие ждёт подтверждения и всё ещё сторожится именно этим таймером
    pub fn is_pending(&self, persistent_id: i32, event_id: i32, timer_id: TimerId) -> bool {
        self.windows.get(&persistent_id).is_some_and(|stage| {
            stage
                .events
                .iter()
                .any(|e| e.event_id == event_id && e.timer_id == Some(timer_id))
        })
    }

    /// Подтверждение накопительное: снимаются все события с id <= `event_id`,
    /// в том числе уже просроченные. Снимает и флаг ANR окна.
    /// Возвращает таймеры, которые ещё стоят в очереди.
    pub fn del_events(&mut self, persistent_id: i32, event_id: i32) -> Vec<TimerId> {
        let Some(stage) = self.windows.get_mut(&persistent_id) else {
            return Vec::new();
        };

        let before = stage.events.len();
        let mut timer_ids = Vec::new();
        stage.events.retain(|e| {
            if e.event_id <= event_id {
                timer_ids.extend(e.timer_id);
                false
            } else {
                true
            }
        });
        if stage.events.len() != before {
            stage.anr_triggered = false;
        }
        timer_ids
    }

    /// Забрать живые таймеры окна, не снимая самих событий
    pub fn take_timer_ids(&mut self, persistent_id: i32) -> Vec<TimerId> {
        self.windows
            .get_mut(&persistent_id)
            .map(WindowStage::detach_timers)
            .unwrap_or_default()
    }

    /// Забыть все окна вместе с флагами ANR; возвращает живые таймеры
    pub fn clear(&mut self) -> Vec<TimerId> {
        self.windows
            .drain()
            .flat_map(|(_, mut stage)| stage.detach_timers())
            .collect()
    }

    /// Число событий окна, ожидающих подтверждения (с таймером и без)
    pub fn pending_count(&self, persistent_id: i32) -> usize {
        self.windows
            .get(&persistent_id)
            .map_or(0, |stage| stage.events.len())
    }

    pub fn set_anr_status(&mut self, persistent_id: i32, status: bool) {
        self.windows.entry(persistent_id).or_default().anr_triggered = status;
    }

    pub fn check_anr_status(&self, persistent_id: i32) -> bool {
        self.windows
            .get(&persistent_id)
            .is_some_and(|stage| stage.anr_triggered)
    }

    pub fn on_session_lost(&mut self, persistent_id: i32) {
        self.windows.remove(&persistent_id);
    }
}
