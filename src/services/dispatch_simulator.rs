use crate::config::Config;
use crate::debug_if_enabled;
use crate::error::Result;
use crate::events::input::InputEventKind;
use crate::events::{AnrEvent, InputEvent};
use crate::services::anr_handler::{AnrHandler, LocalSessionStage, SessionStage};
use crate::services::AnrManager;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{interval, sleep, Duration};
use tracing::{debug, info, warn};

/// Эмуляция диспетчера ввода: события по кругу уходят окнам, отзывчивые окна
/// подтверждают их через `AnrHandler`, зависшие молчат.
pub struct DispatchSimulator {
    config: Arc<Config>,
    anr_manager: Arc<AnrManager>,
    anr_handler: Arc<AnrHandler>,
    windows: DashMap<i32, Arc<dyn SessionStage>>,
    next_event_id: AtomicI32,
    tick: AtomicU64,
    origin: Instant,
}

impl DispatchSimulator {
    pub fn new(config: Arc<Config>, anr_manager: Arc<AnrManager>, anr_handler: Arc<AnrHandler>) -> Self {
        info!(
            "Инициализация DispatchSimulator: окон {}, зависших {:?}",
            config.simulation.window_count, config.simulation.hung_windows
        );

        let windows: DashMap<i32, Arc<dyn SessionStage>> = DashMap::new();
        for persistent_id in 1..=config.simulation.window_count {
            anr_manager.set_application_info(
                persistent_id,
                1000 + persistent_id,
                format!("com.example.window{}", persistent_id),
            );
            windows.insert(
                persistent_id,
                Arc::new(LocalSessionStage::new(persistent_id, Arc::clone(&anr_manager))),
            );
        }

        Self {
            config,
            anr_manager,
            anr_handler,
            windows,
            next_event_id: AtomicI32::new(1),
            tick: AtomicU64::new(0),
            origin: Instant::now(),
        }
    }

    pub async fn run(self: Arc<Self>) -> Result<()> {
        info!("DispatchSimulator запущен");

        let mut interval = interval(Duration::from_millis(self.config.simulation.event_interval_ms));
        loop {
            interval.tick().await;

            if self.windows.is_empty() {
                warn!("Живых окон не осталось, диспетчеризация остановлена");
                return Ok(());
            }

            let tick = self.tick.fetch_add(1, Ordering::Relaxed);
            let persistent_id = (tick % self.config.simulation.window_count as u64) as i32 + 1;
            if self.is_live(persistent_id) {
                self.dispatch(persistent_id, InputEventKind::cycle(tick));
            }
        }
    }

    fn dispatch(self: &Arc<Self>, persistent_id: i32, kind: InputEventKind) {
        let Some(stage) = self.windows.get(&persistent_id).map(|e| Arc::clone(e.value())) else {
            return;
        };

        let event_id = self.next_event_id.fetch_add(1, Ordering::Relaxed);
        let event = InputEvent::new(persistent_id, event_id, kind);
        debug_if_enabled!("Доставка: {}", event);

        if let Err(e) = self.anr_manager.add_timer(persistent_id, event_id) {
            debug!("Событие {} доставлено без таймера ANR: {}", event_id, e);
        }
        self.anr_handler.set_session_stage(event_id, &stage);

        if self.config.is_hung_window(persistent_id) {
            return;
        }

        let this = Arc::clone(self);
        let ack_delay = Duration::from_millis(self.config.simulation.ack_delay_ms);
        tokio::spawn(async move {
            sleep(ack_delay).await;
            this.anr_handler
                .handle_event_consumed(event.event_id, event.action_time(this.origin));
        });
    }

    /// Окно не отвечает: сессия считается потерянной
    pub fn on_anr(&self, event: &AnrEvent) {
        warn!("{}", event);

        if self.windows.remove(&event.persistent_id).is_some() {
            self.anr_manager.on_session_lost(event.persistent_id);
            self.anr_handler.on_window_destroyed(event.persistent_id);
            info!(
                "Окно {} закрыто после ANR, осталось окон: {}",
                event.persistent_id,
                self.windows.len()
            );
        }
    }

    pub fn is_live(&self, persistent_id: i32) -> bool {
        self.windows.contains_key(&persistent_id)
    }

    pub fn live_windows(&self) -> usize {
        self.windows.len()
    }
}
