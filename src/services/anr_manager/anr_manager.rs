use crate::anr_error;
use crate::config::AnrConfig;
use crate::debug_if_enabled;
use crate::error::{AnrError, Result};
use crate::events::{AnrEvent, AppBundleInfo, AppInfo};
use crate::services::lru_cache::LruCache;
use crate::services::timer_manager::{TimerId, TimerManager};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

use super::event_stage::EventStage;

/// Имя пакета, когда поиск невозможен
pub const UNKNOWN_BUNDLE_NAME: &str = "unknown";

pub type AppInfoGetter = Arc<dyn Fn(i32) -> Option<AppBundleInfo> + Send + Sync>;
pub type AnrObserver = Arc<dyn Fn(i32) + Send + Sync>;

/// Глобальный переключатель обнаружения ANR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnrSwitch {
    /// Не задан явно: первый успешный таймер включает обнаружение
    Auto,
    On,
    Off,
}

struct AnrState {
    switcher: AnrSwitch,
    anr_timer_count: usize,
    event_stage: EventStage,
    application_map: HashMap<i32, AppInfo>,
    bundle_names: HashMap<i32, String>,
    bundle_lru: LruCache<i32>,
    app_info_getter: Option<AppInfoGetter>,
    anr_observer: Option<AnrObserver>,
}

impl AnrState {
    fn release_timers(&mut self, timers: &TimerManager, timer_ids: &[TimerId]) {
        for id in timer_ids {
            // Таймер мог уже сработать: его колбэк увидит, что событие снято, и ничего не сделает
            if let Err(e) = timers.remove_timer(*id) {
                debug_if_enabled!("Таймер не удалён: {}", e);
            }
        }
        self.anr_timer_count = self.anr_timer_count.saturating_sub(timer_ids.len());
    }

    fn cache_bundle_name(&mut self, pid: i32, bundle_name: &str) {
        if let Some(evicted) = self.bundle_lru.put(pid) {
            self.bundle_names.remove(&evicted);
        }
        self.bundle_names.insert(pid, bundle_name.to_string());
    }

    fn clear_bundle_cache(&mut self) {
        self.bundle_lru.clear();
        self.bundle_names.clear();
    }
}

struct AnrInner {
    config: AnrConfig,
    timers: Arc<TimerManager>,
    state: Mutex<AnrState>,
    events_tx: UnboundedSender<AnrEvent>,
}

impl AnrInner {
    fn get_bundle_name(&self, pid: i32, persistent_id: i32) -> String {
        let getter = {
            let mut state = self.state.lock();
            let Some(getter) = state.app_info_getter.clone() else {
                debug_if_enabled!("AppInfoGetter не установлен, окно {}", persistent_id);
                return UNKNOWN_BUNDLE_NAME.to_string();
            };
            if state.bundle_lru.visit(pid) {
                if let Some(name) = state.bundle_names.get(&pid) {
                    return name.clone();
                }
            }
            getter
        };

        // Внешний поиск выполняется без удержания мьютекса
        match getter(pid) {
            Some(info) if !info.bundle_name.is_empty() => {
                debug_if_enabled!(
                    "pid {} (окно {}) -> пакет {}, uid {}",
                    pid, persistent_id, info.bundle_name, info.uid
                );
                if pid > 0 {
                    self.state.lock().cache_bundle_name(pid, &info.bundle_name);
                }
                info.bundle_name
            }
            _ => {
                debug!("Пакет для pid {} (окно {}) не найден", pid, persistent_id);
                UNKNOWN_BUNDLE_NAME.to_string()
            }
        }
    }

    fn on_anr_timeout(&self, persistent_id: i32, event_id: i32, own_id: &OnceLock<TimerId>) {
        debug!("ANR колбэк: окно {}, событие {}", persistent_id, event_id);

        let (app, observer) = {
            let mut state = self.state.lock();
            // add_timer записывает id под этим же мьютексом
            let Some(timer_id) = own_id.get().copied() else {
                warn!("Таймер события {} окна {} не зарегистрирован", event_id, persistent_id);
                return;
            };
            if !state.event_stage.is_pending(persistent_id, event_id, timer_id) {
                debug!("Событие {} окна {} уже подтверждено", event_id, persistent_id);
                return;
            }

            state.event_stage.set_anr_status(persistent_id, true);
            let timer_ids: Vec<TimerId> = state
                .event_stage
                .take_timer_ids(persistent_id)
                .into_iter()
                .filter(|id| *id != timer_id)
                .collect();
            state.release_timers(&self.timers, &timer_ids);
            // Сработавший таймер уже извлечён из кучи
            state.anr_timer_count = state.anr_timer_count.saturating_sub(1);

            let app = state
                .application_map
                .get(&persistent_id)
                .cloned()
                .unwrap_or_default();
            (app, state.anr_observer.clone())
        };

        let bundle_name = self.get_bundle_name(app.pid, persistent_id);
        error!(
            "Приложение не отвечает: окно {}, событие {}, {}, пакет {}",
            persistent_id, event_id, app, bundle_name
        );

        let pid = app.pid;
        if self
            .events_tx
            .send(AnrEvent::new(persistent_id, event_id, app, bundle_name))
            .is_err()
        {
            warn!("Получатель событий ANR закрыт");
        }

        match observer {
            Some(observer) => observer(pid),
            None => debug!("AnrObserver не установлен"),
        }
    }
}

/// Политика ANR поверх `TimerManager`: один таймер на каждое неподтверждённое
/// событие окна, эскалация при пропуске дедлайна.
pub struct AnrManager {
    inner: Arc<AnrInner>,
}

impl AnrManager {
    pub fn new(config: &AnrConfig, timers: Arc<TimerManager>) -> (Self, UnboundedReceiver<AnrEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let inner = AnrInner {
            config: config.clone(),
            timers,
            state: Mutex::new(AnrState {
                switcher: AnrSwitch::Auto,
                anr_timer_count: 0,
                event_stage: EventStage::new(),
                application_map: HashMap::new(),
                bundle_names: HashMap::new(),
                bundle_lru: LruCache::new(config.bundle_cache_capacity),
                app_info_getter: None,
                anr_observer: None,
            }),
            events_tx,
        };

        (Self { inner: Arc::new(inner) }, events_rx)
    }

    pub fn init(&self) -> Result<()> {
        info!(
            "Инициализация AnrManager (таймаут {} мс, лимит {})",
            self.inner.config.timeout_ms, self.inner.config.max_anr_timers
        );
        self.inner.timers.init()
    }

    /// Поставить таймер ANR на событие, отправленное окну
    pub fn add_timer(&self, persistent_id: i32, event_id: i32) -> Result<TimerId> {
        if persistent_id <= 0 {
            return Err(anr_error!(invalid_argument, "неверный persistent id окна: {}", persistent_id));
        }
        if event_id < 0 {
            return Err(anr_error!(invalid_argument, "неверный id события: {}", event_id));
        }

        let mut state = self.inner.state.lock();
        if state.switcher == AnrSwitch::Off {
            debug_if_enabled!("ANR выключен, событие {} доставляется без таймера", event_id);
            return Err(AnrError::Disabled);
        }
        if state.anr_timer_count >= self.inner.config.max_anr_timers {
            debug!(
                "Таймер ANR не добавлен: достигнут лимит {}",
                self.inner.config.max_anr_timers
            );
            return Err(AnrError::TimerLimit(self.inner.config.max_anr_timers));
        }

        // Мьютекс состояния держится до записи id: колбэк читает его только под этим мьютексом
        let own_id = Arc::new(OnceLock::new());
        let callback_id = Arc::clone(&own_id);
        let weak: Weak<AnrInner> = Arc::downgrade(&self.inner);
        let timer_id = self.inner.timers.add_timer(self.inner.config.timeout(), move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            inner.on_anr_timeout(persistent_id, event_id, &callback_id);
        })?;
        let _ = own_id.set(timer_id);

        state.anr_timer_count += 1;
        state.event_stage.save_anr_event(persistent_id, event_id, timer_id);
        if state.switcher == AnrSwitch::Auto {
            state.switcher = AnrSwitch::On;
            info!("ANR включён первым таймером");
        }

        debug_if_enabled!(
            "Таймер ANR {} для окна {}, событие {}, всего {}",
            timer_id, persistent_id, event_id, state.anr_timer_count
        );
        Ok(timer_id)
    }

    /// Подтверждение обработки: снимает все события окна с id <= `event_id`.
    /// Возвращает число снятых таймеров.
    pub fn mark_processed(&self, persistent_id: i32, event_id: i32) -> usize {
        let mut state = self.inner.state.lock();
        if state.switcher == AnrSwitch::Off {
            return 0;
        }

        let timer_ids = state.event_stage.del_events(persistent_id, event_id);
        state.release_timers(&self.inner.timers, &timer_ids);
        debug_if_enabled!(
            "Событие {} окна {} обработано, снято таймеров: {}",
            event_id, persistent_id, timer_ids.len()
        );
        timer_ids.len()
    }

    /// Снять все таймеры окна (например, при уничтожении окна)
    pub fn remove_timers_for_window(&self, persistent_id: i32) -> usize {
        let mut state = self.inner.state.lock();
        if state.switcher == AnrSwitch::Off {
            return 0;
        }

        let timer_ids = state.event_stage.take_timer_ids(persistent_id);
        state.release_timers(&self.inner.timers, &timer_ids);
        timer_ids.len()
    }

    /// Явно включить или выключить обнаружение; текущие таймеры и флаги ANR снимаются.
    pub fn set_enabled(&self, enabled: bool) {
        let mut state = self.inner.state.lock();
        let timer_ids = state.event_stage.clear();
        state.release_timers(&self.inner.timers, &timer_ids);
        state.switcher = if enabled { AnrSwitch::On } else { AnrSwitch::Off };

        if enabled {
            info!("ANR включён, снято таймеров: {}", timer_ids.len());
        } else {
            info!("ANR выключен, снято таймеров: {}", timer_ids.len());
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.switch_state() == AnrSwitch::On
    }

    pub fn switch_state(&self) -> AnrSwitch {
        self.inner.state.lock().switcher
    }

    pub fn anr_timer_count(&self) -> usize {
        self.inner.state.lock().anr_timer_count
    }

    pub fn pending_event_count(&self, persistent_id: i32) -> usize {
        self.inner.state.lock().event_stage.pending_count(persistent_id)
    }

    pub fn is_anr_triggered(&self, persistent_id: i32) -> bool {
        let state = self.inner.state.lock();
        if state.event_stage.check_anr_status(persistent_id) {
            debug!(
                "Приложение не отвечает, окно {} -> {}",
                persistent_id,
                state.application_map.get(&persistent_id).cloned().unwrap_or_default()
            );
            return true;
        }
        false
    }

    /// Сессия окна потеряна: забываем таймеры, приложение и состояние окна
    pub fn on_session_lost(&self, persistent_id: i32) {
        let mut state = self.inner.state.lock();
        let timer_ids = state.event_stage.take_timer_ids(persistent_id);
        state.release_timers(&self.inner.timers, &timer_ids);

        if let Some(app) = state.application_map.remove(&persistent_id) {
            debug!("Сессия окна {} потеряна, приложение {}", persistent_id, app);
        }
        state.event_stage.on_session_lost(persistent_id);
    }

    pub fn set_application_info(&self, persistent_id: i32, pid: i32, process_name: impl Into<String>) {
        let app = AppInfo::new(pid, process_name);
        debug_if_enabled!("Окно {} -> {}", persistent_id, app);
        self.inner.state.lock().application_map.insert(persistent_id, app);
    }

    pub fn set_anr_observer<F>(&self, observer: F)
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.inner.state.lock().anr_observer = Some(Arc::new(observer));
    }

    /// Установить поиск пакета по pid; `None` оставляет прежний
    pub fn set_app_info_getter<F>(&self, getter: Option<F>)
    where
        F: Fn(i32) -> Option<AppBundleInfo> + Send + Sync + 'static,
    {
        let Some(getter) = getter else {
            debug!("Пустой AppInfoGetter проигнорирован");
            return;
        };
        let mut state = self.inner.state.lock();
        state.app_info_getter = Some(Arc::new(getter));
        state.clear_bundle_cache();
    }

    pub fn clear_app_info_getter(&self) {
        let mut state = self.inner.state.lock();
        state.app_info_getter = None;
        state.clear_bundle_cache();
    }

    pub fn has_app_info_getter(&self) -> bool {
        self.inner.state.lock().app_info_getter.is_some()
    }

    pub fn get_bundle_name(&self, pid: i32, persistent_id: i32) -> String {
        self.inner.get_bundle_name(pid, persistent_id)
    }
}

impl Drop for AnrManager {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        let timer_ids = state.event_stage.clear();
        state.release_timers(&self.inner.timers, &timer_ids);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimerConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::{Duration, Instant};

    fn anr_config(timeout_ms: u64) -> AnrConfig {
        AnrConfig {
            timeout_ms,
            max_anr_timers: 64,
            bundle_cache_capacity: 2,
        }
    }

    fn manager(timeout_ms: u64) -> (AnrManager, UnboundedReceiver<AnrEvent>) {
        let timers = Arc::new(TimerManager::new(&TimerConfig::default()));
        let (manager, rx) = AnrManager::new(&anr_config(timeout_ms), timers);
        manager.init().unwrap();
        (manager, rx)
    }

    fn recv_within(rx: &mut UnboundedReceiver<AnrEvent>, timeout: Duration) -> Option<AnrEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(event) = rx.try_recv() {
                return Some(event);
            }
            if Instant::now() >= deadline {
                return None;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn init_leaves_switch_auto() {
        let (manager, _rx) = manager(5000);
        assert!(!manager.is_enabled());
        assert_eq!(manager.switch_state(), AnrSwitch::Auto);
    }

    #[test]
    fn invalid_window_is_rejected_without_switching() {
        let (manager, _rx) = manager(5000);

        assert!(matches!(manager.add_timer(0, 1), Err(AnrError::InvalidArgument(_))));
        assert!(matches!(manager.add_timer(1, -1), Err(AnrError::InvalidArgument(_))));
        assert!(!manager.is_enabled());
        assert_eq!(manager.anr_timer_count(), 0);
    }

    #[test]
    fn first_timer_turns_switch_on() {
        let (manager, _rx) = manager(5000);

        manager.add_timer(1, 1).unwrap();
        manager.add_timer(1, 2).unwrap();
        assert!(manager.is_enabled());
        assert_eq!(manager.anr_timer_count(), 2);
        assert_eq!(manager.pending_event_count(1), 2);
    }

    #[test]
    fn mark_processed_unknown_event_is_noop() {
        let (manager, _rx) = manager(5000);
        manager.add_timer(1, 5).unwrap();

        assert_eq!(manager.mark_processed(2, 5), 0);
        assert_eq!(manager.mark_processed(1, 4), 0);
        assert_eq!(manager.anr_timer_count(), 1);
    }

    #[test]
    fn mark_processed_is_cumulative() {
        let (manager, _rx) = manager(5000);
        manager.add_timer(1, 1).unwrap();
        manager.add_timer(1, 2).unwrap();
        manager.add_timer(1, 3).unwrap();

        assert_eq!(manager.mark_processed(1, 2), 2);
        assert_eq!(manager.anr_timer_count(), 1);
        assert_eq!(manager.inner.timers.timer_count(), 1);
    }

    #[test]
    fn remove_timers_for_window_clears_only_that_window() {
        let (manager, _rx) = manager(5000);
        manager.add_timer(1, 1).unwrap();
        manager.add_timer(1, 2).unwrap();
        manager.add_timer(2, 3).unwrap();

        assert_eq!(manager.remove_timers_for_window(1), 2);
        assert_eq!(manager.anr_timer_count(), 1);
        assert_eq!(manager.remove_timers_for_window(7), 0);
    }

    #[test]
    fn set_enabled_clears_timers() {
        let (manager, _rx) = manager(5000);
        manager.add_timer(1, 1).unwrap();

        manager.set_enabled(true);
        assert!(manager.is_enabled());
        assert_eq!(manager.anr_timer_count(), 0);

        manager.set_enabled(false);
        assert!(!manager.is_enabled());
        assert!(matches!(manager.add_timer(1, 2), Err(AnrError::Disabled)));
        assert_eq!(manager.mark_processed(1, 2), 0);
    }

    #[test]
    fn timer_limit() {
        let timers = Arc::new(TimerManager::new(&TimerConfig::default()));
        let config = AnrConfig {
            max_anr_timers: 2,
            ..anr_config(5000)
        };
        let (manager, _rx) = AnrManager::new(&config, timers);
        manager.init().unwrap();

        manager.add_timer(1, 1).unwrap();
        manager.add_timer(1, 2).unwrap();
        assert!(matches!(manager.add_timer(1, 3), Err(AnrError::TimerLimit(2))));
    }

    #[test]
    fn add_timer_without_running_timers_fails() {
        let timers = Arc::new(TimerManager::new(&TimerConfig::default()));
        let (manager, _rx) = AnrManager::new(&anr_config(5000), timers);

        assert!(matches!(manager.add_timer(1, 1), Err(AnrError::NotRunning)));
        assert!(!manager.is_enabled());
        assert_eq!(manager.anr_timer_count(), 0);
    }

    #[test]
    fn bundle_name_without_getter_is_unknown() {
        let (manager, _rx) = manager(5000);
        assert!(!manager.has_app_info_getter());
        assert_eq!(manager.get_bundle_name(0, 0), UNKNOWN_BUNDLE_NAME);
        assert_eq!(manager.get_bundle_name(1, 1), UNKNOWN_BUNDLE_NAME);
    }

    #[test]
    fn bundle_names_are_cached_per_pid() {
        let (manager, _rx) = manager(5000);
        let lookups = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&lookups);
        manager.set_app_info_getter(Some(move |pid: i32| {
            counter.fetch_add(1, Ordering::SeqCst);
            (pid != 99).then(|| AppBundleInfo::new(format!("bundle.{}", pid), 1000 + pid))
        }));

        assert_eq!(manager.get_bundle_name(10, 1), "bundle.10");
        assert_eq!(manager.get_bundle_name(10, 1), "bundle.10");
        assert_eq!(lookups.load(Ordering::SeqCst), 1);

        assert_eq!(manager.get_bundle_name(99, 2), UNKNOWN_BUNDLE_NAME);

        // Ёмкость кэша 2: pid 10 вытесняется
        manager.get_bundle_name(11, 3);
        manager.get_bundle_name(12, 4);
        manager.get_bundle_name(10, 1);
        assert_eq!(lookups.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn empty_getter_keeps_previous() {
        let (manager, _rx) = manager(5000);
        manager.set_app_info_getter(None::<fn(i32) -> Option<AppBundleInfo>>);
        assert!(!manager.has_app_info_getter());

        manager.set_app_info_getter(Some(|_pid: i32| Some(AppBundleInfo::new("app", 1))));
        manager.set_app_info_getter(None::<fn(i32) -> Option<AppBundleInfo>>);
        assert!(manager.has_app_info_getter());
        assert_eq!(manager.get_bundle_name(1, 1), "app");

        manager.clear_app_info_getter();
        assert!(!manager.has_app_info_getter());
        assert_eq!(manager.get_bundle_name(1, 1), UNKNOWN_BUNDLE_NAME);
    }

    #[tokio::test]
    async fn unacknowledged_event_escalates_once() {
        let (manager, mut rx) = manager(30);
        manager.set_application_info(7, 4242, "com.example.slow");
        manager.set_app_info_getter(Some(|_pid: i32| Some(AppBundleInfo::new("slow.bundle", 20010))));
        let observed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&observed);
        manager.set_anr_observer(move |pid| {
            assert_eq!(pid, 4242);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        manager.add_timer(7, 1).unwrap();
        manager.add_timer(7, 2).unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.persistent_id, 7);
        assert_eq!(event.event_id, 1);
        assert_eq!(event.pid, 4242);
        assert_eq!(event.process_name, "com.example.slow");
        assert_eq!(event.bundle_name, "slow.bundle");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(observed.load(Ordering::SeqCst), 1);
        assert!(manager.is_anr_triggered(7));
        assert_eq!(manager.anr_timer_count(), 0);
    }

    #[test]
    fn acknowledged_event_never_escalates() {
        let (manager, mut rx) = manager(50);
        manager.add_timer(3, 1).unwrap();
        assert_eq!(manager.mark_processed(3, 1), 1);

        thread::sleep(Duration::from_millis(150));
        assert!(rx.try_recv().is_err());
        assert!(!manager.is_anr_triggered(3));
        assert_eq!(manager.anr_timer_count(), 0);
    }

    #[test]
    fn receipt_after_anr_resets_status() {
        let (manager, mut rx) = manager(20);
        manager.add_timer(4, 1).unwrap();
        thread::sleep(Duration::from_millis(150));
        assert!(rx.try_recv().is_ok());
        assert!(manager.is_anr_triggered(4));

        manager.add_timer(4, 2).unwrap();
        manager.mark_processed(4, 2);
        assert!(!manager.is_anr_triggered(4));
    }

    #[test]
    fn session_lost_forgets_window() {
        let (manager, _rx) = manager(5000);
        manager.set_application_info(5, 100, "app");
        manager.add_timer(5, 1).unwrap();

        manager.on_session_lost(5);
        assert_eq!(manager.anr_timer_count(), 0);
        assert_eq!(manager.pending_event_count(5), 0);
        assert!(!manager.is_anr_triggered(5));
    }

    #[test]
    fn unrepresentable_timeout_is_rejected() {
        let (manager, _rx) = manager(u64::MAX);
        assert!(matches!(manager.add_timer(1, 1), Err(AnrError::InvalidArgument(_))));
        assert_eq!(manager.anr_timer_count(), 0);
        assert_eq!(manager.switch_state(), AnrSwitch::Auto);
    }

    #[test]
    fn late_receipt_for_hung_event_resets_status() {
        let (manager, mut rx) = manager(20);
        manager.add_timer(4, 1).unwrap();

        let event = recv_within(&mut rx, Duration::from_secs(2)).unwrap();
        assert_eq!(event.event_id, 1);
        assert!(manager.is_anr_triggered(4));
        assert_eq!(manager.pending_event_count(4), 1);
        assert_eq!(manager.anr_timer_count(), 0);

        // Таймер уже сработал: снимать нечего, но флаг и событие сбрасываются
        assert_eq!(manager.mark_processed(4, 1), 0);
        assert!(!manager.is_anr_triggered(4));
        assert_eq!(manager.pending_event_count(4), 0);
    }

    #[test]
    fn set_enabled_resets_anr_status() {
        let (manager, mut rx) = manager(20);
        manager.add_timer(6, 1).unwrap();
        assert!(recv_within(&mut rx, Duration::from_secs(2)).is_some());
        assert!(manager.is_anr_triggered(6));

        manager.set_enabled(true);
        assert!(!manager.is_anr_triggered(6));
        assert_eq!(manager.pending_event_count(6), 0);
    }

    #[test]
    fn short_timeouts_escalate_every_window() {
        let (manager, mut rx) = manager(1);
        for window in 1..=40 {
            manager.add_timer(window, 1).unwrap();
        }

        let mut windows: Vec<i32> = (0..40)
            .map(|_| recv_within(&mut rx, Duration::from_secs(2)).unwrap().persistent_id)
            .collect();
        windows.sort();
        assert_eq!(windows, (1..=40).collect::<Vec<_>>());
        assert_eq!(manager.anr_timer_count(), 0);
        assert!((1..=40).all(|window| manager.is_anr_triggered(window)));
    }

    #[test]
    fn concurrent_add_and_receipts_stay_consistent() {
        let timers = Arc::new(TimerManager::new(&TimerConfig::default()));
        let (manager, mut rx) = AnrManager::new(&anr_config(5000), Arc::clone(&timers));
        manager.init().unwrap();
        let manager = Arc::new(manager);

        let workers: Vec<_> = (1..=4)
            .map(|window| {
                let manager = Arc::clone(&manager);
                thread::spawn(move || {
                    for event_id in 0..200 {
                        manager.add_timer(window, event_id).unwrap();
                        if event_id % 2 == 1 {
                            assert_eq!(manager.mark_processed(window, event_id), 2);
                        }
                        manager.is_anr_triggered(window);
                    }
                    manager.add_timer(window, 1000).unwrap();
                    assert_eq!(manager.remove_timers_for_window(window), 1);
                    manager.mark_processed(window, 1000);
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(manager.anr_timer_count(), 0);
        assert_eq!(timers.timer_count(), 0);
        assert!((1..=4).all(|window| manager.pending_event_count(window) == 0));
        assert!(rx.try_recv().is_err());
    }
}
