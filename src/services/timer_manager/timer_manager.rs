use crate::config::TimerConfig;
use crate::error::{AnrError, Result};
use crate::trace_if_enabled;
use crate::utils::millis;
use parking_lot::{Condvar, Mutex};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::timer_heap::{Timer, TimerCallback, TimerHeap, TimerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMgrState {
    NotRunning,
    Running,
}

struct TimerQueue {
    state: TimerMgrState,
    // Поколение воркера: поток, запущенный до shutdown, не должен продолжать работу после повторного init
    generation: u64,
    next_timer_id: i32,
    heap: TimerHeap,
}

impl TimerQueue {
    fn is_current(&self, generation: u64) -> bool {
        self.state == TimerMgrState::Running && self.generation == generation
    }

    fn take_next_timer_id(&mut self) -> TimerId {
        loop {
            let id = TimerId(self.next_timer_id);
            self.next_timer_id = if self.next_timer_id == i32::MAX {
                0
            } else {
                self.next_timer_id + 1
            };
            if !self.heap.contains(id) {
                return id;
            }
        }
    }
}

struct Shared {
    queue: Mutex<TimerQueue>,
    wakeup: Condvar,
    idle_delay: Duration,
    max_timers: usize,
}

impl Shared {
    fn calc_next_delay_internal(&self, queue: &TimerQueue) -> Duration {
        if queue.heap.is_empty() {
            return self.idle_delay;
        }
        queue
            .heap
            .peek_deadline()
            .map_or(self.idle_delay, |deadline| deadline.saturating_duration_since(Instant::now()))
    }

    fn add_timer_internal(
        &self,
        queue: &mut TimerQueue,
        interval: Duration,
        callback: TimerCallback,
    ) -> Result<TimerId> {
        if queue.heap.len() >= self.max_timers {
            warn!("Достигнут лимит таймеров: {}", self.max_timers);
            return Err(AnrError::TimerLimit(self.max_timers));
        }

        let Some(next_call_time) = Instant::now().checked_add(interval) else {
            return AnrError::invalid_argument(format!(
                "интервал таймера {} мс вне допустимого диапазона",
                millis(interval)
            ));
        };
        let id = queue.take_next_timer_id();
        let earliest = queue.heap.peek_deadline();
        queue.heap.push(id, interval, next_call_time, callback);

        // Будим воркер только если новый дедлайн раньше текущего ближайшего
        if earliest.map_or(true, |current| next_call_time < current) {
            self.wakeup.notify_one();
        }

        trace_if_enabled!(
            "Добавлен {} через {} мс, всего таймеров: {}",
            id,
            millis(interval),
            queue.heap.len()
        );
        Ok(id)
    }

    fn on_thread(&self, generation: u64) {
        info!("Поток таймеров запущен (поколение {})", generation);

        loop {
            let due = {
                let mut queue = self.queue.lock();
                if !queue.is_current(generation) {
                    break;
                }

                let delay = self.calc_next_delay_internal(&queue);
                if !delay.is_zero() {
                    // Пробуждение раньше срока (новый таймер или shutdown) просто пересчитывает задержку
                    let _ = self.wakeup.wait_for(&mut queue, delay);
                    if !queue.is_current(generation) {
                        break;
                    }
                }
                queue.heap.pop_due(Instant::now())
            };

            Self::run_callbacks(due);
        }

        info!("Поток таймеров остановлен (поколение {})", generation);
    }

    fn process_timers_internal(&self) {
        let due = self.queue.lock().heap.pop_due(Instant::now());
        Self::run_callbacks(due);
    }

    // Вызывается без удержания мьютекса: колбэк может снова обращаться к менеджеру
    fn run_callbacks(due: Vec<Timer>) {
        for timer in due {
            let id = timer.id;
            let callback = timer.callback;
            trace_if_enabled!("Срабатывание {} (интервал {:?})", id, timer.interval);

            if panic::catch_unwind(AssertUnwindSafe(callback)).is_err() {
                error!("Колбэк {} завершился паникой, продолжаем обработку", id);
            }
        }
    }
}

/// Программный планировщик таймеров на отдельном потоке.
///
/// Таймеры одноразовые: после срабатывания таймер удаляется, его id может быть
/// выдан повторно. Колбэки выполняются последовательно на потоке воркера.
pub struct TimerManager {
    shared: Arc<Shared>,
    thread_name: String,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Default for TimerManager {
    fn default() -> Self {
        Self::new(&TimerConfig::default())
    }
}

impl TimerManager {
    pub fn new(config: &TimerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(TimerQueue {
                    state: TimerMgrState::NotRunning,
                    generation: 0,
                    next_timer_id: 0,
                    heap: TimerHeap::new(),
                }),
                wakeup: Condvar::new(),
                idle_delay: Duration::from_millis(config.idle_delay_ms),
                max_timers: config.max_timers,
            }),
            thread_name: config.thread_name.clone(),
            worker: Mutex::new(None),
        }
    }

    /// Запустить поток воркера. Повторный вызов ничего не делает.
    pub fn init(&self) -> Result<()> {
        let mut worker = self.worker.lock();

        let generation = {
            let mut queue = self.shared.queue.lock();
            if queue.state == TimerMgrState::Running {
                debug!("TimerManager уже запущен");
                return Ok(());
            }
            queue.state = TimerMgrState::Running;
            queue.generation += 1;
            queue.generation
        };

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || shared.on_thread(generation));

        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                info!(
                    "TimerManager запущен, поток '{}', период простоя {} мс",
                    self.thread_name,
                    millis(self.shared.idle_delay)
                );
                Ok(())
            }
            Err(e) => {
                self.shared.queue.lock().state = TimerMgrState::NotRunning;
                error!("Не удалось запустить поток таймеров: {}", e);
                Err(AnrError::Io(e))
            }
        }
    }

    /// Зарегистрировать одноразовый таймер.
    pub fn add_timer<F>(&self, interval: Duration, callback: F) -> Result<TimerId>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut queue = self.shared.queue.lock();
        if queue.state != TimerMgrState::Running {
            return Err(AnrError::NotRunning);
        }
        if interval.is_zero() {
            return AnrError::invalid_argument("интервал таймера должен быть больше 0");
        }
        self.shared
            .add_timer_internal(&mut queue, interval, Box::new(callback))
    }

    pub fn remove_timer(&self, id: TimerId) -> Result<()> {
        let mut queue = self.shared.queue.lock();
        match queue.heap.remove(id) {
            Some(_) => {
                trace_if_enabled!("Удалён {}, осталось таймеров: {}", id, queue.heap.len());
                Ok(())
            }
            None => Err(AnrError::TimerNotFound(id)),
        }
    }

    /// Выполнить все просроченные таймеры на вызывающем потоке
    pub fn process_timers(&self) {
        self.shared.process_timers_internal();
    }

    /// Задержка до ближайшего дедлайна или период простоя при пустой куче
    pub fn calc_next_delay(&self) -> Duration {
        let queue = self.shared.queue.lock();
        self.shared.calc_next_delay_internal(&queue)
    }

    pub fn timer_count(&self) -> usize {
        self.shared.queue.lock().heap.len()
    }

    pub fn state(&self) -> TimerMgrState {
        self.shared.queue.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == TimerMgrState::Running
    }

    /// Остановить воркер; ожидающие таймеры отбрасываются без срабатывания.
    pub fn shutdown(&self) {
        let mut worker = self.worker.lock();

        {
            let mut queue = self.shared.queue.lock();
            if queue.state == TimerMgrState::Running {
                let discarded = queue.heap.clear();
                queue.state = TimerMgrState::NotRunning;
                info!("Остановка TimerManager, отброшено таймеров: {}", discarded);
            }
            self.shared.wakeup.notify_all();
        }

        if let Some(handle) = worker.take() {
            // Вызов из колбэка на самом воркере: join привёл бы к взаимоблокировке
            if handle.thread().id() == thread::current().id() {
                debug!("shutdown вызван из потока таймеров, поток завершится сам");
                return;
            }
            if handle.join().is_err() {
                error!("Поток таймеров завершился аварийно");
            }
        }
    }

    #[cfg(test)]
    fn worker_thread_id(&self) -> Option<thread::ThreadId> {
        self.worker.lock().as_ref().map(|h| h.thread().id())
    }
}

impl Drop for TimerManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
