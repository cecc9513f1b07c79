use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Верхняя граница для таймаутов и периода простоя: сутки
pub const MAX_DELAY_MS: u64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub logging: LoggingConfig,
    pub timer: TimerConfig,
    pub anr: AnrConfig,
    pub simulation: SimulationConfig,
    // Оптимизационный индекс - не сериализуется, строится после загрузки
    #[serde(skip)]
    hung_window_set: HashSet<i32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimerConfig {
    /// Период простоя воркера при пустой куче
    pub idle_delay_ms: u64,
    pub max_timers: usize,
    pub thread_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnrConfig {
    pub timeout_ms: u64,
    pub max_anr_timers: usize,
    pub bundle_cache_capacity: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    pub window_count: i32,
    #[serde(default)]
    pub hung_windows: Vec<i32>,
    pub event_interval_ms: u64,
    pub ack_delay_ms: u64,
    /// 0 - работать до Ctrl+C
    pub run_time_secs: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            idle_delay_ms: 5000,
            max_timers: 128,
            thread_name: "anr-timer".to_string(),
        }
    }
}

impl Default for AnrConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            max_anr_timers: 64,
            bundle_cache_capacity: 16,
        }
    }
}

impl AnrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut config = Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "compact".to_string(),
                filter: "anr_rust=info".to_string(),
            },
            timer: TimerConfig::default(),
            anr: AnrConfig::default(),
            simulation: SimulationConfig {
                window_count: 3,
                hung_windows: vec![3],
                event_interval_ms: 500,
                ack_delay_ms: 20,
                run_time_secs: 0,
            },
            hung_window_set: HashSet::new(),
        };
        config.build_optimization_indexes();
        config
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("ANR_").split("__"));

        let mut config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;
        config.build_optimization_indexes();

        Ok(config)
    }

    /// Строит оптимизационные индексы для быстрого поиска
    pub fn build_optimization_indexes(&mut self) {
        self.hung_window_set = self.simulation.hung_windows.iter().copied().collect();
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "compact" | "full" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        // Валидация планировщика таймеров
        if self.timer.idle_delay_ms == 0 || self.timer.idle_delay_ms > MAX_DELAY_MS {
            anyhow::bail!("idle_delay_ms должно быть в диапазоне 1..={}", MAX_DELAY_MS);
        }
        if self.timer.max_timers == 0 {
            anyhow::bail!("max_timers должно быть больше 0");
        }
        if self.timer.thread_name.is_empty() {
            anyhow::bail!("thread_name не может быть пустым");
        }

        // Валидация политики ANR
        if self.anr.timeout_ms == 0 || self.anr.timeout_ms > MAX_DELAY_MS {
            anyhow::bail!("anr.timeout_ms должно быть в диапазоне 1..={}", MAX_DELAY_MS);
        }
        if self.anr.max_anr_timers == 0 {
            anyhow::bail!("max_anr_timers должно быть больше 0");
        }
        if self.anr.max_anr_timers > self.timer.max_timers {
            anyhow::bail!(
                "max_anr_timers ({}) не может превышать timer.max_timers ({})",
                self.anr.max_anr_timers,
                self.timer.max_timers
            );
        }
        if self.anr.bundle_cache_capacity == 0 {
            anyhow::bail!("bundle_cache_capacity должно быть больше 0");
        }

        // Валидация симуляции
        if self.simulation.window_count <= 0 {
            anyhow::bail!("window_count должно быть больше 0");
        }
        if self.simulation.event_interval_ms < 10 {
            anyhow::bail!("event_interval_ms должно быть минимум 10");
        }
        for id in &self.simulation.hung_windows {
            if *id <= 0 || *id > self.simulation.window_count {
                anyhow::bail!(
                    "Зависшее окно {} вне диапазона 1..={}",
                    id,
                    self.simulation.window_count
                );
            }
        }

        Ok(())
    }

    /// Окно из списка зависших никогда не подтверждает события
    pub fn is_hung_window(&self, persistent_id: i32) -> bool {
        self.hung_window_set.contains(&persistent_id)
    }
}
