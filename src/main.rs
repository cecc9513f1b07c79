use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use anr_rust::config::{Config, LoggingConfig};
use anr_rust::events::AppBundleInfo;
use anr_rust::services::{AnrHandler, AnrManager, DispatchSimulator, TimerManager};

#[derive(Parser, Debug)]
#[command(name = "anr-rust")]
#[command(about = "Обнаружение окон, не отвечающих на входные события (ANR)")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "anr.toml")]
    config: String,

    /// Режим сухого запуска (события доставляются без таймеров ANR)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (перекрывает значение из конфигурации)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Загрузка конфигурации
    let config = Arc::new(Config::load(&args.config)?);

    // Инициализация системы логирования
    let directives = match args.log_level.as_deref() {
        Some(level) => level.to_string(),
        None => format!("{},{}", config.logging.level, config.logging.filter),
    };
    init_tracing(&directives, &config.logging)?;

    info!("Запуск ANR Rust v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    // Инициализация компонентов: единый планировщик таймеров для всей политики ANR
    let timers = Arc::new(TimerManager::new(&config.timer));
    let (anr_manager, mut anr_events) = AnrManager::new(&config.anr, Arc::clone(&timers));
    let anr_manager = Arc::new(anr_manager);
    anr_manager.init()?;

    anr_manager.set_app_info_getter(Some(|pid: i32| {
        Some(AppBundleInfo::new(format!("com.example.bundle{}", pid), 20000 + pid))
    }));
    anr_manager.set_anr_observer(|pid| {
        warn!("Процесс {} не отвечает", pid);
    });

    if args.dry_run {
        warn!("Режим сухого запуска - обнаружение ANR выключено");
        anr_manager.set_enabled(false);
    }

    let anr_handler = Arc::new(AnrHandler::new());
    let simulator = Arc::new(DispatchSimulator::new(
        Arc::clone(&config),
        Arc::clone(&anr_manager),
        Arc::clone(&anr_handler),
    ));

    info!("Все компоненты инициализированы");

    // Запуск сервисов параллельно
    let dispatch_handle = tokio::spawn({
        let simulator = Arc::clone(&simulator);
        async move {
            if let Err(e) = simulator.run().await {
                error!("Ошибка в DispatchSimulator: {}", e);
            }
        }
    });
    let escalation_handle = tokio::spawn({
        let simulator = Arc::clone(&simulator);
        async move {
            while let Some(event) = anr_events.recv().await {
                simulator.on_anr(&event);
            }
        }
    });

    info!("Все сервисы запущены");

    // Ожидание сигнала завершения или окончания времени работы
    let run_time = config.simulation.run_time_secs;
    tokio::select! {
        result = signal::ctrl_c() => match result {
            Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
            Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
        },
        _ = tokio::time::sleep(tokio::time::Duration::from_secs(run_time)), if run_time > 0 => {
            info!("Время работы {} с истекло", run_time);
        }
    }

    info!("Завершение работы...");

    dispatch_handle.abort();
    anr_manager.set_enabled(false);
    timers.shutdown();
    escalation_handle.abort();

    // Ожидаем завершения задач (с таймаутом)
    let shutdown_timeout = tokio::time::Duration::from_secs(5);
    let shutdown_result = tokio::time::timeout(shutdown_timeout, async {
        let _ = dispatch_handle.await;
        let _ = escalation_handle.await;
    })
    .await;

    match shutdown_result {
        Ok(_) => info!("Все сервисы завершили работу корректно"),
        Err(_) => warn!("Таймаут при завершении сервисов"),
    }

    info!("ANR Rust завершил работу, живых окон: {}", simulator.live_windows());
    Ok(())
}

fn init_tracing(directives: &str, logging: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives))?;

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "compact" {
        registry.with(tracing_subscriber::fmt::layer().compact()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    Ok(())
}
