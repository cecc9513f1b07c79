use crate::services::timer_manager::TimerId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnrError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Неверный аргумент: {0}")]
    InvalidArgument(String),

    #[error("Менеджер таймеров не запущен")]
    NotRunning,

    #[error("Таймер {0} не найден")]
    TimerNotFound(TimerId),

    #[error("Превышен лимит таймеров: {0}")]
    TimerLimit(usize),

    #[error("Обнаружение ANR выключено")]
    Disabled,

    #[error("Session stage окна {0} уже уничтожен")]
    SessionStageGone(i32),
}

impl AnrError {
    pub fn invalid_argument<T>(msg: impl Into<String>) -> Result<T> {
        Err(AnrError::InvalidArgument(msg.into()))
    }
}

pub type Result<T> = std::result::Result<T, AnrError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! anr_error {
    (invalid_argument, $($arg:tt)*) => {
        $crate::error::AnrError::InvalidArgument(format!($($arg)*))
    };
}
