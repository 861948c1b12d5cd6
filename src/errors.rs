//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Assistant CLI subprocess failed to launch.
    Spawn(String),
    /// Stream framing or protocol failure on the subprocess output.
    Stream(String),
    /// Persistence failure when interacting with `SQLite`.
    Db(String),
    /// Outbound chat delivery failure.
    Delivery(String),
    /// Supervisor already owns a live subprocess.
    AlreadyRunning,
    /// A turn is already in flight for this user.
    TurnInFlight(String),
    /// No active session exists for the addressed user.
    NoActiveSession(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Spawn(msg) => write!(f, "spawn: {msg}"),
            Self::Stream(msg) => write!(f, "stream: {msg}"),
            Self::Db(msg) => write!(f, "db: {msg}"),
            Self::Delivery(msg) => write!(f, "delivery: {msg}"),
            Self::AlreadyRunning => write!(f, "supervisor already owns a live process"),
            Self::TurnInFlight(user) => write!(f, "turn already in flight for user {user}"),
            Self::NoActiveSession(user) => write!(f, "no active session for user {user}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
