use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::structs::reminders::Reminder;

/// Failure reported by the host (delivery, connection state, ...).
pub type HostError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error("Reminder cannot be due before it was created ({seconds}s)")]
    InvalidReminder { seconds: i64 },
    #[error("Reminder duration of {seconds}s is out of range")]
    DurationOutOfRange { seconds: i64 },
}

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Could not read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Config is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Paste request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Paste service answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Paste service reply did not contain a link")]
    MissingUrl,
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Could not access reminders file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Reminders file {} is malformed: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Could not read legacy reminders {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Legacy reminder on line {line} is malformed: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("Legacy reminder database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Wall clock used for reminder creation and scheduler ticks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The host's messaging capability.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Whether the host is connected and has joined its channels.
    async fn is_ready(&self) -> bool {
        true
    }

    /// Whether the reminder's owner is currently reachable at its target.
    async fn can_deliver(&self, _reminder: &Reminder) -> bool {
        true
    }

    async fn deliver(&self, reminder: &Reminder, text: &str) -> Result<(), HostError>;
}
