use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use parking_lot::Mutex;
use sqlx::{Row, SqlitePool};
use tracing::{error, info, warn};

use crate::structs::reminders::Reminder;
use crate::types::{MigrationError, Result};
use crate::helpers::reminder::ReminderStore;

/// A reminder as stored by an older backend, before context capture existed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyReminder {
    pub owner: String,
    pub target: String,
    pub created_at: Option<DateTime<Utc>>,
    pub due_at: DateTime<Utc>,
    pub message: String,
}

impl LegacyReminder {
    fn into_reminder(self, now: DateTime<Utc>) -> Result<Reminder> {
        let created_at = self.created_at.unwrap_or(now).min(self.due_at);
        Reminder::new(self.owner, self.target, created_at, self.due_at, self.message)
    }
}

#[async_trait]
pub trait LegacySource: Send + Sync {
    fn describe(&self) -> String;

    async fn is_present(&self) -> bool;

    async fn read_all(&self) -> Result<Vec<LegacyReminder>, MigrationError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    AlreadyMigrated,
    NotPresent,
    Migrated(usize),
    /// The source could not be read; the marker is set so this is not retried.
    Failed,
}

/// Moves legacy reminders into `store` once; later calls see the marker and do nothing.
pub async fn migrate_legacy(
    store: &Mutex<ReminderStore>,
    source: &dyn LegacySource,
    now: DateTime<Utc>,
) -> Result<MigrationOutcome> {
    if store.lock().is_legacy_migrated() {
        return Ok(MigrationOutcome::AlreadyMigrated);
    }

    if !source.is_present().await {
        info!(source = %source.describe(), "No legacy reminders to migrate");
        return Ok(MigrationOutcome::NotPresent);
    }

    let legacy = match source.read_all().await {
        Ok(legacy) => legacy,
        Err(e) => {
            error!(source = %source.describe(), error = %e, "Skipping legacy reminder migration");
            store.lock().import_legacy(Vec::new())?;
            return Ok(MigrationOutcome::Failed);
        }
    };

    let reminders = legacy
        .into_iter()
        .map(|l| l.into_reminder(now))
        .collect::<Result<Vec<_>>>()?;

    let mut store = store.lock();
    if store.is_legacy_migrated() {
        return Ok(MigrationOutcome::AlreadyMigrated);
    }
    let count = store.import_legacy(reminders)?;

    info!(source = %source.describe(), count, "Migrated legacy reminders");
    Ok(MigrationOutcome::Migrated(count))
}

/// The host's built-in reminder file: `unixtime\tchannel\tnick\tmessage` per line.
#[derive(Debug, Clone)]
pub struct SopelRemindFile {
    path: PathBuf,
}

impl SopelRemindFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parses every well-formed line. Malformed lines are logged and skipped
    /// so one bad record does not hold back the rest.
    pub fn parse(contents: &str) -> Vec<LegacyReminder> {
        contents
            .lines()
            .enumerate()
            .filter(|(_, raw)| !raw.trim().is_empty())
            .filter_map(|(index, raw)| match Self::parse_line(index + 1, raw) {
                Ok(reminder) => Some(reminder),
                Err(e) => {
                    warn!(line = index + 1, error = %e, "Skipping legacy reminder");
                    None
                }
            })
            .collect()
    }

    fn parse_line(line: usize, raw: &str) -> Result<LegacyReminder, MigrationError> {
        let mut fields = raw.splitn(4, '\t');
        let (Some(unixtime), Some(channel), Some(nick), Some(message)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(MigrationError::Malformed {
                line,
                reason: "expected 4 tab separated fields".into(),
            });
        };

        let seconds: f64 = unixtime.trim().parse().map_err(|_| MigrationError::Malformed {
            line,
            reason: format!("`{unixtime}` is not a timestamp"),
        })?;
        if !seconds.is_finite() {
            return Err(MigrationError::Malformed {
                line,
                reason: format!("`{unixtime}` is not a finite timestamp"),
            });
        }

        let due_at = Utc
            .timestamp_opt(seconds.trunc() as i64, 0)
            .single()
            .ok_or_else(|| MigrationError::Malformed {
                line,
                reason: format!("`{unixtime}` is out of range"),
            })?;

        Ok(LegacyReminder {
            owner: nick.to_string(),
            target: channel.to_string(),
            created_at: None,
            due_at,
            message: message.to_string(),
        })
    }
}

#[async_trait]
impl LegacySource for SopelRemindFile {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn is_present(&self) -> bool {
        self.path.is_file()
    }

    async fn read_all(&self) -> Result<Vec<LegacyReminder>, MigrationError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| MigrationError::Io {
            path: self.path.clone(),
            source,
        })?;

        Ok(Self::parse(&contents))
    }
}

/// An older SQLite `reminders` table, delivered by direct message to `user_id`.
#[derive(Debug, Clone)]
pub struct SqliteReminderTable {
    pool: SqlitePool,
    url: String,
}

impl SqliteReminderTable {
    pub async fn connect(url: &str) -> Result<Self, MigrationError> {
        let pool = SqlitePool::connect(url).await?;
        Ok(Self::new(pool, url))
    }

    pub fn new(pool: SqlitePool, url: impl Into<String>) -> Self {
        Self {
            pool,
            url: url.into(),
        }
    }
}

fn parse_sqlite_time(value: &str) -> Result<DateTime<Utc>, MigrationError> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        .map_err(|e| MigrationError::Database(sqlx::Error::Decode(Box::new(e))))
}

#[async_trait]
impl LegacySource for SqliteReminderTable {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn is_present(&self) -> bool {
        let found = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'reminders'",
        )
        .fetch_optional(&self.pool)
        .await;

        match found {
            Ok(row) => row.is_some(),
            Err(e) => {
                warn!(source = %self.url, error = %e, "Could not inspect legacy database");
                false
            }
        }
    }

    async fn read_all(&self) -> Result<Vec<LegacyReminder>, MigrationError> {
        let rows = sqlx::query(
            r#"SELECT user_id, remind_at, reminder_message, created_at FROM reminders
            WHERE sent = FALSE
            ORDER BY remind_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut reminders = Vec::with_capacity(rows.len());
        for row in rows {
            let remind_at: String = row.try_get("remind_at")?;
            let created_at: Option<String> = row.try_get("created_at")?;
            let user_id: String = row.try_get("user_id")?;

            reminders.push(LegacyReminder {
                owner: user_id.clone(),
                target: user_id,
                created_at: created_at.as_deref().map(parse_sqlite_time).transpose()?,
                due_at: parse_sqlite_time(&remind_at)?,
                message: row.try_get("reminder_message")?,
            });
        }

        Ok(reminders)
    }
}
