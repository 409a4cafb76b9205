use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    /// Assigned by the store; zero until persisted.
    #[serde(default)]
    pub id: u64,
    pub owner: String,
    pub target: String,
    pub created_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_url: Option<String>,
}

impl Reminder {
    pub fn new(
        owner: impl Into<String>,
        target: impl Into<String>,
        created_at: DateTime<Utc>,
        due_at: DateTime<Utc>,
        message: impl Into<String>,
    ) -> Result<Self> {
        if due_at < created_at {
            return Err(Error::InvalidReminder {
                seconds: (due_at - created_at).num_seconds(),
            });
        }

        Ok(Self {
            id: 0,
            owner: owner.into(),
            target: target.into(),
            created_at,
            due_at,
            message: message.into(),
            context_url: None,
        })
    }

    pub fn with_context_url(mut self, context_url: Option<String>) -> Self {
        self.context_url = context_url;
        self
    }

    pub fn duration(&self) -> Duration {
        self.due_at - self.created_at
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }

    /// Text delivered to the target once the reminder fires.
    pub fn formatted_message(&self) -> String {
        match &self.context_url {
            Some(url) if !url.is_empty() => format!("{} (More at {})", self.message, url),
            _ => self.message.clone(),
        }
    }

    /// Confirmation sent back to the owner when the reminder is set.
    pub fn acknowledgement(&self) -> String {
        if self.duration().num_days() == 0 {
            format!("I will remind you at {}", self.due_at.format("%H:%M:%S"))
        } else {
            format!(
                "I will remind you on {} at {} (UTC)",
                self.due_at.format("%Y-%m-%d"),
                self.due_at.format("%H:%M:%S")
            )
        }
    }
}
