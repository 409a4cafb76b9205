use std::sync::Arc;

use chrono::Duration;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::helpers::context_buffer::ContextBuffer;
use crate::helpers::migration::{migrate_legacy, LegacySource, MigrationOutcome, SopelRemindFile, SqliteReminderTable};
use crate::helpers::paste::{snapshot_text, PasteClient, PasteService};
use crate::helpers::reminder::ReminderStore;
use crate::helpers::reminder_task::{reminder_task, ReminderScheduler};
use crate::structs::capture::CapturePolicy;
use crate::structs::chat_line::ChatLine;
use crate::structs::config::Config;
use crate::structs::reminders::Reminder;
use crate::types::{Clock, Error, Messenger, Result, SystemClock};

/// What the host passes in when a user asks to be reminded.
#[derive(Debug, Clone)]
pub struct ReminderRequest {
    pub owner: String,
    pub target: String,
    /// Buffer the context is captured from (the channel, or a private context name).
    pub context_channel: String,
    pub duration: Duration,
    pub message: String,
}

/// The plugin's collaborators, constructed once at load time.
pub struct ContextualReminders {
    config: Config,
    policy: CapturePolicy,
    store: Arc<Mutex<ReminderStore>>,
    buffer: Mutex<ContextBuffer>,
    uploader: Option<Arc<dyn PasteService>>,
    clock: Arc<dyn Clock>,
}

impl ContextualReminders {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let uploader: Option<Arc<dyn PasteService>> = match &config.pastebin_url {
            Some(url) => Some(Arc::new(PasteClient::new(url, config.paste_timeout())?)),
            None => None,
        };
        let store = ReminderStore::load(config.persistence_file())?;

        Ok(Self {
            policy: CapturePolicy::new(
                config.context_capture_min_duration,
                config.context_capture_max_duration,
                uploader.is_some(),
            ),
            store: Arc::new(Mutex::new(store)),
            buffer: Mutex::new(ContextBuffer::new(config.context_capture_chat_lines)),
            uploader,
            clock: Arc::new(SystemClock),
            config,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_paste_service(mut self, uploader: Option<Arc<dyn PasteService>>) -> Self {
        self.policy.upload_configured = uploader.is_some();
        self.uploader = uploader;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> Arc<Mutex<ReminderStore>> {
        Arc::clone(&self.store)
    }

    /// Feeds a line the host saw into the context buffer.
    pub fn observe(&self, line: ChatLine) {
        self.buffer.lock().push(line);
    }

    /// Creates and persists a reminder. A failed paste upload only drops the
    /// context link; persistence failures are returned.
    pub async fn create_reminder(&self, request: ReminderRequest) -> Result<Reminder> {
        let now = self.clock.now();
        let due_at = now
            .checked_add_signed(request.duration)
            .ok_or(Error::DurationOutOfRange {
                seconds: request.duration.num_seconds(),
            })?;
        let reminder = Reminder::new(request.owner, request.target, now, due_at, request.message)?;

        let seconds = request.duration.num_milliseconds() as f64 / 1000.0;
        let decision = self.policy.decide(seconds);
        debug!(
            owner = %reminder.owner,
            seconds,
            capture = decision.capture,
            upload = decision.upload,
            "Context capture decision"
        );

        let mut context_url = None;
        if decision.capture {
            let lines = self.buffer.lock().snapshot(&request.context_channel);
            match &self.uploader {
                Some(uploader) if decision.upload && !lines.is_empty() => {
                    let text = snapshot_text(&request.context_channel, now, &lines);
                    match uploader.upload(&text, self.config.pastebin_expiration).await {
                        Ok(url) => context_url = Some(url),
                        Err(e) => {
                            warn!(
                                channel = %request.context_channel,
                                error = %e,
                                "Could not upload reminder context, continuing without it"
                            );
                        }
                    }
                }
                _ => debug!(lines = lines.len(), "Captured context was not uploaded"),
            }
        }

        let mut reminder = reminder.with_context_url(context_url);
        let id = self.store.lock().add_reminder(reminder.clone())?;
        reminder.id = id;

        info!(
            reminder_id = id,
            owner = %reminder.owner,
            target = %reminder.target,
            due_at = %reminder.due_at,
            has_context = reminder.context_url.is_some(),
            "Reminder set"
        );
        Ok(reminder)
    }

    /// Migrates from the legacy sources named in the config.
    pub async fn migrate(&self) -> Result<Vec<MigrationOutcome>> {
        let mut outcomes = Vec::new();

        let file = SopelRemindFile::new(self.config.legacy_reminders_file());
        outcomes.push(self.migrate_from(&file).await?);

        if let Some(url) = &self.config.legacy_database_url {
            match SqliteReminderTable::connect(url).await {
                Ok(table) => outcomes.push(self.migrate_from(&table).await?),
                Err(e) => warn!(source = %url, error = %e, "Could not open legacy reminder database"),
            }
        }

        Ok(outcomes)
    }

    pub async fn migrate_from(&self, source: &dyn LegacySource) -> Result<MigrationOutcome> {
        migrate_legacy(&self.store, source, self.clock.now()).await
    }

    pub fn scheduler(&self, messenger: Arc<dyn Messenger>) -> ReminderScheduler {
        ReminderScheduler::new(self.store(), messenger)
    }

    pub fn spawn_scheduler(&self, messenger: Arc<dyn Messenger>) -> JoinHandle<()> {
        let scheduler = Arc::new(self.scheduler(messenger));
        let clock = Arc::clone(&self.clock);
        let every = self.config.poll_interval();

        tokio::spawn(async move {
            reminder_task(scheduler, clock, every).await;
        })
    }

    pub fn shutdown(&self) -> Result<()> {
        self.store.lock().save()?;
        Ok(())
    }
}
