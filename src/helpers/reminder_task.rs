use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, warn};

use crate::helpers::reminder::ReminderStore;
use crate::types::{Clock, Messenger, Result};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub delivered: usize,
    /// Due, but the recipient is not reachable right now.
    pub deferred: usize,
    pub failed: usize,
}

/// Delivers due reminders. A reminder is removed only after the host
/// confirmed delivery, so a crash in between repeats it rather than losing it.
pub struct ReminderScheduler {
    store: Arc<Mutex<ReminderStore>>,
    messenger: Arc<dyn Messenger>,
}

impl ReminderScheduler {
    pub fn new(store: Arc<Mutex<ReminderStore>>, messenger: Arc<dyn Messenger>) -> Self {
        Self { store, messenger }
    }

    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport> {
        let mut report = TickReport::default();

        if !self.messenger.is_ready().await {
            debug!("Not checking reminders, host is not connected yet");
            return Ok(report);
        }

        let dues = self.store.lock().get_dues(now);
        for reminder in dues {
            if !self.messenger.can_deliver(&reminder).await {
                report.deferred += 1;
                continue;
            }

            let text = reminder.formatted_message();
            match self.messenger.deliver(&reminder, &text).await {
                Ok(()) => {
                    report.delivered += 1;
                    if let Err(e) = self.store.lock().remove(reminder.id) {
                        error!(
                            reminder_id = reminder.id,
                            error = %e,
                            "Delivered reminder could not be removed from disk"
                        );
                    }
                }
                Err(e) => {
                    warn!(
                        reminder_id = reminder.id,
                        target = %reminder.target,
                        error = %e,
                        "Error sending reminder, will retry"
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

/// Ticks the scheduler every `every` until the task is dropped.
pub async fn reminder_task(scheduler: Arc<ReminderScheduler>, clock: Arc<dyn Clock>, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match scheduler.tick(clock.now()).await {
            Ok(report) if report != TickReport::default() => {
                debug!(
                    delivered = report.delivered,
                    deferred = report.deferred,
                    failed = report.failed,
                    "Reminder tick"
                );
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "Error checking due reminders");
            }
        }
    }
}
