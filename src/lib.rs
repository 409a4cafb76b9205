//! Reminders for IRC bots that remember what the channel was talking about.
//!
//! Reminders set far enough ahead capture the channel's recent lines and,
//! when a paste service is configured, attach a link to them. The host bot
//! drives everything through [`plugin::ContextualReminders`] and implements
//! [`types::Messenger`] for delivery.

pub mod helpers;
pub mod logging;
pub mod plugin;
pub mod structs;
pub mod types;

pub use helpers::migration::{LegacySource, MigrationOutcome, SopelRemindFile, SqliteReminderTable};
pub use helpers::paste::{PasteClient, PasteService};
pub use helpers::reminder::ReminderStore;
pub use helpers::reminder_task::{ReminderScheduler, TickReport};
pub use plugin::{ContextualReminders, ReminderRequest};
pub use structs::chat_line::{ChatLine, LineKind, Modifier};
pub use structs::config::{Config, PasteExpiration};
pub use structs::reminders::Reminder;
pub use types::{Clock, Error, HostError, Messenger, Result, SystemClock};
