pub mod capture;
pub mod chat_line;
pub mod config;
pub mod reminders;
