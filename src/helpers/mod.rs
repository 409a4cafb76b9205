pub mod context_buffer;
pub mod migration;
pub mod paste;
pub mod reminder;
pub mod reminder_task;
