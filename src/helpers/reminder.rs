use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::structs::reminders::Reminder;
use crate::types::PersistenceError;

const FILE_FORMAT_VERSION: u32 = 1;
const TEMP_FILENAME_LEN: usize = 12;

#[derive(Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    saved_at: DateTime<Utc>,
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    legacy_migrated: bool,
    reminders: Vec<Reminder>,
}

/// Pending reminders, written through to a JSON file on every change.
#[derive(Debug)]
pub struct ReminderStore {
    path: PathBuf,
    next_id: u64,
    legacy_migrated: bool,
    reminders: Vec<Reminder>,
}

impl ReminderStore {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();

        if !path.exists() {
            info!(path = %path.display(), "Reminders file does not exist yet, starting empty");
            return Ok(Self {
                path,
                next_id: 1,
                legacy_migrated: false,
                reminders: Vec::new(),
            });
        }

        let contents = fs::read_to_string(&path).map_err(|source| PersistenceError::Io {
            path: path.clone(),
            source,
        })?;
        let file: StoreFile = serde_json::from_str(&contents).map_err(|source| PersistenceError::Format {
            path: path.clone(),
            source,
        })?;

        // Files written by hand or by older builds may lack next_id.
        let highest = file.reminders.iter().map(|r| r.id).max().unwrap_or(0);
        let next_id = file.next_id.max(highest + 1);

        info!(
            path = %path.display(),
            reminders = file.reminders.len(),
            version = file.version,
            "Loaded reminders"
        );

        Ok(Self {
            path,
            next_id,
            legacy_migrated: file.legacy_migrated,
            reminders: file.reminders,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.reminders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reminders.is_empty()
    }

    pub fn pending(&self) -> &[Reminder] {
        &self.reminders
    }

    pub fn is_legacy_migrated(&self) -> bool {
        self.legacy_migrated
    }

    /// Stores the reminder and returns its id. Nothing is kept if the write fails.
    pub fn add_reminder(&mut self, mut reminder: Reminder) -> Result<u64, PersistenceError> {
        let id = self.next_id;
        reminder.id = id;

        self.reminders.push(reminder);
        self.next_id += 1;

        if let Err(e) = self.save() {
            self.reminders.pop();
            self.next_id -= 1;
            return Err(e);
        }

        debug!(reminder_id = id, "Added reminder");
        Ok(id)
    }

    /// Reminders due at `now`, earliest first; equal due times keep insertion order.
    pub fn get_dues(&self, now: DateTime<Utc>) -> Vec<Reminder> {
        let mut dues: Vec<Reminder> = self
            .reminders
            .iter()
            .filter(|r| r.is_due(now))
            .cloned()
            .collect();

        // Stable sort over insertion order.
        dues.sort_by_key(|r| r.due_at);
        dues
    }

    /// Returns whether a reminder was removed. The removal stays in memory
    /// even when the write fails; the next successful save persists it.
    pub fn remove(&mut self, reminder_id: u64) -> Result<bool, PersistenceError> {
        let Some(index) = self.reminders.iter().position(|r| r.id == reminder_id) else {
            return Ok(false);
        };

        self.reminders.remove(index);
        self.save()?;

        debug!(reminder_id, "Removed reminder");
        Ok(true)
    }

    /// Appends migrated reminders and sets the migration marker in a single write.
    pub fn import_legacy(&mut self, reminders: Vec<Reminder>) -> Result<usize, PersistenceError> {
        let before = self.reminders.len();
        let next_id = self.next_id;

        for mut reminder in reminders {
            reminder.id = self.next_id;
            self.next_id += 1;
            self.reminders.push(reminder);
        }
        self.legacy_migrated = true;

        if let Err(e) = self.save() {
            self.reminders.truncate(before);
            self.next_id = next_id;
            self.legacy_migrated = false;
            return Err(e);
        }

        Ok(self.reminders.len() - before)
    }

    pub fn save(&self) -> Result<(), PersistenceError> {
        let file = StoreFile {
            version: FILE_FORMAT_VERSION,
            saved_at: Utc::now(),
            next_id: self.next_id,
            legacy_migrated: self.legacy_migrated,
            reminders: self.reminders.clone(),
        };

        let json = serde_json::to_vec_pretty(&file).map_err(|source| PersistenceError::Format {
            path: self.path.clone(),
            source,
        })?;

        write_atomically(&self.path, &json)
    }
}

/// Writes to a randomly named sibling file, then renames it over `path`.
fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), PersistenceError> {
    let io_err = |source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(io_err)?;

    let temp_name: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TEMP_FILENAME_LEN)
        .map(char::from)
        .collect();
    let temp_path = dir.join(format!(".{temp_name}.tmp"));

    let result = fs::File::create(&temp_path)
        .and_then(|mut file| {
            file.write_all(contents)?;
            file.sync_all()
        })
        .and_then(|_| fs::rename(&temp_path, path));

    if let Err(source) = result {
        error!(path = %path.display(), error = %source, "Error while saving reminders");
        if temp_path.exists() {
            let _ = fs::remove_file(&temp_path);
        }
        return Err(io_err(source));
    }

    Ok(())
}
