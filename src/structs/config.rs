use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::types::ConfigurationError;

pub const DEFAULT_MIN_DURATION: f64 = 2_592_000.0;
pub const DEFAULT_CHAT_LINES: usize = 20;

/// How long the paste service keeps an uploaded context snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum PasteExpiration {
    FiveMinutes,
    TenMinutes,
    OneHour,
    OneDay,
    OneWeek,
    OneMonth,
    #[default]
    OneYear,
    Never,
}

impl PasteExpiration {
    pub const ALL: [PasteExpiration; 8] = [
        PasteExpiration::FiveMinutes,
        PasteExpiration::TenMinutes,
        PasteExpiration::OneHour,
        PasteExpiration::OneDay,
        PasteExpiration::OneWeek,
        PasteExpiration::OneMonth,
        PasteExpiration::OneYear,
        PasteExpiration::Never,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PasteExpiration::FiveMinutes => "5min",
            PasteExpiration::TenMinutes => "10min",
            PasteExpiration::OneHour => "1hour",
            PasteExpiration::OneDay => "1day",
            PasteExpiration::OneWeek => "1week",
            PasteExpiration::OneMonth => "1month",
            PasteExpiration::OneYear => "1year",
            PasteExpiration::Never => "never",
        }
    }
}

impl fmt::Display for PasteExpiration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PasteExpiration {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|expiration| expiration.as_str() == s)
            .ok_or_else(|| ConfigurationError::Invalid {
                field: "pastebin_expiration",
                reason: format!(
                    "`{}` is not one of {}",
                    s,
                    Self::ALL.map(PasteExpiration::as_str).join(", ")
                ),
            })
    }
}

impl TryFrom<String> for PasteExpiration {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Settings of the `[ctxreminders]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub persistence_dir: PathBuf,
    /// Bot instance name; prefixes every file this plugin reads or writes.
    pub basename: String,
    pub context_capture_min_duration: f64,
    pub context_capture_max_duration: f64,
    pub context_capture_chat_lines: usize,
    pub pastebin_url: Option<String>,
    pub pastebin_expiration: PasteExpiration,
    pub paste_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub legacy_reminders_file: Option<PathBuf>,
    pub legacy_database_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            persistence_dir: PathBuf::from("."),
            basename: "sopel".to_string(),
            context_capture_min_duration: DEFAULT_MIN_DURATION,
            context_capture_max_duration: f64::INFINITY,
            context_capture_chat_lines: DEFAULT_CHAT_LINES,
            pastebin_url: None,
            pastebin_expiration: PasteExpiration::default(),
            paste_timeout_secs: 30,
            poll_interval_secs: 2,
            legacy_reminders_file: None,
            legacy_database_url: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    ctxreminders: Config,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigurationError> {
        let file: ConfigFile = toml::from_str(contents)?;
        file.ctxreminders.validate()?;
        Ok(file.ctxreminders)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let min = self.context_capture_min_duration;
        let max = self.context_capture_max_duration;

        if min.is_nan() || min < 0.0 {
            return Err(invalid("context_capture_min_duration", format!("{min} must be >= 0")));
        }
        if max.is_nan() || max < min {
            return Err(invalid(
                "context_capture_max_duration",
                format!("{max} must be >= the minimum duration {min}"),
            ));
        }
        if self.context_capture_chat_lines == 0 {
            return Err(invalid("context_capture_chat_lines", "must be at least 1".into()));
        }
        if self.poll_interval_secs == 0 {
            return Err(invalid("poll_interval_secs", "must be at least 1".into()));
        }
        if self.basename.trim().is_empty() {
            return Err(invalid("basename", "must not be empty".into()));
        }

        if let Some(url) = &self.pastebin_url {
            let parsed = reqwest::Url::parse(url)
                .map_err(|e| invalid("pastebin_url", format!("`{url}`: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(invalid("pastebin_url", format!("`{url}` must be http(s)")));
            }
        }

        Ok(())
    }

    pub fn persistence_file(&self) -> PathBuf {
        self.persistence_dir
            .join(format!("{}.contextualreminders.json", self.basename))
    }

    pub fn legacy_reminders_file(&self) -> PathBuf {
        self.legacy_reminders_file.clone().unwrap_or_else(|| {
            self.persistence_dir
                .join(format!("{}.reminders.db", self.basename))
        })
    }

    pub fn paste_timeout(&self) -> Duration {
        Duration::from_secs(self.paste_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigurationError {
    ConfigurationError::Invalid { field, reason }
}
