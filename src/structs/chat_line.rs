use chrono::{DateTime, Utc};

pub const PRETTY_TIMEFORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Message,
    Action,
    /// Any other CTCP query, carrying its intent.
    Ctcp(String),
}

/// Channel privilege shown in front of the speaker's nick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Modifier {
    #[default]
    None,
    Voice,
    Op,
}

impl Modifier {
    fn as_str(self) -> &'static str {
        match self {
            Modifier::None => " ",
            Modifier::Voice => "+",
            Modifier::Op => "@",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub channel: String,
    pub speaker: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub kind: LineKind,
    pub modifier: Modifier,
}

impl ChatLine {
    pub fn new(
        channel: impl Into<String>,
        speaker: impl Into<String>,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            channel: channel.into(),
            speaker: speaker.into(),
            text: text.into(),
            timestamp,
            kind: LineKind::Message,
            modifier: Modifier::None,
        }
    }

    pub fn with_kind(mut self, kind: LineKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifier = modifier;
        self
    }

    pub fn render(&self) -> String {
        let message = match &self.kind {
            LineKind::Message => format!("<{}{}> {}", self.modifier.as_str(), self.speaker, self.text),
            LineKind::Action => format!("* {} {}", self.speaker, self.text),
            LineKind::Ctcp(intent) => {
                format!("CTCP query to {} from {}: {}", self.channel, self.speaker, intent)
            }
        };

        format!("[{}] {}", self.timestamp.format(PRETTY_TIMEFORMAT), message)
    }
}

/// Buffer key for a private conversation, so its context never leaks into a channel.
pub fn private_context_name(hostmask: &str) -> String {
    format!("PRIVMSG-{}", hostmask)
}
