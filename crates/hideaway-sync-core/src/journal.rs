use crate::normalize::format_send_date;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::Path;
use tracing::{debug, error, info, warn};

pub const DEBUG_JOURNAL_FILE: &str = "_debug.md";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl JournalLevel {
    fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub level: JournalLevel,
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Append-only transcript of one run. Every entry is also emitted through
/// `tracing`; the transcript itself only reaches disk as `_debug.md`.
#[derive(Debug, Default)]
pub struct RunJournal {
    entries: Vec<JournalEntry>,
}

impl RunJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Appends without emitting; used for errors the caller reports itself.
    pub fn record(&mut self, level: JournalLevel, message: impl Into<String>) {
        self.entries.push(JournalEntry {
            level,
            at: Utc::now(),
            message: message.into(),
        });
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!("{message}");
        self.record(JournalLevel::Debug, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{message}");
        self.record(JournalLevel::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        self.record(JournalLevel::Warn, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{message}");
        self.record(JournalLevel::Error, message);
    }

    pub fn render(&self, started_at: &DateTime<Utc>) -> String {
        let mut out = String::from("---\n");
        out.push_str("title: \"Sync debug log\"\n");
        out.push_str(&format!("date: {}\n", format_send_date(started_at)));
        out.push_str("draft: true\n");
        out.push_str("---\n\n");
        for entry in &self.entries {
            out.push_str(&format!(
                "[{}] {} {}\n",
                entry.level.as_str(),
                entry.at.to_rfc3339_opts(SecondsFormat::Millis, true),
                entry.message
            ));
        }
        out
    }

    pub async fn flush_to(&self, dir: &Path, started_at: &DateTime<Utc>) -> Result<()> {
        let path = dir.join(DEBUG_JOURNAL_FILE);
        tokio::fs::write(&path, self.render(started_at))
            .await
            .with_context(|| format!("failed to write debug journal {}", path.display()))
    }
}
