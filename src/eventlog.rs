//! Append-only event log.
//!
//! One line per event: `[dd.mm.yyyy HH:MM:SS]  LEVEL  message`. Every entry
//! is mirrored to `tracing`, so the file is an audit trail and not the only
//! place events show up.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warning,
    Error,
}

impl EventLevel {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERR",
        }
    }
}

impl std::fmt::Display for EventLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

pub struct EventLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl EventLog {
    /// Open (or create) the log file in append mode.
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry. Write failures are reported through `tracing` only.
    pub async fn log(&self, message: &str, level: EventLevel) {
        match level {
            EventLevel::Info => tracing::info!("{}", message),
            EventLevel::Warning => tracing::warn!("{}", message),
            EventLevel::Error => tracing::error!("{}", message),
        }

        let line = format_entry(&chrono::Local::now(), level, message);
        let mut file = self.file.lock().await;
        if let Err(e) = file.write_all(line.as_bytes()).await {
            tracing::error!(path = %self.path.display(), "Event log write failed: {}", e);
            return;
        }
        if let Err(e) = file.flush().await {
            tracing::error!(path = %self.path.display(), "Event log flush failed: {}", e);
        }
    }

    pub async fn info(&self, message: &str) {
        self.log(message, EventLevel::Info).await;
    }

    /// Log an error as `message: (Type) error` at `ERR`.
    pub async fn log_exception<E>(&self, message: &str, error: &E)
    where
        E: std::error::Error + ?Sized,
    {
        let entry = format!("{message}: ({}) {error}", short_type_name::<E>());
        self.log(&entry, EventLevel::Error).await;
    }
}

fn format_entry<Tz>(at: &chrono::DateTime<Tz>, level: EventLevel, message: &str) -> String
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("[{}]  {}  {}\n", at.format("%d.%m.%Y %H:%M:%S"), level, message)
}

/// `crate::error::WeatherError` -> `WeatherError`.
fn short_type_name<E: ?Sized>() -> &'static str {
    let full = std::any::type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
