use std::{
    fs::OpenOptions,
    io::Write,
    sync::{
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::trace::trace::TraceEvent;

/// Chronological JSONL run log. Each run overwrites the previous file.
pub struct TraceLogger {
    file: Option<Mutex<std::fs::File>>,
    step: AtomicU64,
}

impl TraceLogger {
    pub fn new(path: &str) -> Self {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path);

        match file {
            Ok(f) => Self {
                file: Some(Mutex::new(f)),
                step: AtomicU64::new(0),
            },
            Err(e) => {
                tracing::warn!("Could not open run log '{}': {}", path, e);
                Self::disabled()
            }
        }
    }

    /// A logger that drops every event.
    pub fn disabled() -> Self {
        Self {
            file: None,
            step: AtomicU64::new(0),
        }
    }

    /// Stamp the event with the next step number and append it.
    pub fn log(&self, mut event: TraceEvent) {
        event.step = self.step.fetch_add(1, Ordering::Relaxed);

        let file_mutex = match &self.file {
            Some(f) => f,
            None => return, // run log disabled
        };

        let json = match serde_json::to_string(&event) {
            Ok(j) => j,
            Err(e) => {
                tracing::warn!("Failed to serialize run log event: {}", e);
                return;
            }
        };

        let mut file = match file_mutex.lock() {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Run log lock poisoned: {}", e);
                return;
            }
        };

        if let Err(e) = writeln!(file, "{}", json) {
            tracing::warn!("Failed to write run log event: {}", e);
        }
    }

    /// Number of events logged so far.
    pub fn steps(&self) -> u64 {
        self.step.load(Ordering::Relaxed)
    }
}
