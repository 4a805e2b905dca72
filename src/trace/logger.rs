use std::{fs::OpenOptions, io::Write, sync::Mutex};

use crate::trace::event::CrawlEvent;

/// Append-only JSONL sink for crawl events.
///
/// Logging must never take the crawl down: open/serialize/write failures are
/// reported to stderr and otherwise ignored. Construct with `disabled()` to
/// drop events entirely.
pub struct EventLogger {
    file: Option<Mutex<std::fs::File>>,
}

impl EventLogger {
    pub fn new(path: &str) -> Self {
        let file = OpenOptions::new().create(true).append(true).open(path);

        match file {
            Ok(f) => Self {
                file: Some(Mutex::new(f)),
            },
            Err(e) => {
                eprintln!("Warning: could not open event log '{}': {}", path, e);
                Self { file: None }
            }
        }
    }

    pub fn disabled() -> Self {
        Self { file: None }
    }

    pub fn log(&self, event: &CrawlEvent) {
        let file_mutex = match &self.file {
            Some(f) => f,
            None => return, // logging disabled
        };

        let json = match serde_json::to_string(event) {
            Ok(j) => j,
            Err(e) => {
                eprintln!("Warning: failed to serialize crawl event: {}", e);
                return;
            }
        };

        let mut file = match file_mutex.lock() {
            Ok(f) => f,
            Err(e) => {
                eprintln!("Warning: event logger lock poisoned: {}", e);
                return;
            }
        };

        if let Err(e) = writeln!(file, "{}", json) {
            eprintln!("Warning: failed to write crawl event: {}", e);
        }
    }
}
