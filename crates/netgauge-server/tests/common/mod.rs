#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use netgauge_core::{SizeLimits, TransferEvent, TransferLog, TransferLogger};
use netgauge_server::AppState;

/// Keeps every session log entry.
#[derive(Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<TransferLog>>,
}

impl RecordingLogger {
    pub fn entry_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn terminal_events(&self) -> Vec<TransferEvent> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event.is_terminal())
            .map(|e| e.event.clone())
            .collect()
    }

    /// Poll until at least one session has finished, or give up after 5s.
    pub async fn wait_for_terminal(&self) -> Vec<TransferEvent> {
        for _ in 0..500 {
            let events = self.terminal_events();
            if !events.is_empty() {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no session finished within 5s");
    }
}

impl TransferLogger for RecordingLogger {
    fn log(&self, entry: TransferLog) {
        self.entries.lock().unwrap().push(entry);
    }
}

pub fn state(limits: SizeLimits) -> (AppState, Arc<RecordingLogger>) {
    let logger = Arc::new(RecordingLogger::default());
    let state = AppState {
        limits,
        logger: logger.clone(),
    };
    (state, logger)
}

/// Small limits so tests stay fast.
pub fn small_limits() -> SizeLimits {
    SizeLimits {
        default_download: 2048,
        max_download: 4096,
        max_upload: 1000,
    }
}
