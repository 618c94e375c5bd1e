// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared fixtures for unit tests: payloads and handlers that record calls.

use crate::event::{Range, Signal};
use crate::handler::{RangeHandler, SignalHandler};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Route engine logs to the test harness (`RUST_LOG=ordoplay_sequence=trace`)
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Shared call log
pub(crate) type CallLog = Arc<Mutex<Vec<String>>>;

pub(crate) fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Signal payload
#[derive(Debug, Clone)]
pub(crate) struct Cue(pub &'static str);

/// Range payload
#[derive(Debug, Clone)]
pub(crate) struct Window(pub &'static str);

/// Signal handler writing `invoke <name>` to its log
#[derive(Debug, Default)]
pub(crate) struct RecordingSignal {
    pub log: Option<CallLog>,
    pub acquisitions: u32,
}

impl RecordingSignal {
    fn record(&self, entry: String) {
        if let Some(log) = &self.log {
            log.lock().push(entry);
        }
    }
}

impl SignalHandler<Cue> for RecordingSignal {
    fn on_acquire(&mut self, _event: &Signal<Cue>) {
        self.acquisitions += 1;
    }

    fn invoke(&mut self, event: &Signal<Cue>) {
        self.record(format!("invoke {}", event.payload.0));
    }
}

/// Range handler writing `enter`, `update`, `exit` and `cancel` entries
#[derive(Debug, Default)]
pub(crate) struct RecordingRange {
    pub log: Option<CallLog>,
}

impl RecordingRange {
    fn record(&self, entry: String) {
        if let Some(log) = &self.log {
            log.lock().push(entry);
        }
    }
}

impl RangeHandler<Window> for RecordingRange {
    fn enter(&mut self, event: &Range<Window>) {
        self.record(format!("enter {}", event.payload.0));
    }

    fn update(&mut self, event: &Range<Window>, elapsed: f32) {
        self.record(format!("update {} {:.1}", event.payload.0, elapsed));
    }

    fn exit(&mut self, event: &Range<Window>) {
        self.record(format!("exit {}", event.payload.0));
    }

    fn cancel(&mut self, event: &Range<Window>) {
        self.record(format!("cancel {}", event.payload.0));
    }
}

/// Take the log contents, leaving it empty
pub(crate) fn drain(log: &CallLog) -> Vec<String> {
    std::mem::take(&mut *log.lock())
}
