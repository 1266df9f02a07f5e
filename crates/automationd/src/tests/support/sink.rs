//! Frame sink that decodes and keeps every frame it receives.

use std::sync::Mutex;

use automation_framing::{FrameSink, FramingError};
use serde_json::Value;

#[derive(Debug, Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<Value>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<Value> {
        self.frames.lock().expect("frames lock").clone()
    }

    /// Number of recorded stream events of `kind`.
    pub fn count_of(&self, kind: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| event["event"] == kind)
            .count()
    }
}

impl FrameSink for RecordingSink {
    fn send_raw(&self, body: &[u8]) -> Result<(), FramingError> {
        let value = serde_json::from_slice(body)?;
        self.frames.lock().expect("frames lock").push(value);
        Ok(())
    }
}
