// Copyright (c) 2022-2023 The MobileCoin Foundation

//! JSON signal envelopes for hosts consuming signals as strings

use log::error;
use serde::Serialize;

use keycard_flow_core::{Action, FlowStatus, SignalSink};

/// Signal envelope, `{"type": "<action>", "event": {<status>}}`
#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    #[serde(rename = "type")]
    pub action: Action,
    pub event: &'a FlowStatus,
}

impl<'a> Envelope<'a> {
    pub fn new(action: Action, event: &'a FlowStatus) -> Self {
        Self { action, event }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// [SignalSink] encoding signals as JSON envelopes and passing them
/// to a host callback
pub struct EnvelopeSink<F> {
    f: F,
}

impl<F: Fn(String) + Send + Sync> EnvelopeSink<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F: Fn(String) + Send + Sync> SignalSink for EnvelopeSink<F> {
    fn emit(&self, action: Action, status: &FlowStatus) {
        match Envelope::new(action, status).to_json() {
            Ok(s) => (self.f)(s),
            Err(e) => error!("Failed to encode {action} signal: {e}"),
        }
    }
}
