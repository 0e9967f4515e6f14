// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Signals emitted to the host on every pause and on completion

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::sync::mpsc::UnboundedSender;

use crate::FlowStatus;

/// Signal actions, describing what the host should do next
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    InsertCard,
    CardInserted,
    SwapCard,
    EnterPairing,
    EnterPin,
    EnterPuk,
    EnterNewPin,
    EnterNewPuk,
    EnterNewPairing,
    EnterTxHash,
    #[strum(serialize = "enter-bip44-path")]
    #[serde(rename = "enter-bip44-path")]
    EnterPath,
    EnterMnemonic,
    EnterCardName,
    EnterWallets,
    FlowResult,
}

/// Signal object, an action with the current flow status
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub action: Action,
    pub status: FlowStatus,
}

/// [SignalSink] delivers signals to the host
///
/// Called from the flow worker, implementations must not block.
pub trait SignalSink: Send + Sync {
    fn emit(&self, action: Action, status: &FlowStatus);
}

impl SignalSink for UnboundedSender<Signal> {
    fn emit(&self, action: Action, status: &FlowStatus) {
        let s = Signal {
            action,
            status: status.clone(),
        };

        if self.send(s).is_err() {
            log::warn!("Signal receiver dropped, discarding {action}");
        }
    }
}

impl<T: SignalSink + ?Sized> SignalSink for Arc<T> {
    fn emit(&self, action: Action, status: &FlowStatus) {
        T::emit(self, action, status)
    }
}
