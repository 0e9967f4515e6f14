// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Keycard flow engine
//!
//! This provides a resumable [KeycardFlow][engine::KeycardFlow] engine driving
//! keycards through multi-step operations (pairing, authentication, key
//! loading / export, signing, credential changes, unpairing and metadata).
//!
//! The host starts a flow with a [FlowType] and initial [FlowParams], then
//! receives [Signal]s via a [SignalSink] whenever the flow needs the card to
//! be inserted or a value from the user, resuming the flow with the requested
//! parameters. Every flow ends with an [Action::FlowResult] signal carrying a
//! [FlowStatus], unless cancelled.
//!
//! ## Flows
//!
//! | Flow | Result |
//! |------|--------|
//! | `get-app-info` | application info, pairing state |
//! | `recover-account` / `login` | exported keys |
//! | `load-account` | key UID of the loaded mnemonic |
//! | `export-public` | public key(s) for the requested path(s) |
//! | `sign` | transaction signature |
//! | `change-pin` / `change-puk` / `change-pairing` | - |
//! | `unpair-this` / `unpair-others` / `delete-account-and-unpair` | - |
//! | `store-metadata` / `get-metadata` | card metadata |
//!
//! Card access is abstracted via [keycard_card::Connector], pairings are
//! persisted via a [PairingStore].

pub use keycard_card::{self as card};

pub mod consts;

pub mod engine;
pub use engine::{FlowConfig, KeycardFlow, RunState};

mod error;
pub use error::Error;

mod flow;
pub use flow::FlowType;

pub mod params;
pub use params::{FlowParams, PathParam};

pub mod path;

mod pairing;
pub use pairing::{MemoryPairingStore, PairingStore, StoreError};

mod signal;
pub use signal::{Action, Signal, SignalSink};

mod status;
pub use status::{AppInfo, CardMetadata, ExportedKey, FlowStatus, StatusError, Wallet};
