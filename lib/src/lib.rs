// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Keycard flow host library
//!
//! Wires the [keycard_flow_core] engine to host facilities: TOML
//! configuration, logging, a JSON file pairing store and a JSON
//! signal envelope emitter.
//!
//! ```no_run
//! use keycard_flow::{card::Connector, open, Config, EnvelopeSink};
//!
//! # fn example(reader: impl Connector) -> Result<(), keycard_flow::Error> {
//! let config = Config::load("keycard.toml")?;
//!
//! let flow = open(&config, reader, EnvelopeSink::new(|s| println!("{s}")))?;
//!
//! let params = keycard_flow::FlowParams::from_json(r#"{"pin": "123456"}"#)?;
//! flow.start(keycard_flow::FlowType::Login, params)?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use log::info;

use keycard_card::Connector;

/// Re-export `keycard-card` for connector implementations
pub use keycard_card::{self as card};

pub use keycard_flow_core::{
    consts, Action, AppInfo, CardMetadata, ExportedKey, FlowConfig, FlowParams, FlowStatus,
    FlowType, KeycardFlow, MemoryPairingStore, PairingStore, PathParam, RunState, Signal,
    SignalSink, StatusError, StoreError, Wallet,
};

/// Flow engine API error
pub use keycard_flow_core::Error as FlowError;

pub mod config;
pub use config::Config;

mod error;
pub use error::Error;

pub mod logging;

mod sink;
pub use sink::{Envelope, EnvelopeSink};

mod store;
pub use store::FilePairingStore;

/// Initialise logging and create a flow engine using the configured
/// pairing store
pub fn open<C: Connector, S: SignalSink + 'static>(
    config: &Config,
    connector: C,
    signals: S,
) -> Result<KeycardFlow<C>, Error> {
    logging::init(config.level()?);

    let pairings = FilePairingStore::open(&config.pairings_file)?;

    info!("Using pairing store: {}", pairings.path().display());

    Ok(KeycardFlow::new(
        connector,
        Arc::new(pairings),
        Arc::new(signals),
        config.flow_config(),
    ))
}
