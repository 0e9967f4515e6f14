// Copyright (c) 2022-2023 The MobileCoin Foundation

#![allow(unused)]

use std::{str::FromStr, sync::Arc, time::Duration};

use log::{debug, LevelFilter};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use keycard_flow::{
    logging, Action, FlowConfig, FlowParams, FlowStatus, FlowType, KeycardFlow,
    MemoryPairingStore, RunState, Signal,
};
use keycard_sim::{SimCard, SimReader};

pub const PIN: &str = "123456";
pub const PUK: &str = "123456123456";
pub const PAIRING_PASS: &str = "KeycardDefaultPairing";

pub const MNEMONIC: &str =
    "legal winner thank year wave sausage worth useful legal winner thank yellow";

/// Time allowed for the flow to emit each signal
const SIGNAL_TIMEOUT: Duration = Duration::from_secs(2);

pub fn setup_logging() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    logging::init(log_level);
}

/// Initialised card holding keys
pub fn card_with_keys() -> SimCard {
    SimCard::initialized(PIN, PUK, PAIRING_PASS).with_mnemonic(MNEMONIC)
}

/// Flow engine attached to a simulated reader, collecting signals
pub struct Harness {
    pub flow: KeycardFlow<SimReader>,
    pub reader: SimReader,
    pub pairings: Arc<MemoryPairingStore>,
    signals: UnboundedReceiver<Signal>,
}

impl Harness {
    /// Setup a harness with `card` inserted
    pub fn new(card: SimCard) -> Self {
        Self::with_reader(SimReader::with_card(card))
    }

    /// Setup a harness with an existing reader
    pub fn with_reader(reader: SimReader) -> Self {
        setup_logging();

        let pairings = Arc::new(MemoryPairingStore::new());
        let (tx, rx) = unbounded_channel();

        let config = FlowConfig {
            insert_card_delay: Duration::from_millis(20),
        };

        let flow = KeycardFlow::new(reader.clone(), pairings.clone(), Arc::new(tx), config);

        Self {
            flow,
            reader,
            pairings,
            signals: rx,
        }
    }

    pub fn start(&self, flow: FlowType, params: FlowParams) {
        self.flow.start(flow, params).unwrap();
    }

    pub fn resume(&self, params: FlowParams) {
        self.flow.resume(params).unwrap();
    }

    /// Fetch the next signal
    pub async fn next(&mut self) -> Signal {
        match tokio::time::timeout(SIGNAL_TIMEOUT, self.signals.recv()).await {
            Ok(Some(s)) => {
                debug!("Signal: {} {:?}", s.action, s.status.error);
                s
            }
            Ok(None) => panic!("signal channel closed"),
            Err(_) => panic!("timeout waiting for signal"),
        }
    }

    /// Fetch the next signal, checking the action
    pub async fn expect(&mut self, action: Action) -> FlowStatus {
        let s = self.next().await;
        assert_eq!(s.action, action, "unexpected signal: {s:?}");
        s.status
    }

    /// Fetch the flow result, checking the flow is idle
    pub async fn result(&mut self) -> FlowStatus {
        let s = self.expect(Action::FlowResult).await;
        assert_eq!(self.flow.state(), RunState::Idle);
        s
    }

    /// Check no signal is emitted within `d`
    pub async fn expect_none(&mut self, d: Duration) {
        if let Ok(s) = tokio::time::timeout(d, self.signals.recv()).await {
            panic!("unexpected signal: {s:?}");
        }
    }

    /// Run a flow with the provided parameters, expecting no pauses
    pub async fn run(&mut self, flow: FlowType, params: FlowParams) -> FlowStatus {
        self.start(flow, params);
        self.result().await
    }
}

pub fn pin() -> FlowParams {
    FlowParams {
        pin: Some(PIN.to_string()),
        ..Default::default()
    }
}

/// Pair with a card holding keys via login, storing the pairing
pub async fn login(h: &mut Harness) {
    let r = h.run(FlowType::Login, pin()).await;
    assert_eq!(r.error, Some(keycard_flow::StatusError::Ok));
}
