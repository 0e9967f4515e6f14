// Copyright (c) 2022-2023 The MobileCoin Foundation

//! The [KeycardFlow] engine runs resumable keycard flows.
//!
//! A flow is started with [KeycardFlow::start], and runs on a background
//! worker until it completes. Whenever the card needs to be inserted or
//! swapped, or a value is required from the user, the worker emits a
//! [Signal][crate::Signal] and pauses until [KeycardFlow::resume] or
//! [KeycardFlow::cancel] is called.
//!
//! Completion is reported via an [Action::FlowResult][crate::Action] signal,
//! cancelled flows complete without a result.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use log::{debug, info};
use strum::Display;
use tokio::{
    runtime::Handle,
    sync::mpsc::{unbounded_channel, UnboundedSender},
    task::JoinHandle,
};

use keycard_card::Connector;

use crate::{Error, FlowParams, FlowType, PairingStore, SignalSink};

mod auth;
mod flows;

mod session;
use session::Worker;

/// Flow run state
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display)]
pub enum RunState {
    /// No flow running
    Idle,
    /// Flow running
    Running,
    /// Flow paused waiting for user input
    Paused,
    /// Resume requested, waiting for the worker to continue
    Resuming,
    /// Cancel requested, waiting for the worker to exit
    Cancelling,
}

/// Engine configuration
#[derive(Clone, Debug, PartialEq)]
pub struct FlowConfig {
    /// Delay before requesting card insertion, an already
    /// present card connects without an [Action::InsertCard][crate::Action] signal
    pub insert_card_delay: Duration,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            insert_card_delay: Duration::from_millis(150),
        }
    }
}

/// Commands from the API to the flow worker
#[derive(Debug)]
pub(crate) enum Command {
    Resume(FlowParams),
    Cancel,
}

/// Session state shared between the API and the worker
#[derive(Debug)]
pub(crate) struct Shared {
    pub state: RunState,
    pub commands: Option<UnboundedSender<Command>>,
    pub worker: Option<JoinHandle<()>>,
}

/// Lock shared state
pub(crate) fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keycard flow engine, generic over [Connector] implementations
///
/// Only one flow may run at a time per engine instance.
pub struct KeycardFlow<C: Connector> {
    connector: Arc<C>,
    pairings: Arc<dyn PairingStore>,
    signals: Arc<dyn SignalSink>,
    config: FlowConfig,
    shared: Arc<Mutex<Shared>>,
}

impl<C: Connector> KeycardFlow<C> {
    /// Create a new flow engine
    pub fn new(
        connector: C,
        pairings: Arc<dyn PairingStore>,
        signals: Arc<dyn SignalSink>,
        config: FlowConfig,
    ) -> Self {
        Self {
            connector: Arc::new(connector),
            pairings,
            signals,
            config,
            shared: Arc::new(Mutex::new(Shared {
                state: RunState::Idle,
                commands: None,
                worker: None,
            })),
        }
    }

    /// Fetch the current run state
    pub fn state(&self) -> RunState {
        lock(&self.shared).state
    }

    /// Start a flow, returning once the worker is launched
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, flow: FlowType, params: FlowParams) -> Result<(), Error> {
        let mut s = lock(&self.shared);

        if s.state != RunState::Idle {
            return Err(Error::AlreadyRunning);
        }

        let rt = Handle::try_current().map_err(|_| Error::NoRuntime)?;

        info!("Starting flow: {flow}");
        debug!("Flow params: {params:?}");

        let (tx, rx) = unbounded_channel();

        let worker = Worker::new(
            flow,
            params,
            self.connector.clone(),
            self.pairings.clone(),
            self.signals.clone(),
            self.config.clone(),
            self.shared.clone(),
            rx,
        );

        s.state = RunState::Running;
        s.commands = Some(tx);
        s.worker = Some(rt.spawn(worker.run()));

        Ok(())
    }

    /// Resume a paused flow, merging the provided parameters
    pub fn resume(&self, params: FlowParams) -> Result<(), Error> {
        let mut s = lock(&self.shared);

        if s.state != RunState::Paused {
            return Err(Error::NotResumable);
        }

        let tx = match &s.commands {
            Some(tx) => tx.clone(),
            None => return Err(Error::NotResumable),
        };

        info!("Resuming flow");
        debug!("Resume params: {params:?}");

        if tx.send(Command::Resume(params)).is_err() {
            return Err(Error::NotResumable);
        }

        s.state = RunState::Resuming;

        Ok(())
    }

    /// Cancel the current flow
    ///
    /// The worker exits at its next suspension point and no result is emitted.
    pub fn cancel(&self) -> Result<(), Error> {
        let mut s = lock(&self.shared);

        if s.state == RunState::Idle {
            return Err(Error::CannotCancelIdle);
        }

        info!("Cancelling flow ({})", s.state);

        s.state = RunState::Cancelling;

        // Wake the worker if it is waiting on a pause or for a card,
        // otherwise the worker observes the state at its next pause
        if let Some(tx) = &s.commands {
            let _ = tx.send(Command::Cancel);
        }

        Ok(())
    }

    /// Wait for the current flow worker to exit
    pub async fn wait(&self) {
        let worker = lock(&self.shared).worker.take();

        if let Some(w) = worker {
            if let Err(e) = w.await {
                log::error!("Flow worker failed: {e}");
            }
        }
    }
}

impl<C: Connector> Drop for KeycardFlow<C> {
    fn drop(&mut self) {
        let s = lock(&self.shared);
        if let Some(w) = &s.worker {
            w.abort();
        }
    }
}
