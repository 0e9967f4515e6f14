// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Flow worker, running the session loop for a single flow

use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use tokio::sync::mpsc::UnboundedReceiver;

use keycard_card::{ApplicationInfo, CardError, CardSession, Connector};

use super::{lock, Command, FlowConfig, RunState, Shared};
use crate::{
    Action, FlowParams, FlowStatus, FlowType, PairingStore, SignalSink, StatusError,
};

/// Control signals interrupting a flow step
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Interrupt {
    /// Drop the card session and run the flow again from connection
    Restart,
    /// No usable pairing and pairing was not permitted
    GiveUp,
    /// Flow cancelled by the user
    Cancelled,
    /// Flow failed with the provided error
    Failed(StatusError),
}

/// Result type for flow steps
pub(crate) type Step<T> = Result<T, Interrupt>;

/// Map card errors to flow interrupts
pub(crate) trait CardResultExt<T> {
    /// Restart on transport errors, fail with `err` otherwise
    fn or_fail(self, err: StatusError) -> Step<T>;
}

impl<T> CardResultExt<T> for Result<T, CardError> {
    fn or_fail(self, err: StatusError) -> Step<T> {
        self.map_err(|e| match e.is_transport() {
            true => {
                debug!("Transport error ({e}), restarting");
                Interrupt::Restart
            }
            false => {
                warn!("Card error: {e}");
                Interrupt::Failed(err)
            }
        })
    }
}

/// Card snapshot, reset on every connection attempt
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct CardInfo {
    pub instance_uid: Option<String>,
    pub key_uid: Option<String>,
    pub free_slots: Option<u8>,
    pub pin_retries: Option<u8>,
    pub puk_retries: Option<u8>,
}

impl CardInfo {
    /// Check whether the card holds a key
    pub fn has_keys(&self) -> bool {
        matches!(&self.key_uid, Some(k) if !k.is_empty())
    }

    /// Fill unset status fields from the snapshot
    pub fn apply(&self, status: &mut FlowStatus) {
        if status.instance_uid.is_none() {
            status.instance_uid = self.instance_uid.clone();
        }
        if status.key_uid.is_none() {
            status.key_uid = self.key_uid.clone();
        }
        if status.free_pairing_slots.is_none() {
            status.free_pairing_slots = self.free_slots;
        }
        if status.pin_retries.is_none() {
            status.pin_retries = self.pin_retries;
        }
        if status.puk_retries.is_none() {
            status.puk_retries = self.puk_retries;
        }
    }
}

/// Flow worker, owns the parameters and card state for a session
pub(crate) struct Worker<C: Connector> {
    pub(crate) flow: FlowType,
    pub(crate) params: FlowParams,
    pub(crate) card: CardInfo,
    /// Application info from the last selection
    pub(crate) app: ApplicationInfo,
    /// Pairing slot of the open secure channel
    pub(crate) pairing_index: Option<u8>,

    connector: Arc<C>,
    pub(crate) pairings: Arc<dyn PairingStore>,
    signals: Arc<dyn SignalSink>,
    config: FlowConfig,
    shared: Arc<Mutex<Shared>>,
    commands: UnboundedReceiver<Command>,
}

impl<C: Connector> Worker<C> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        flow: FlowType,
        params: FlowParams,
        connector: Arc<C>,
        pairings: Arc<dyn PairingStore>,
        signals: Arc<dyn SignalSink>,
        config: FlowConfig,
        shared: Arc<Mutex<Shared>>,
        commands: UnboundedReceiver<Command>,
    ) -> Self {
        Self {
            flow,
            params,
            card: CardInfo::default(),
            app: ApplicationInfo::default(),
            pairing_index: None,
            connector,
            pairings,
            signals,
            config,
            shared,
            commands,
        }
    }

    /// Run the flow to completion, restarting the session as required
    pub(crate) async fn run(mut self) {
        let result = loop {
            match self.attempt().await {
                Ok(mut status) => {
                    self.card.apply(&mut status);
                    break Some(status);
                }
                Err(Interrupt::Restart) => {
                    debug!("Restarting {} session", self.flow);
                    continue;
                }
                Err(Interrupt::Cancelled) => break None,
                Err(Interrupt::GiveUp) => break Some(FlowStatus::with_error(StatusError::Cancel)),
                Err(Interrupt::Failed(e)) => {
                    let mut status = FlowStatus::with_error(e);
                    self.card.apply(&mut status);
                    break Some(status);
                }
            }
        };

        // Return to idle before reporting, so the host may start
        // a new flow from the result handler
        let cancelled = {
            let mut s = lock(&self.shared);
            let cancelled = s.state == RunState::Cancelling;
            s.state = RunState::Idle;
            s.commands = None;
            cancelled
        };

        // Cancelled after the last pause, the result is discarded
        let result = result.filter(|_| !cancelled);

        match result {
            Some(status) => {
                info!("Flow {} complete ({:?})", self.flow, status.error);
                self.signals.emit(Action::FlowResult, &status);
            }
            None => info!("Flow {} cancelled", self.flow),
        }
    }

    /// Single connection attempt, the card session is released on return
    async fn attempt(&mut self) -> Step<FlowStatus> {
        self.card = CardInfo::default();
        self.pairing_index = None;

        let mut card = self.connect().await?;

        if self.params.factory_reset == Some(true) {
            self.factory_reset(&mut card).await?;
        }

        self.select(&mut card).await?;

        self.dispatch(&mut card).await
    }

    /// Wait for a card, requesting insertion if none is present
    /// within the configured delay
    async fn connect(&mut self) -> Step<C::Session> {
        let connector = self.connector.clone();
        let connect = connector.connect();
        tokio::pin!(connect);

        let delay = tokio::time::sleep(self.config.insert_card_delay);
        tokio::pin!(delay);

        let mut waiting = false;

        loop {
            tokio::select! {
                r = &mut connect => {
                    let card = match r {
                        Ok(c) => c,
                        Err(e) => {
                            warn!("Connection failed: {e}");
                            return Err(Interrupt::Failed(connect_error(&e)));
                        }
                    };

                    if waiting {
                        self.set_running()?;
                        self.emit(Action::CardInserted, FlowStatus::ok());
                    }

                    return Ok(card);
                }
                _ = &mut delay, if !waiting => {
                    self.set_paused()?;
                    waiting = true;

                    debug!("Waiting for card");
                    self.emit(Action::InsertCard, FlowStatus::ok());
                }
                c = self.commands.recv() => match c {
                    Some(Command::Resume(p)) => {
                        // Nothing to resume while waiting for a card, keep the
                        // parameters and continue waiting
                        {
                            let mut s = lock(&self.shared);
                            if s.state == RunState::Cancelling {
                                return Err(Interrupt::Cancelled);
                            }
                            s.state = match waiting {
                                true => RunState::Paused,
                                false => RunState::Running,
                            };
                        }

                        self.params.merge(p);
                    }
                    Some(Command::Cancel) | None => return Err(Interrupt::Cancelled),
                },
            }
        }
    }

    /// Factory reset the card, then restart the session
    async fn factory_reset(&mut self, card: &mut C::Session) -> Step<()> {
        info!("Factory resetting card");

        card.factory_reset()
            .await
            .or_fail(StatusError::FactoryReset)?;

        self.params.factory_reset = None;

        Err(Interrupt::Restart)
    }

    /// Select the applet, populate the card snapshot and check
    /// instance / key constraints
    async fn select(&mut self, card: &mut C::Session) -> Step<()> {
        let app = match card.select().await {
            Ok(a) => a,
            Err(e) if e.is_transport() => return Err(Interrupt::Restart),
            Err(e) => {
                warn!("Select failed: {e}");
                ApplicationInfo::default()
            }
        };

        self.card.instance_uid = Some(hex::encode(&app.instance_uid));
        self.card.key_uid = Some(hex::encode(&app.key_uid));
        self.card.free_slots = Some(app.free_slots);
        self.app = app;

        if !self.app.installed {
            return self
                .pause_and_restart(Action::SwapCard, StatusError::NotAKeycard)
                .await;
        }

        let instance_mismatch =
            matches!(&self.params.instance_uid, Some(uid) if !uid_matches(&self.card.instance_uid, uid));
        if instance_mismatch {
            debug!("Instance UID mismatch");
            return self
                .pause_and_restart(Action::SwapCard, StatusError::InstanceUid)
                .await;
        }

        let key_mismatch =
            matches!(&self.params.key_uid, Some(uid) if !uid_matches(&self.card.key_uid, uid));
        if key_mismatch {
            debug!("Key UID mismatch");
            return self
                .pause_and_restart(Action::SwapCard, StatusError::KeyUid)
                .await;
        }

        Ok(())
    }

    /// Run the handler for the current flow type
    async fn dispatch(&mut self, card: &mut C::Session) -> Step<FlowStatus> {
        match self.flow {
            FlowType::GetAppInfo => self.get_app_info(card).await,
            FlowType::RecoverAccount => self.export_keys(card, true).await,
            FlowType::Login => self.export_keys(card, false).await,
            FlowType::LoadAccount => self.load_account(card).await,
            FlowType::ExportPublic => self.export_public(card).await,
            FlowType::Sign => self.sign(card).await,
            FlowType::ChangePin => self.change_pin(card).await,
            FlowType::ChangePuk => self.change_puk(card).await,
            FlowType::ChangePairing => self.change_pairing(card).await,
            FlowType::UnpairThis => self.unpair_this(card).await,
            FlowType::UnpairOthers => self.unpair_others(card).await,
            FlowType::DeleteAccountAndUnpair => self.delete_account_and_unpair(card).await,
            FlowType::StoreMetadata => self.store_metadata(card).await,
            FlowType::GetMetadata => self.get_metadata(card).await,
        }
    }

    /// Emit a signal with the current card snapshot
    fn emit(&self, action: Action, mut status: FlowStatus) {
        self.card.apply(&mut status);
        self.signals.emit(action, &status);
    }

    fn set_paused(&self) -> Step<()> {
        let mut s = lock(&self.shared);
        if s.state == RunState::Cancelling {
            return Err(Interrupt::Cancelled);
        }
        s.state = RunState::Paused;
        Ok(())
    }

    fn set_running(&self) -> Step<()> {
        let mut s = lock(&self.shared);
        if s.state == RunState::Cancelling {
            return Err(Interrupt::Cancelled);
        }
        s.state = RunState::Running;
        Ok(())
    }

    /// Pause the flow, emitting `action` and waiting for resume or cancel
    pub(crate) async fn pause(&mut self, action: Action, error: Option<StatusError>) -> Step<()> {
        self.pause_with(action, error, FlowStatus::default()).await
    }

    /// Pause the flow with additional status fields
    pub(crate) async fn pause_with(
        &mut self,
        action: Action,
        error: Option<StatusError>,
        mut status: FlowStatus,
    ) -> Step<()> {
        self.set_paused()?;

        debug!("Pausing flow: {action} ({error:?})");

        status.error = error;
        self.emit(action, status);

        match self.commands.recv().await {
            Some(Command::Resume(p)) => {
                self.set_running()?;
                self.params.merge(p);
                Ok(())
            }
            Some(Command::Cancel) | None => Err(Interrupt::Cancelled),
        }
    }

    /// Pause the flow, restarting the session on resume
    pub(crate) async fn pause_and_restart<T>(
        &mut self,
        action: Action,
        error: StatusError,
    ) -> Step<T> {
        self.pause(action, Some(error)).await?;
        Err(Interrupt::Restart)
    }
}

/// Map connection failures to status errors
fn connect_error(e: &CardError) -> StatusError {
    match e {
        CardError::NoService => StatusError::NoPcsc,
        CardError::ReaderList => StatusError::NoReaderList,
        CardError::NoReader => StatusError::NoReaderFound,
        _ => StatusError::Connection,
    }
}

/// Compare a card identifier with a host supplied hex value, ignoring case
fn uid_matches(card: &Option<String>, uid: &str) -> bool {
    matches!(card, Some(c) if c.eq_ignore_ascii_case(uid))
}
