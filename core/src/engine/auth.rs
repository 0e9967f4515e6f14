// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Secure channel establishment, card initialisation and PIN / PUK
//! authentication shared by all flows

use log::{debug, error, info, warn};
use zeroize::Zeroizing;

use keycard_card::{CardError, CardSession, Connector};

use super::session::{CardResultExt, Interrupt, Step, Worker};
use crate::{
    consts::{valid_pin, valid_puk, DEFAULT_PAIRING_PASS, MAX_PIN_RETRIES, MAX_PUK_RETRIES},
    params::forget,
    Action, StatusError,
};

impl<C: Connector> Worker<C> {
    /// Open a secure channel then verify the PIN
    pub(crate) async fn open_and_authenticate(
        &mut self,
        card: &mut C::Session,
        giveup: bool,
    ) -> Step<()> {
        self.open_secure_channel(card, giveup).await?;
        self.authenticate(card).await
    }

    /// Open a secure channel, initialising or pairing the card as required
    ///
    /// With `giveup` set an uninitialised or unpaired card results in
    /// [Interrupt::GiveUp] rather than prompting the user.
    pub(crate) async fn open_secure_channel(
        &mut self,
        card: &mut C::Session,
        giveup: bool,
    ) -> Step<()> {
        loop {
            if !self.app.initialized && !giveup {
                return self.init_card(card).await;
            }

            let uid = self.card.instance_uid.clone().unwrap_or_default();

            if let Some(pairing) = self.pairings.get(&uid) {
                match card.open_secure_channel(&pairing).await {
                    Ok(()) => {
                        // Status can only fail on connection errors
                        let status = card
                            .application_status()
                            .await
                            .map_err(|_| Interrupt::Restart)?;

                        self.card.pin_retries = Some(status.pin_retries);
                        self.card.puk_retries = Some(status.puk_retries);
                        self.pairing_index = Some(pairing.index);

                        debug!("Secure channel open (slot {})", pairing.index);

                        return Ok(());
                    }
                    Err(e) if e.is_transport() => return Err(Interrupt::Restart),
                    Err(e) => {
                        warn!("Removing stale pairing for {uid}: {e}");
                        if let Err(e) = self.pairings.delete(&uid) {
                            error!("Failed to remove pairing: {e}");
                        }
                    }
                }
            }

            if giveup {
                debug!("No usable pairing, giving up");
                return Err(Interrupt::GiveUp);
            }

            self.pair(card).await?;
        }
    }

    /// Initialise a blank card, restarting the session on success
    async fn init_card(&mut self, card: &mut C::Session) -> Step<()> {
        loop {
            let pin = match self.params.new_pin.clone().map(Zeroizing::new) {
                Some(p) if valid_pin(&p) => p,
                Some(_) => {
                    forget(&mut self.params.new_pin);
                    self.pause(Action::EnterNewPin, Some(StatusError::Pin))
                        .await?;
                    continue;
                }
                None => {
                    self.pause(Action::EnterNewPin, Some(StatusError::RequireInit))
                        .await?;
                    continue;
                }
            };

            let puk = match self.params.new_puk.clone().map(Zeroizing::new) {
                Some(p) if valid_puk(&p) => p,
                Some(_) => {
                    forget(&mut self.params.new_puk);
                    self.pause(Action::EnterNewPuk, Some(StatusError::Puk))
                        .await?;
                    continue;
                }
                None => {
                    self.pause(Action::EnterNewPuk, Some(StatusError::RequireInit))
                        .await?;
                    continue;
                }
            };

            let pairing_pass = self
                .params
                .new_pairing_pass
                .take()
                .unwrap_or_else(|| DEFAULT_PAIRING_PASS.to_string());

            let r = card.init(&pin, &puk, &pairing_pass).await;
            if let Err(e) = r {
                self.params.new_pairing_pass = Some(pairing_pass);
                return Err(e).or_fail(StatusError::RequireInit);
            }

            info!("Card initialised");

            // Continue with the new credentials
            forget(&mut self.params.pin);
            forget(&mut self.params.pairing_pass);
            self.params.pin = self.params.new_pin.take();
            self.params.pairing_pass = Some(pairing_pass);
            forget(&mut self.params.new_puk);

            return Err(Interrupt::Restart);
        }
    }

    /// Pair with the card, persisting the pairing on success
    async fn pair(&mut self, card: &mut C::Session) -> Step<()> {
        loop {
            if self.card.free_slots == Some(0) {
                return self
                    .pause_and_restart(Action::SwapCard, StatusError::FreePairingSlots)
                    .await;
            }

            let pass = Zeroizing::new(
                self.params
                    .pairing_pass
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PAIRING_PASS.to_string()),
            );

            match card.pair(&pass).await {
                Ok(pairing) => {
                    let uid = self.card.instance_uid.clone().unwrap_or_default();

                    info!("Paired with card {uid} (slot {})", pairing.index);

                    if let Err(e) = self.pairings.store(&uid, pairing) {
                        error!("Failed to store pairing: {e}");
                        return Err(Interrupt::Failed(StatusError::Pairing));
                    }

                    self.card.free_slots = self.card.free_slots.map(|n| n.saturating_sub(1));

                    return Ok(());
                }
                Err(e) if e.is_transport() => return Err(Interrupt::Restart),
                Err(e) => {
                    debug!("Pairing failed: {e}");
                    forget(&mut self.params.pairing_pass);
                    self.pause(Action::EnterPairing, Some(StatusError::Pairing))
                        .await?;
                }
            }
        }
    }

    /// Verify the PIN, unblocking the card when no PIN attempts remain
    pub(crate) async fn authenticate(&mut self, card: &mut C::Session) -> Step<()> {
        loop {
            if self.card.puk_retries == Some(0) {
                return self
                    .pause_and_restart(Action::SwapCard, StatusError::PukRetries)
                    .await;
            }

            if self.card.pin_retries == Some(0) {
                // A successful unblock leaves the card authenticated
                return self.unblock_pin(card).await;
            }

            let mut error = None;

            if let Some(pin) = self.params.pin.clone().map(Zeroizing::new) {
                if !valid_pin(&pin) {
                    forget(&mut self.params.pin);
                    error = Some(StatusError::Pin);
                } else {
                    match card.verify_pin(&pin).await {
                        Ok(()) => {
                            debug!("PIN verified");
                            self.card.pin_retries = Some(MAX_PIN_RETRIES);
                            return Ok(());
                        }
                        Err(e) if e.is_transport() => return Err(Interrupt::Restart),
                        Err(e) => {
                            warn!("PIN verification failed: {e}");
                            if let CardError::WrongPin { remaining } = e {
                                self.card.pin_retries = Some(remaining);
                            }
                            forget(&mut self.params.pin);
                            error = Some(StatusError::Pin);
                        }
                    }
                }
            }

            if self.card.pin_retries == Some(0) {
                continue;
            }

            self.pause(Action::EnterPin, error).await?;
        }
    }

    /// Unblock the PIN using the PUK, prompting for whichever is missing
    async fn unblock_pin(&mut self, card: &mut C::Session) -> Step<()> {
        loop {
            if self.card.puk_retries == Some(0) {
                return self
                    .pause_and_restart(Action::SwapCard, StatusError::PukRetries)
                    .await;
            }

            let mut puk_error = None;

            let creds = match (&self.params.puk, &self.params.new_pin) {
                (Some(puk), Some(new_pin)) => Some((
                    Zeroizing::new(puk.clone()),
                    Zeroizing::new(new_pin.clone()),
                )),
                _ => None,
            };

            if let Some((puk, new_pin)) = creds {
                if !valid_puk(&puk) {
                    forget(&mut self.params.puk);
                    puk_error = Some(StatusError::Puk);
                } else if !valid_pin(&new_pin) {
                    forget(&mut self.params.new_pin);
                } else {
                    match card.unblock_pin(&puk, &new_pin).await {
                        Ok(()) => {
                            info!("PIN unblocked");

                            self.card.pin_retries = Some(MAX_PIN_RETRIES);
                            self.card.puk_retries = Some(MAX_PUK_RETRIES);

                            forget(&mut self.params.pin);
                            forget(&mut self.params.puk);
                            self.params.pin = self.params.new_pin.take();

                            return Ok(());
                        }
                        Err(e) if e.is_transport() => return Err(Interrupt::Restart),
                        Err(CardError::WrongPuk { remaining }) => {
                            warn!("Wrong PUK ({remaining} attempts remaining)");
                            self.card.puk_retries = Some(remaining);
                            forget(&mut self.params.puk);
                            puk_error = Some(StatusError::Puk);
                        }
                        Err(e) => {
                            warn!("Unblock failed: {e}");
                            return Err(Interrupt::Failed(StatusError::Unblocking));
                        }
                    }
                }
            }

            if self.card.puk_retries == Some(0) {
                continue;
            }

            if self.params.puk.is_none() {
                self.pause(Action::EnterPuk, puk_error).await?;
            } else {
                self.pause(Action::EnterNewPin, Some(StatusError::Unblocking))
                    .await?;
            }
        }
    }
}
