// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Flow handlers, one per [FlowType][crate::FlowType]

use log::{debug, info, warn};
use zeroize::Zeroizing;

use keycard_card::{CardSession, Connector, KeyPair, Metadata};

use super::session::{CardResultExt, Interrupt, Step, Worker};
use crate::{
    consts::*,
    params::{forget, PathParam},
    path::DerivationPath,
    Action, AppInfo, CardMetadata, ExportedKey, FlowStatus, StatusError, Wallet,
};

impl<C: Connector> Worker<C> {
    /// Report application info, only authenticating when already paired
    pub(crate) async fn get_app_info(&mut self, card: &mut C::Session) -> Step<FlowStatus> {
        let paired = match self.open_and_authenticate(card, true).await {
            Ok(()) => true,
            Err(Interrupt::GiveUp) => false,
            Err(e) => return Err(e),
        };

        Ok(FlowStatus {
            paired: Some(paired),
            application_info: Some(AppInfo::from(&self.app)),
            ..FlowStatus::ok()
        })
    }

    /// Export the fixed keys used for login, and for recovery the
    /// wallet and master public keys
    pub(crate) async fn export_keys(
        &mut self,
        card: &mut C::Session,
        recover: bool,
    ) -> Step<FlowStatus> {
        self.require_keys().await?;
        self.open_and_authenticate(card, false).await?;

        let mut status = FlowStatus {
            encryption_key: Some(self.export_key(card, ENCRYPTION_PATH, false).await?),
            whisper_key: Some(self.export_key(card, WHISPER_PATH, false).await?),
            ..FlowStatus::ok()
        };

        if recover {
            status.eip1581_key = Some(self.export_key(card, EIP1581_PATH, true).await?);
            status.wallet_root_key = Some(self.export_key(card, WALLET_ROOT_PATH, true).await?);
            status.wallet_key = Some(self.export_key(card, WALLET_PATH, true).await?);
            status.master_key = Some(self.export_key(card, MASTER_PATH, true).await?);
        }

        Ok(status)
    }

    /// Export public keys for one or more host supplied paths
    pub(crate) async fn export_public(&mut self, card: &mut C::Session) -> Step<FlowStatus> {
        self.require_keys().await?;
        self.open_and_authenticate(card, false).await?;

        let mut status = FlowStatus::ok();

        if self.params.export_master_address == Some(true) {
            let master = self.export_key(card, MASTER_PATH, true).await?;
            status.master_key_address = Some(master.address.clone());
        }

        let paths = loop {
            match self.params.bip44_path.clone() {
                Some(PathParam::Single(p)) if DerivationPath::parse(&p).is_ok() => {
                    break PathParam::Single(p)
                }
                Some(PathParam::Many(p))
                    if !p.is_empty() && p.iter().all(|v| DerivationPath::parse(v).is_ok()) =>
                {
                    break PathParam::Many(p)
                }
                Some(_) => {
                    debug!("Invalid export path");
                    self.params.bip44_path = None;
                }
                None => (),
            }

            self.pause(Action::EnterPath, Some(StatusError::Exporting))
                .await?;
        };

        status.exported_key = Some(match paths {
            PathParam::Single(p) => ExportedKey::Single(self.export_key(card, &p, true).await?),
            PathParam::Many(paths) => {
                let mut keys = Vec::with_capacity(paths.len());
                for p in &paths {
                    keys.push(self.export_key(card, p, true).await?);
                }
                ExportedKey::Many(keys)
            }
        });

        Ok(status)
    }

    /// Load a host supplied or card generated mnemonic
    pub(crate) async fn load_account(&mut self, card: &mut C::Session) -> Step<FlowStatus> {
        if self.card.has_keys() && self.params.overwrite != Some(true) {
            return self
                .pause_and_restart(Action::SwapCard, StatusError::HasKeys)
                .await;
        }

        self.open_and_authenticate(card, false).await?;

        loop {
            if let Some(mnemonic) = self.params.mnemonic.clone().map(Zeroizing::new) {
                let words = mnemonic.split_whitespace().count();

                // A requested length must match the supplied mnemonic
                let requested = self
                    .params
                    .mnemonic_length
                    .filter(|l| MNEMONIC_LENGTHS.contains(l));
                let valid = MNEMONIC_LENGTHS.iter().any(|l| *l as usize == words)
                    && requested.map_or(true, |l| l as usize == words);

                if valid {
                    let key_uid = card
                        .load_mnemonic(&mnemonic, "")
                        .await
                        .or_fail(StatusError::LoadingKeys)?;

                    forget(&mut self.params.mnemonic);
                    self.card.key_uid = Some(hex::encode(key_uid));

                    info!("Loaded {words} word mnemonic");

                    return Ok(FlowStatus::ok());
                }

                warn!("Invalid mnemonic length ({words} words)");
                forget(&mut self.params.mnemonic);
            }

            let len = match self.params.mnemonic_length {
                Some(l) if MNEMONIC_LENGTHS.contains(&l) => l,
                _ => DEFAULT_MNEMONIC_LEN,
            };

            let indexes = card
                .generate_mnemonic(len / 3)
                .await
                .or_fail(StatusError::LoadingKeys)?;

            let status = FlowStatus {
                mnemonic_indexes: Some(indexes),
                ..Default::default()
            };

            self.pause_with(Action::EnterMnemonic, Some(StatusError::LoadingKeys), status)
                .await?;
        }
    }

    /// Sign a transaction hash with the key at the provided path
    pub(crate) async fn sign(&mut self, card: &mut C::Session) -> Step<FlowStatus> {
        self.require_keys().await?;
        self.open_and_authenticate(card, false).await?;

        loop {
            let path = match self.params.bip44_path.clone() {
                Some(PathParam::Single(p)) if DerivationPath::parse(&p).is_ok() => p,
                v => {
                    if v.is_some() {
                        debug!("Invalid signing path");
                        self.params.bip44_path = None;
                    }
                    self.pause(Action::EnterPath, Some(StatusError::Signing))
                        .await?;
                    continue;
                }
            };

            let hash = match self.params.tx_hash.as_deref().map(parse_hash) {
                Some(Some(h)) => h,
                v => {
                    if v.is_some() {
                        debug!("Invalid transaction hash");
                        self.params.tx_hash = None;
                    }
                    self.pause(Action::EnterTxHash, Some(StatusError::Signing))
                        .await?;
                    continue;
                }
            };

            let signature = card
                .sign(&hash, &path)
                .await
                .or_fail(StatusError::Signing)?;

            return Ok(FlowStatus {
                tx_signature: Some(signature),
                ..FlowStatus::ok()
            });
        }
    }

    pub(crate) async fn change_pin(&mut self, card: &mut C::Session) -> Step<FlowStatus> {
        self.open_and_authenticate(card, false).await?;

        loop {
            match self.params.new_pin.clone().map(Zeroizing::new) {
                Some(pin) if valid_pin(&pin) => {
                    card.change_pin(&pin)
                        .await
                        .or_fail(StatusError::ChangingCredentials)?;

                    info!("PIN changed");
                    forget(&mut self.params.new_pin);

                    return Ok(FlowStatus::ok());
                }
                Some(_) => forget(&mut self.params.new_pin),
                None => (),
            }

            self.pause(Action::EnterNewPin, Some(StatusError::ChangingCredentials))
                .await?;
        }
    }

    pub(crate) async fn change_puk(&mut self, card: &mut C::Session) -> Step<FlowStatus> {
        self.open_and_authenticate(card, false).await?;

        loop {
            match self.params.new_puk.clone().map(Zeroizing::new) {
                Some(puk) if valid_puk(&puk) => {
                    card.change_puk(&puk)
                        .await
                        .or_fail(StatusError::ChangingCredentials)?;

                    info!("PUK changed");
                    forget(&mut self.params.new_puk);

                    return Ok(FlowStatus::ok());
                }
                Some(_) => forget(&mut self.params.new_puk),
                None => (),
            }

            self.pause(Action::EnterNewPuk, Some(StatusError::ChangingCredentials))
                .await?;
        }
    }

    pub(crate) async fn change_pairing(&mut self, card: &mut C::Session) -> Step<FlowStatus> {
        self.open_and_authenticate(card, false).await?;

        loop {
            match self.params.new_pairing_pass.clone().map(Zeroizing::new) {
                Some(pass) if !pass.is_empty() => {
                    card.change_pairing(&pass)
                        .await
                        .or_fail(StatusError::ChangingCredentials)?;

                    info!("Pairing password changed");
                    forget(&mut self.params.new_pairing_pass);

                    return Ok(FlowStatus::ok());
                }
                Some(_) => forget(&mut self.params.new_pairing_pass),
                None => (),
            }

            self.pause(
                Action::EnterNewPairing,
                Some(StatusError::ChangingCredentials),
            )
            .await?;
        }
    }

    /// Remove the pairing of the current session from the card and store
    pub(crate) async fn unpair_this(&mut self, card: &mut C::Session) -> Step<FlowStatus> {
        self.open_and_authenticate(card, false).await?;
        self.unpair_current(card).await?;

        Ok(FlowStatus::ok())
    }

    /// Remove every pairing other than the current one
    pub(crate) async fn unpair_others(&mut self, card: &mut C::Session) -> Step<FlowStatus> {
        self.open_and_authenticate(card, false).await?;

        let current = self.current_slot()?;

        for i in (0..MAX_FREE_SLOTS).filter(|i| *i != current) {
            card.unpair(i).await.or_fail(StatusError::Unpairing)?;
        }

        info!("Removed all other pairings");
        self.card.free_slots = Some(MAX_FREE_SLOTS - 1);

        Ok(FlowStatus::ok())
    }

    /// Remove the key from the card, then unpair
    pub(crate) async fn delete_account_and_unpair(
        &mut self,
        card: &mut C::Session,
    ) -> Step<FlowStatus> {
        self.open_and_authenticate(card, false).await?;

        card.remove_key().await.or_fail(StatusError::RemovingKey)?;

        info!("Removed key");
        self.card.key_uid = Some(String::new());

        self.unpair_current(card).await?;

        Ok(FlowStatus::ok())
    }

    /// Store the card name and wallet paths on the card
    pub(crate) async fn store_metadata(&mut self, card: &mut C::Session) -> Step<FlowStatus> {
        self.open_and_authenticate(card, false).await?;

        let root = wallet_root(StatusError::StoringMetadata)?;

        let name = loop {
            match self.params.card_name.clone() {
                Some(n) if n.len() <= MAX_CARD_NAME_LEN => break n,
                Some(_) => {
                    debug!("Card name too long");
                    self.params.card_name = None;
                }
                None => (),
            }

            self.pause(Action::EnterCardName, Some(StatusError::StoringMetadata))
                .await?;
        };

        let wallets = loop {
            if let Some(paths) = &self.params.wallet_paths {
                let indexes: Option<Vec<u32>> = paths
                    .iter()
                    .map(|p| {
                        DerivationPath::parse(p)
                            .ok()
                            .and_then(|p| p.child_index_of(&root))
                    })
                    .collect();

                match indexes {
                    Some(i) => break i,
                    None => {
                        debug!("Wallet paths outside of wallet root");
                        self.params.wallet_paths = None;
                    }
                }
            }

            self.pause(Action::EnterWallets, Some(StatusError::StoringMetadata))
                .await?;
        };

        let metadata = Metadata { name, wallets };

        card.store_metadata(&metadata)
            .await
            .or_fail(StatusError::StoringMetadata)?;

        info!(
            "Stored metadata ({} with {} wallets)",
            metadata.name,
            metadata.wallets.len()
        );

        Ok(FlowStatus::ok())
    }

    /// Read card metadata, resolving wallet addresses when requested
    pub(crate) async fn get_metadata(&mut self, card: &mut C::Session) -> Step<FlowStatus> {
        if !self.card.has_keys() {
            return Ok(FlowStatus::with_error(StatusError::NoKeys));
        }

        let metadata = match card.get_metadata().await.or_fail(StatusError::NoData)? {
            Some(m) => m,
            None => return Ok(FlowStatus::with_error(StatusError::NoData)),
        };

        let root = wallet_root(StatusError::NoData)?;
        let mut wallets = Vec::with_capacity(metadata.wallets.len());
        for i in &metadata.wallets {
            let path = root
                .child(*i)
                .map_err(|_| Interrupt::Failed(StatusError::NoData))?;

            wallets.push(Wallet {
                path: path.to_string(),
                ..Default::default()
            });
        }

        let mut status = FlowStatus::ok();

        if self.params.resolve_addresses == Some(true) {
            self.open_and_authenticate(card, false).await?;

            for w in wallets.iter_mut() {
                let k = self.export_key(card, &w.path, true).await?;
                w.address = k.address.clone();
                w.public_key = k.public_key.clone();
            }

            if self.params.export_master_address == Some(true) {
                let master = self.export_key(card, MASTER_PATH, true).await?;
                status.master_key_address = Some(master.address.clone());
            }
        }

        status.card_metadata = Some(CardMetadata {
            name: metadata.name,
            wallets,
        });

        Ok(status)
    }

    /// Pause for a card with keys when the current card has none
    async fn require_keys(&mut self) -> Step<()> {
        if self.card.has_keys() {
            return Ok(());
        }

        self.pause_and_restart(Action::SwapCard, StatusError::NoKeys)
            .await
    }

    async fn export_key(
        &mut self,
        card: &mut C::Session,
        path: &str,
        public_only: bool,
    ) -> Step<KeyPair> {
        debug!("Exporting key: {path}");

        card.export_key(path, public_only)
            .await
            .or_fail(StatusError::Exporting)
    }

    /// Slot of the current secure channel
    fn current_slot(&self) -> Step<u8> {
        self.pairing_index
            .ok_or(Interrupt::Failed(StatusError::Unpairing))
    }

    async fn unpair_current(&mut self, card: &mut C::Session) -> Step<()> {
        let slot = self.current_slot()?;

        card.unpair(slot).await.or_fail(StatusError::Unpairing)?;

        let uid = self.card.instance_uid.clone().unwrap_or_default();
        if let Err(e) = self.pairings.delete(&uid) {
            log::error!("Failed to remove pairing: {e}");
        }

        info!("Unpaired slot {slot}");
        self.card.free_slots = self.card.free_slots.map(|n| (n + 1).min(MAX_FREE_SLOTS));

        Ok(())
    }
}

/// Parse a 32 byte hex encoded hash, with or without `0x` prefix
fn parse_hash(s: &str) -> Option<[u8; 32]> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);

    let mut h = [0u8; 32];
    hex::decode_to_slice(s, &mut h).ok()?;

    Some(h)
}

fn wallet_root(err: StatusError) -> Step<DerivationPath> {
    DerivationPath::parse(WALLET_ROOT_PATH).map_err(|_| Interrupt::Failed(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_parsing() {
        let h = "ab".repeat(32);

        assert_eq!(parse_hash(&h), Some([0xab; 32]));
        assert_eq!(parse_hash(&format!("0x{h}")), Some([0xab; 32]));

        assert_eq!(parse_hash("abcd"), None);
        assert_eq!(parse_hash(&"zz".repeat(32)), None);
        assert_eq!(parse_hash(&"ab".repeat(33)), None);
    }
}
