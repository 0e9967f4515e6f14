// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Simulated card session, applying keycard applet rules to a [SimCard]

use async_trait::async_trait;
use log::{debug, trace};
use rand::random;
use sha2::{Digest, Sha256};

use keycard_card::{
    ApplicationInfo, ApplicationStatus, CardError, CardSession, KeyPair, Metadata, PairingInfo,
    TxSignature,
};

use crate::{card::CardState, SimCard, SimReader, PAIRING_SLOTS, SIM_VERSION};

/// Session with a [SimCard], invalidated when the card is removed
/// from the reader
#[derive(Debug)]
pub struct SimSession {
    reader: SimReader,
    card: SimCard,

    /// Pairing slot of the open secure channel
    channel: Option<u8>,
    authenticated: bool,
}

/// Session requirements for card operations
#[derive(Clone, Copy, Debug, PartialEq)]
enum Access {
    Any,
    SecureChannel,
    Pin,
}

impl SimSession {
    pub(crate) fn new(reader: SimReader, card: SimCard) -> Self {
        Self {
            reader,
            card,
            channel: None,
            authenticated: false,
        }
    }

    /// Run an operation against the card state, checking the card is present
    /// and the session satisfies `access`
    fn with_card<R>(
        &mut self,
        access: Access,
        f: impl FnOnce(&mut CardState, &mut Self) -> Result<R, CardError>,
    ) -> Result<R, CardError> {
        if !self.reader.holds(&self.card) {
            self.channel = None;
            self.authenticated = false;
            return Err(CardError::Transport("card removed".to_string()));
        }

        let card = self.card.clone();
        let mut state = card.lock();

        if state.transport_faults > 0 {
            state.transport_faults -= 1;
            debug!("Injected transport fault");
            return Err(CardError::Transport("injected fault".to_string()));
        }

        match access {
            Access::Any => (),
            Access::SecureChannel | Access::Pin if !state.initialized => {
                return Err(CardError::NotInitialized)
            }
            Access::SecureChannel | Access::Pin if self.channel.is_none() => {
                return Err(CardError::SecureChannel)
            }
            Access::Pin if !self.authenticated => return Err(CardError::NotAuthenticated),
            _ => (),
        }

        f(&mut *state, self)
    }
}

#[async_trait]
impl CardSession for SimSession {
    async fn select(&mut self) -> Result<ApplicationInfo, CardError> {
        self.with_card(Access::Any, |s, session| {
            session.channel = None;
            session.authenticated = false;

            if !s.installed {
                return Ok(ApplicationInfo::default());
            }

            Ok(ApplicationInfo {
                installed: true,
                initialized: s.initialized,
                instance_uid: s.instance_uid.clone(),
                key_uid: s.key_uid.clone(),
                free_slots: s.free_slots(),
                version: SIM_VERSION,
            })
        })
    }

    async fn init(&mut self, pin: &str, puk: &str, pairing_pass: &str) -> Result<(), CardError> {
        self.with_card(Access::Any, |s, _| {
            if s.initialized {
                return Err(CardError::Status(0x6d00));
            }

            s.pin = pin.to_string();
            s.puk = puk.to_string();
            s.pairing_pass = pairing_pass.to_string();
            s.pin_retries = 3;
            s.puk_retries = 5;
            s.instance_uid = random::<[u8; 16]>().to_vec();
            s.initialized = true;

            debug!("Initialised card {}", hex::encode(&s.instance_uid));

            Ok(())
        })
    }

    async fn pair(&mut self, pairing_pass: &str) -> Result<PairingInfo, CardError> {
        self.with_card(Access::Any, |s, _| {
            if !s.initialized {
                return Err(CardError::NotInitialized);
            }
            if s.pairing_pass != pairing_pass {
                return Err(CardError::WrongPairing);
            }

            let index = s
                .pairings
                .iter()
                .position(|p| p.is_none())
                .ok_or(CardError::Status(0x6a84))?;

            let key = pairing_key(pairing_pass, &s.instance_uid, index as u8);
            s.pairings[index] = Some(key.clone());

            debug!("Paired slot {index}");

            Ok(PairingInfo {
                key,
                index: index as u8,
            })
        })
    }

    async fn open_secure_channel(&mut self, pairing: &PairingInfo) -> Result<(), CardError> {
        self.with_card(Access::Any, |s, session| {
            if !s.initialized {
                return Err(CardError::NotInitialized);
            }

            match s.pairings.get(pairing.index as usize) {
                Some(Some(key)) if key == &pairing.key => {
                    session.channel = Some(pairing.index);
                    session.authenticated = false;
                    Ok(())
                }
                _ => Err(CardError::SecureChannel),
            }
        })
    }

    async fn application_status(&mut self) -> Result<ApplicationStatus, CardError> {
        self.with_card(Access::SecureChannel, |s, _| {
            Ok(ApplicationStatus {
                pin_retries: s.pin_retries,
                puk_retries: s.puk_retries,
                key_initialized: s.seed.is_some(),
            })
        })
    }

    async fn verify_pin(&mut self, pin: &str) -> Result<(), CardError> {
        self.with_card(Access::SecureChannel, |s, session| {
            if s.pin_retries == 0 {
                return Err(CardError::WrongPin { remaining: 0 });
            }

            if s.pin != pin {
                s.pin_retries -= 1;
                return Err(CardError::WrongPin {
                    remaining: s.pin_retries,
                });
            }

            s.pin_retries = 3;
            session.authenticated = true;

            Ok(())
        })
    }

    async fn unblock_pin(&mut self, puk: &str, new_pin: &str) -> Result<(), CardError> {
        self.with_card(Access::SecureChannel, |s, session| {
            if s.puk_retries == 0 {
                return Err(CardError::WrongPuk { remaining: 0 });
            }

            if s.puk != puk {
                s.puk_retries -= 1;
                return Err(CardError::WrongPuk {
                    remaining: s.puk_retries,
                });
            }

            s.pin = new_pin.to_string();
            s.pin_retries = 3;
            s.puk_retries = 5;
            session.authenticated = true;

            Ok(())
        })
    }

    async fn change_pin(&mut self, new_pin: &str) -> Result<(), CardError> {
        self.with_card(Access::Pin, |s, _| {
            s.pin = new_pin.to_string();
            Ok(())
        })
    }

    async fn change_puk(&mut self, new_puk: &str) -> Result<(), CardError> {
        self.with_card(Access::Pin, |s, _| {
            s.puk = new_puk.to_string();
            Ok(())
        })
    }

    async fn change_pairing(&mut self, new_pairing_pass: &str) -> Result<(), CardError> {
        self.with_card(Access::Pin, |s, _| {
            s.pairing_pass = new_pairing_pass.to_string();
            Ok(())
        })
    }

    async fn generate_mnemonic(&mut self, checksum_size: u8) -> Result<Vec<u16>, CardError> {
        self.with_card(Access::SecureChannel, |_, _| {
            if !(4..=8).contains(&checksum_size) {
                return Err(CardError::InvalidArgument(format!(
                    "checksum size {checksum_size}"
                )));
            }

            Ok(SimCard::mnemonic_indexes(checksum_size as usize * 3))
        })
    }

    async fn load_mnemonic(
        &mut self,
        mnemonic: &str,
        password: &str,
    ) -> Result<Vec<u8>, CardError> {
        self.with_card(Access::Pin, |s, _| s.load_mnemonic(mnemonic, password))
    }

    async fn export_key(&mut self, path: &str, public_only: bool) -> Result<KeyPair, CardError> {
        self.with_card(Access::Pin, |s, _| {
            trace!("Export {path} (public only: {public_only})");
            s.export_key(path, public_only)
        })
    }

    async fn sign(&mut self, hash: &[u8; 32], path: &str) -> Result<TxSignature, CardError> {
        self.with_card(Access::Pin, |s, _| {
            let key = s.signing_key(path)?;

            let (sig, recid) = key
                .sign_prehash_recoverable(hash)
                .map_err(|_| CardError::Status(0x6f00))?;

            let (r_bytes, s_bytes) = sig.split_bytes();
            let mut out = TxSignature {
                r: [0u8; 32],
                s: [0u8; 32],
                v: recid.to_byte(),
            };
            out.r.copy_from_slice(&r_bytes);
            out.s.copy_from_slice(&s_bytes);

            Ok(out)
        })
    }

    async fn unpair(&mut self, index: u8) -> Result<(), CardError> {
        self.with_card(Access::Pin, |s, _| {
            if index as usize >= PAIRING_SLOTS {
                return Err(CardError::InvalidArgument(format!("pairing slot {index}")));
            }

            s.pairings[index as usize] = None;

            Ok(())
        })
    }

    async fn remove_key(&mut self) -> Result<(), CardError> {
        self.with_card(Access::Pin, |s, _| {
            s.seed = None;
            s.key_uid.clear();
            Ok(())
        })
    }

    async fn factory_reset(&mut self) -> Result<(), CardError> {
        self.with_card(Access::Any, |s, session| {
            *s = CardState::blank();
            session.channel = None;
            session.authenticated = false;
            Ok(())
        })
    }

    async fn store_metadata(&mut self, metadata: &Metadata) -> Result<(), CardError> {
        self.with_card(Access::Pin, |s, _| {
            s.metadata = Some(metadata.clone());
            Ok(())
        })
    }

    async fn get_metadata(&mut self) -> Result<Option<Metadata>, CardError> {
        self.with_card(Access::Any, |s, _| Ok(s.metadata.clone()))
    }
}

/// Derive the pairing key for a password, exposed for fixtures
pub fn pairing_key(pass: &str, instance_uid: &[u8], index: u8) -> Vec<u8> {
    let mut h = Sha256::new();
    h.update(pass.as_bytes());
    h.update(instance_uid);
    h.update([index]);
    h.finalize().to_vec()
}
