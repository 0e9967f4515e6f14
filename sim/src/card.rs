// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Simulated card state

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use k256::ecdsa::SigningKey;
use rand::{random, thread_rng, Rng};
use sha2::{Digest, Sha256};

use keycard_card::{CardError, KeyPair, Metadata};

/// Number of pairing slots
pub const PAIRING_SLOTS: usize = 5;

/// Simulated applet version (3.1)
pub const SIM_VERSION: u16 = 0x0301;

/// Simulated card state
#[derive(Clone, Debug)]
pub(crate) struct CardState {
    pub installed: bool,
    pub initialized: bool,
    pub instance_uid: Vec<u8>,

    pub pin: String,
    pub puk: String,
    pub pairing_pass: String,
    pub pin_retries: u8,
    pub puk_retries: u8,
    pub pairings: [Option<Vec<u8>>; PAIRING_SLOTS],

    pub seed: Option<[u8; 32]>,
    pub key_uid: Vec<u8>,
    pub metadata: Option<Metadata>,

    /// Number of upcoming operations to fail with a transport error
    pub transport_faults: usize,
}

impl CardState {
    pub(crate) fn blank() -> Self {
        Self {
            installed: true,
            initialized: false,
            instance_uid: vec![],
            pin: String::new(),
            puk: String::new(),
            pairing_pass: String::new(),
            pin_retries: 3,
            puk_retries: 5,
            pairings: Default::default(),
            seed: None,
            key_uid: vec![],
            metadata: None,
            transport_faults: 0,
        }
    }

    pub fn free_slots(&self) -> u8 {
        match self.initialized {
            true => self.pairings.iter().filter(|p| p.is_none()).count() as u8,
            false => 0,
        }
    }

    /// Load a mnemonic, returning the new key UID
    pub fn load_mnemonic(&mut self, mnemonic: &str, password: &str) -> Result<Vec<u8>, CardError> {
        let words: Vec<_> = mnemonic.split_whitespace().collect();
        if words.len() < 12 || words.len() > 24 || words.len() % 3 != 0 {
            return Err(CardError::InvalidArgument(format!(
                "unsupported mnemonic length {}",
                words.len()
            )));
        }

        let mut h = Sha256::new();
        h.update(b"keycard-sim seed");
        h.update(words.join(" ").as_bytes());
        h.update(password.as_bytes());

        self.seed = Some(h.finalize().into());

        let master = self.export_key("m", true)?;
        self.key_uid = Sha256::digest(&master.public_key).to_vec();

        Ok(self.key_uid.clone())
    }

    /// Derive the signing key for a path
    pub fn signing_key(&self, path: &str) -> Result<SigningKey, CardError> {
        let seed = self.seed.ok_or(CardError::KeyMissing)?;

        if !path.starts_with('m') {
            return Err(CardError::InvalidArgument(format!("invalid path {path}")));
        }

        let mut h = Sha256::new();
        h.update(seed);
        h.update(path.as_bytes());

        SigningKey::from_slice(&h.finalize()).map_err(|_| CardError::Status(0x6f00))
    }

    /// Export the key pair for a path
    pub fn export_key(&self, path: &str, public_only: bool) -> Result<KeyPair, CardError> {
        let sk = self.signing_key(path)?;

        let public_key = sk.verifying_key().to_encoded_point(false).as_bytes().to_vec();

        Ok(KeyPair {
            address: address(&public_key),
            private_key: match public_only {
                true => vec![],
                false => sk.to_bytes().to_vec(),
            },
            public_key,
        })
    }
}

/// Fixture account address derived from an uncompressed public key
pub fn address(public_key: &[u8]) -> String {
    let h = Sha256::digest(public_key.get(1..).unwrap_or_default());
    format!("0x{}", hex::encode(&h[12..]))
}

/// Simulated keycard, shared between the test and the reader
///
/// Cloned handles refer to the same card.
#[derive(Clone, Debug)]
pub struct SimCard {
    state: Arc<Mutex<CardState>>,
}

impl SimCard {
    fn from_state(state: CardState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Blank card, ready for initialisation
    pub fn blank() -> Self {
        Self::from_state(CardState::blank())
    }

    /// Card without the keycard applet
    pub fn not_a_keycard() -> Self {
        Self::from_state(CardState {
            installed: false,
            ..CardState::blank()
        })
    }

    /// Initialised card without keys
    pub fn initialized(pin: &str, puk: &str, pairing_pass: &str) -> Self {
        Self::from_state(CardState {
            initialized: true,
            instance_uid: random::<[u8; 16]>().to_vec(),
            pin: pin.to_string(),
            puk: puk.to_string(),
            pairing_pass: pairing_pass.to_string(),
            ..CardState::blank()
        })
    }

    /// Load a mnemonic onto the card
    pub fn with_mnemonic(self, mnemonic: &str) -> Self {
        if let Err(e) = self.lock().load_mnemonic(mnemonic, "") {
            panic!("invalid fixture mnemonic: {e}");
        }
        self
    }

    pub fn with_pin_retries(self, n: u8) -> Self {
        self.lock().pin_retries = n;
        self
    }

    pub fn with_puk_retries(self, n: u8) -> Self {
        self.lock().puk_retries = n;
        self
    }

    /// Occupy `n` pairing slots with unknown pairings
    pub fn with_used_slots(self, n: usize) -> Self {
        {
            let mut s = self.lock();
            for p in s.pairings.iter_mut().take(n) {
                *p = Some(random::<[u8; 32]>().to_vec());
            }
        }
        self
    }

    pub fn with_metadata(self, metadata: Metadata) -> Self {
        self.lock().metadata = Some(metadata);
        self
    }

    /// Fail the next `n` card operations with transport errors
    pub fn fail_next(&self, n: usize) {
        self.lock().transport_faults = n;
    }

    pub fn instance_uid(&self) -> String {
        hex::encode(&self.lock().instance_uid)
    }

    pub fn key_uid(&self) -> String {
        hex::encode(&self.lock().key_uid)
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    pub fn has_key(&self) -> bool {
        self.lock().seed.is_some()
    }

    pub fn pin(&self) -> String {
        self.lock().pin.clone()
    }

    pub fn puk(&self) -> String {
        self.lock().puk.clone()
    }

    pub fn pairing_pass(&self) -> String {
        self.lock().pairing_pass.clone()
    }

    pub fn pin_retries(&self) -> u8 {
        self.lock().pin_retries
    }

    pub fn puk_retries(&self) -> u8 {
        self.lock().puk_retries
    }

    pub fn free_slots(&self) -> u8 {
        self.lock().free_slots()
    }

    pub fn metadata(&self) -> Option<Metadata> {
        self.lock().metadata.clone()
    }

    /// Public key pair for a path, for checking exported keys
    pub fn public_key(&self, path: &str) -> Option<KeyPair> {
        self.lock().export_key(path, true).ok()
    }

    /// Generate random mnemonic indexes
    pub(crate) fn mnemonic_indexes(words: usize) -> Vec<u16> {
        let mut rng = thread_rng();
        (0..words).map(|_| rng.gen_range(0..2048)).collect()
    }

    pub(crate) fn same(&self, other: &SimCard) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, CardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
