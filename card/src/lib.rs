// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Keycard session contract
//!
//! This crate defines the primitives a connected keycard exposes to the
//! flow engine ([CardSession]), the reader abstraction used to wait for and
//! connect to a card ([Connector]), and the data objects returned by the card.
//!
//! Implementations live outside of the engine, see `keycard-sim` for an
//! in-memory card used in tests.
//!
//! ## Errors
//!
//! Every primitive returns a [CardError]. Errors reported by
//! [CardError::is_transport] indicate the connection to the card was lost
//! (card removed, reader unplugged) and the caller is expected to reconnect,
//! all other errors are reported by the card itself.

use async_trait::async_trait;

mod error;
pub use error::CardError;

mod info;
pub use info::{ApplicationInfo, ApplicationStatus, PairingInfo};

mod keys;
pub use keys::{KeyPair, TxSignature};

mod metadata;
pub use metadata::Metadata;

/// [Connector] waits for and connects to cards via the available readers
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Session: CardSession;

    /// Wait for a card to be present and connect to it
    ///
    /// This resolves only once a card is inserted, or fails when no
    /// reader / smart card service is available.
    async fn connect(&self) -> Result<Self::Session, CardError>;
}

/// Primitive operations available on a connected card
///
/// Operations requiring a secure channel or PIN verification fail with
/// [CardError::SecureChannel] or [CardError::NotAuthenticated] when called
/// out of order. The session is released on drop.
#[async_trait]
pub trait CardSession: Send {
    /// Select the keycard applet, returning application information
    async fn select(&mut self) -> Result<ApplicationInfo, CardError>;

    /// Initialise a blank card with the provided credentials
    async fn init(&mut self, pin: &str, puk: &str, pairing_pass: &str) -> Result<(), CardError>;

    /// Pair with the card using the provided pairing password
    async fn pair(&mut self, pairing_pass: &str) -> Result<PairingInfo, CardError>;

    /// Open a secure channel using an existing pairing
    async fn open_secure_channel(&mut self, pairing: &PairingInfo) -> Result<(), CardError>;

    /// Fetch application status (retry counters)
    async fn application_status(&mut self) -> Result<ApplicationStatus, CardError>;

    /// Verify the user PIN
    async fn verify_pin(&mut self, pin: &str) -> Result<(), CardError>;

    /// Unblock a blocked PIN using the PUK, setting a new PIN
    async fn unblock_pin(&mut self, puk: &str, new_pin: &str) -> Result<(), CardError>;

    /// Change the user PIN
    async fn change_pin(&mut self, new_pin: &str) -> Result<(), CardError>;

    /// Change the PUK
    async fn change_puk(&mut self, new_puk: &str) -> Result<(), CardError>;

    /// Change the pairing password
    async fn change_pairing(&mut self, new_pairing_pass: &str) -> Result<(), CardError>;

    /// Generate a mnemonic on-card, returning BIP-39 word indexes
    async fn generate_mnemonic(&mut self, checksum_size: u8) -> Result<Vec<u16>, CardError>;

    /// Load a mnemonic onto the card, returning the resulting key UID
    async fn load_mnemonic(&mut self, mnemonic: &str, password: &str)
        -> Result<Vec<u8>, CardError>;

    /// Export the key at the provided derivation path
    async fn export_key(&mut self, path: &str, public_only: bool) -> Result<KeyPair, CardError>;

    /// Sign a 32 byte hash with the key at the provided derivation path
    async fn sign(&mut self, hash: &[u8; 32], path: &str) -> Result<TxSignature, CardError>;

    /// Remove the pairing in the provided slot
    async fn unpair(&mut self, index: u8) -> Result<(), CardError>;

    /// Remove the key stored on the card
    async fn remove_key(&mut self) -> Result<(), CardError>;

    /// Reset the card to factory state, discarding keys, pairings and credentials
    async fn factory_reset(&mut self) -> Result<(), CardError>;

    /// Store card metadata
    async fn store_metadata(&mut self, metadata: &Metadata) -> Result<(), CardError>;

    /// Fetch card metadata, `None` if no metadata is stored
    async fn get_metadata(&mut self) -> Result<Option<Metadata>, CardError>;
}
