// Copyright (c) 2022-2023 The MobileCoin Foundation

//! In-memory keycard simulator
//!
//! Provides a [SimReader] implementing [keycard_card::Connector] and
//! [SimCard]s which may be inserted into and removed from the reader
//! while a flow is running, for exercising keycard flows without hardware.
//!
//! ```
//! use keycard_sim::{SimCard, SimReader};
//!
//! let card = SimCard::initialized("123456", "123456123456", "KeycardDefaultPairing");
//! let reader = SimReader::with_card(card.clone());
//!
//! reader.remove();
//! assert!(reader.card().is_none());
//! ```
//!
//! Keys are derived deterministically from the loaded mnemonic, these are
//! real secp256k1 keys but do _not_ match BIP-32 derivation, and addresses
//! are fixture values.

mod card;
pub use card::{address, SimCard, PAIRING_SLOTS, SIM_VERSION};

mod reader;
pub use reader::SimReader;

mod session;
pub use session::{pairing_key, SimSession};
