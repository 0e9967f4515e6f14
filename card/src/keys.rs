// Copyright (c) 2022-2023 The MobileCoin Foundation

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Exported key pair
///
/// `private_key` is empty when only the public half was exported.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    /// `0x` prefixed account address
    pub address: String,

    /// Uncompressed secp256k1 public key
    #[serde(with = "hex::serde")]
    pub public_key: Vec<u8>,

    #[serde(
        with = "hex::serde",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub private_key: Vec<u8>,
}

impl KeyPair {
    /// Strip the private half of the key pair
    pub fn public(&self) -> KeyPair {
        KeyPair {
            address: self.address.clone(),
            public_key: self.public_key.clone(),
            private_key: vec![],
        }
    }
}

impl core::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address)
            .field("public_key", &hex::encode(&self.public_key))
            .field("private", &!self.private_key.is_empty())
            .finish()
    }
}

/// Recoverable ECDSA signature
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TxSignature {
    #[serde(with = "hex::serde")]
    pub r: [u8; 32],
    #[serde(with = "hex::serde")]
    pub s: [u8; 32],
    pub v: u8,
}
