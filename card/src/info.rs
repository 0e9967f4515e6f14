// Copyright (c) 2022-2023 The MobileCoin Foundation

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Application information returned on applet selection
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApplicationInfo {
    /// Keycard applet is installed
    pub installed: bool,
    /// Card has been initialised with credentials
    pub initialized: bool,
    /// Card instance identifier
    pub instance_uid: Vec<u8>,
    /// Identifier of the loaded key, empty if no key is loaded
    pub key_uid: Vec<u8>,
    /// Free pairing slots
    pub free_slots: u8,
    /// Applet version (`major << 8 | minor`)
    pub version: u16,
}

/// Application status, available once a secure channel is open
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApplicationStatus {
    pub pin_retries: u8,
    pub puk_retries: u8,
    pub key_initialized: bool,
}

/// Pairing key and slot index, persisted per card instance
#[derive(Clone, PartialEq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct PairingInfo {
    #[serde(with = "hex::serde")]
    pub key: Vec<u8>,
    pub index: u8,
}

impl core::fmt::Debug for PairingInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PairingInfo")
            .field("key", &"[REDACTED]")
            .field("index", &self.index)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairing_info_json() {
        let p = PairingInfo {
            key: vec![0xab, 0xcd, 0x01],
            index: 2,
        };

        let s = serde_json::to_string(&p).unwrap();
        assert_eq!(s, r#"{"key":"abcd01","index":2}"#);

        let d: PairingInfo = serde_json::from_str(&s).unwrap();
        assert_eq!(d, p);
    }

    #[test]
    fn pairing_info_debug_redacted() {
        let p = PairingInfo {
            key: vec![0xab; 32],
            index: 1,
        };

        let s = format!("{p:?}");
        assert!(s.contains("REDACTED"));
        assert!(!s.contains("abab"));
    }
}
