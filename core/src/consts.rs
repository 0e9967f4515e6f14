// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Keycard protocol constants

/// Pairing password used when none is provided
pub const DEFAULT_PAIRING_PASS: &str = "KeycardDefaultPairing";

/// PIN length (digits)
pub const PIN_LEN: usize = 6;

/// PUK length (digits)
pub const PUK_LEN: usize = 12;

/// PIN attempts available after a successful verification
pub const MAX_PIN_RETRIES: u8 = 3;

/// PUK attempts available after a successful unblock
pub const MAX_PUK_RETRIES: u8 = 5;

/// Number of pairing slots on a card
pub const MAX_FREE_SLOTS: u8 = 5;

/// Mnemonic length used when none (or an unsupported length) is requested
pub const DEFAULT_MNEMONIC_LEN: u8 = 12;

/// Supported mnemonic lengths (words)
pub const MNEMONIC_LENGTHS: [u8; 5] = [12, 15, 18, 21, 24];

/// Maximum card name length (bytes)
pub const MAX_CARD_NAME_LEN: usize = 20;

/// Master key path
pub const MASTER_PATH: &str = "m";

/// Root of wallet derivation paths
pub const WALLET_ROOT_PATH: &str = "m/44'/60'/0'/0";

/// Default wallet path
pub const WALLET_PATH: &str = "m/44'/60'/0'/0/0";

/// EIP-1581 root path
pub const EIP1581_PATH: &str = "m/43'/60'/1581'";

/// Whisper key path
pub const WHISPER_PATH: &str = "m/43'/60'/1581'/0'/0";

/// Encryption key path
pub const ENCRYPTION_PATH: &str = "m/43'/60'/1581'/1'/0";

/// Check a PIN is correctly formatted
pub fn valid_pin(pin: &str) -> bool {
    pin.len() == PIN_LEN && pin.bytes().all(|b| b.is_ascii_digit())
}

/// Check a PUK is correctly formatted
pub fn valid_puk(puk: &str) -> bool {
    puk.len() == PUK_LEN && puk.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::DerivationPath;

    #[test]
    fn pin_format() {
        assert!(valid_pin("123456"));
        assert!(!valid_pin("12345"));
        assert!(!valid_pin("1234567"));
        assert!(!valid_pin("12345a"));
    }

    #[test]
    fn puk_format() {
        assert!(valid_puk("123456123456"));
        assert!(!valid_puk("123456"));
        assert!(!valid_puk("12345612345x"));
    }

    #[test]
    fn fixed_paths_parse() {
        for p in [
            MASTER_PATH,
            WALLET_ROOT_PATH,
            WALLET_PATH,
            EIP1581_PATH,
            WHISPER_PATH,
            ENCRYPTION_PATH,
        ] {
            DerivationPath::parse(p).unwrap();
        }
    }

    #[test]
    fn default_wallet_under_root() {
        let root = DerivationPath::parse(WALLET_ROOT_PATH).unwrap();
        let wallet = DerivationPath::parse(WALLET_PATH).unwrap();

        assert_eq!(wallet.child_index_of(&root), Some(0));
    }
}
