// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Flow parameters, supplied on start and extended on resume

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Derivation path parameter, either a single path or a list of paths
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathParam {
    Single(String),
    Many(Vec<String>),
}

impl From<&str> for PathParam {
    fn from(p: &str) -> Self {
        PathParam::Single(p.to_string())
    }
}

/// Flow parameters
///
/// Keys match the host-facing parameter vocabulary (`pin`, `new-puk`,
/// `bip44-path`, ...). Fields supplied on resume overwrite the existing
/// values, the engine removes values once consumed or rejected.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FlowParams {
    /// Required card instance
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_uid: Option<String>,
    /// Required key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_uid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairing_pass: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_pairing_pass: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_pin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub puk: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_puk: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mnemonic_length: Option<u8>,
    /// Replace an existing key when loading an account
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overwrite: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bip44_path: Option<PathParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_master_address: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve_addresses: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_paths: Option<Vec<String>>,

    /// Reset the card before running the flow
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factory_reset: Option<bool>,
}

/// Remove (and wipe) a secret parameter
pub(crate) fn forget(v: &mut Option<String>) {
    if let Some(mut s) = v.take() {
        s.zeroize();
    }
}

macro_rules! merge_fields {
    ($dst:expr, $src:expr; secret: $($s:ident),*; plain: $($p:ident),*) => {
        $(
            if $src.$s.is_some() {
                forget(&mut $dst.$s);
                $dst.$s = $src.$s.take();
            }
        )*
        $(
            if $src.$p.is_some() {
                $dst.$p = $src.$p.take();
            }
        )*
    };
}

impl FlowParams {
    /// Merge parameters supplied on resume, values present in `other`
    /// replace existing values
    pub fn merge(&mut self, mut other: FlowParams) {
        merge_fields!(self, other;
            secret: pairing_pass, new_pairing_pass, pin, new_pin, puk, new_puk, mnemonic;
            plain: instance_uid, key_uid, mnemonic_length, overwrite, bip44_path, tx_hash,
                export_master_address, resolve_addresses, card_name, wallet_paths, factory_reset
        );
    }

    /// Parse parameters from their JSON representation
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

fn redact(v: &Option<String>) -> Option<&'static str> {
    v.as_ref().map(|_| "[REDACTED]")
}

impl core::fmt::Debug for FlowParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FlowParams")
            .field("instance_uid", &self.instance_uid)
            .field("key_uid", &self.key_uid)
            .field("pairing_pass", &redact(&self.pairing_pass))
            .field("new_pairing_pass", &redact(&self.new_pairing_pass))
            .field("pin", &redact(&self.pin))
            .field("new_pin", &redact(&self.new_pin))
            .field("puk", &redact(&self.puk))
            .field("new_puk", &redact(&self.new_puk))
            .field("mnemonic", &redact(&self.mnemonic))
            .field("mnemonic_length", &self.mnemonic_length)
            .field("overwrite", &self.overwrite)
            .field("bip44_path", &self.bip44_path)
            .field("tx_hash", &self.tx_hash)
            .field("export_master_address", &self.export_master_address)
            .field("resolve_addresses", &self.resolve_addresses)
            .field("card_name", &self.card_name)
            .field("wallet_paths", &self.wallet_paths)
            .field("factory_reset", &self.factory_reset)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overwrites_present_values() {
        let mut p = FlowParams {
            pin: Some("111111".to_string()),
            puk: Some("123456123456".to_string()),
            ..Default::default()
        };

        p.merge(FlowParams {
            pin: Some("222222".to_string()),
            tx_hash: Some("00".to_string()),
            ..Default::default()
        });

        assert_eq!(p.pin.as_deref(), Some("222222"));
        assert_eq!(p.puk.as_deref(), Some("123456123456"));
        assert_eq!(p.tx_hash.as_deref(), Some("00"));
    }

    #[test]
    fn parse_host_keys() {
        let p = FlowParams::from_json(
            r#"{
                "pin": "123456",
                "new-puk": "123456123456",
                "pairing-pass": "KeycardDefaultPairing",
                "bip44-path": "m/44'/60'/0'/0/0",
                "tx-hash": "abcd",
                "mnemonic-length": 12,
                "resolve-addresses": true,
                "wallet-paths": ["m/44'/60'/0'/0/1"],
                "unknown-key": 4
            }"#,
        )
        .unwrap();

        assert_eq!(p.pin.as_deref(), Some("123456"));
        assert_eq!(p.new_puk.as_deref(), Some("123456123456"));
        assert_eq!(p.pairing_pass.as_deref(), Some("KeycardDefaultPairing"));
        assert_eq!(p.bip44_path, Some(PathParam::from("m/44'/60'/0'/0/0")));
        assert_eq!(p.mnemonic_length, Some(12));
        assert_eq!(p.resolve_addresses, Some(true));
        assert_eq!(p.wallet_paths.as_ref().map(|v| v.len()), Some(1));
    }

    #[test]
    fn parse_path_list() {
        let p = FlowParams::from_json(r#"{"bip44-path": ["m/44'/60'/0'/0/0", "m/44'/60'/0'/0/1"]}"#)
            .unwrap();

        assert!(matches!(p.bip44_path, Some(PathParam::Many(v)) if v.len() == 2));
    }

    #[test]
    fn debug_redacts_secrets() {
        let p = FlowParams {
            pin: Some("123456".to_string()),
            mnemonic: Some("abandon ability".to_string()),
            ..Default::default()
        };

        let s = format!("{p:?}");
        assert!(!s.contains("123456"));
        assert!(!s.contains("abandon"));
    }
}
