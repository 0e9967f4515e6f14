// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Flow status payloads, delivered to the host with every signal

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};

use keycard_card::{ApplicationInfo, KeyPair, TxSignature};

/// Error / outcome vocabulary reported under the `error` key
///
/// Credential and constraint failures report the name of the field
/// in error (`pin`, `puk`, `instance-uid`, ...).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum StatusError {
    Ok,
    Cancel,
    #[strum(serialize = "connection-error")]
    #[serde(rename = "connection-error")]
    Connection,
    UnknownFlow,
    NotAKeycard,
    NoKeys,
    HasKeys,
    RequireInit,
    Pairing,
    Unblocking,
    Signing,
    Exporting,
    ChangingCredentials,
    LoadingKeys,
    StoringMetadata,
    NoData,
    Unpairing,
    RemovingKey,
    FactoryReset,
    NoPcsc,
    NoReaderList,
    NoReaderFound,

    Pin,
    Puk,
    FreePairingSlots,
    InstanceUid,
    KeyUid,
    PukRetries,
}

/// Application info as reported by get-app-info
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AppInfo {
    pub initialized: bool,
    #[serde(rename = "instanceUID", with = "hex::serde")]
    pub instance_uid: Vec<u8>,
    pub version: u16,
    #[serde(rename = "availableSlots")]
    pub available_slots: u8,
    #[serde(rename = "keyUID", with = "hex::serde")]
    pub key_uid: Vec<u8>,
}

impl From<&ApplicationInfo> for AppInfo {
    fn from(a: &ApplicationInfo) -> Self {
        Self {
            initialized: a.initialized,
            instance_uid: a.instance_uid.clone(),
            version: a.version,
            available_slots: a.free_slots,
            key_uid: a.key_uid.clone(),
        }
    }
}

/// Wallet entry in card metadata
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,
    #[serde(with = "hex::serde", default, skip_serializing_if = "Vec::is_empty")]
    pub public_key: Vec<u8>,
}

/// Card metadata with wallet paths expanded
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CardMetadata {
    pub name: String,
    pub wallets: Vec<Wallet>,
}

/// Exported key(s), mirrors the shape of the requested path(s)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExportedKey {
    Single(KeyPair),
    Many(Vec<KeyPair>),
}

/// Status payload attached to every signal
///
/// `error` is always present (empty when a pause carries no error),
/// all other fields are only reported when known.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FlowStatus {
    #[serde(default, with = "error_key")]
    pub error: Option<StatusError>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_pairing_slots: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin_retries: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub puk_retries: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paired: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_info: Option<AppInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic_indexes: Option<Vec<u16>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_key_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<KeyPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whisper_key: Option<KeyPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eip1581_key: Option<KeyPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_root_key: Option<KeyPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_key: Option<KeyPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_key: Option<KeyPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_key: Option<ExportedKey>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_signature: Option<TxSignature>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_metadata: Option<CardMetadata>,
}

impl FlowStatus {
    /// Successful result
    pub fn ok() -> Self {
        Self::with_error(StatusError::Ok)
    }

    /// Status carrying only an error
    pub fn with_error(e: StatusError) -> Self {
        Self {
            error: Some(e),
            ..Default::default()
        }
    }

    /// Encode status to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// `error` key encoding, `None` is reported as an empty string
mod error_key {
    use super::*;
    use core::str::FromStr;

    pub fn serialize<S: Serializer>(v: &Option<StatusError>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(e) => s.collect_str(e),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<StatusError>, D::Error> {
        let s = String::deserialize(d)?;
        match s.as_str() {
            "" => Ok(None),
            v => StatusError::from_str(v)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
