// Copyright (c) 2022-2023 The MobileCoin Foundation

use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter, EnumString};

use crate::Error;

/// Flow types, selecting the operation run by a session
///
/// Numeric identifiers match the host bindings.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Display, EnumString, EnumIter, TryFromPrimitive,
)]
#[strum(serialize_all = "kebab-case")]
#[repr(u8)]
pub enum FlowType {
    GetAppInfo = 0,
    RecoverAccount = 1,
    LoadAccount = 2,
    Login = 3,
    ExportPublic = 4,
    Sign = 5,
    ChangePin = 6,
    ChangePuk = 7,
    ChangePairing = 8,
    UnpairThis = 9,
    UnpairOthers = 10,
    DeleteAccountAndUnpair = 11,
    StoreMetadata = 12,
    GetMetadata = 13,
}

impl FlowType {
    /// Resolve a flow type from its numeric identifier
    pub fn from_id(id: u8) -> Result<Self, Error> {
        Self::try_from(id).map_err(|_| Error::UnknownFlow(id.to_string()))
    }

    /// Resolve a flow type from its name
    pub fn from_name(name: &str) -> Result<Self, Error> {
        name.parse().map_err(|_| Error::UnknownFlow(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn flow_ids() {
        for f in FlowType::iter() {
            assert_eq!(FlowType::from_id(f as u8), Ok(f));
            assert_eq!(FlowType::from_name(&f.to_string()), Ok(f));
        }

        assert_eq!(FlowType::from_id(14), Err(Error::UnknownFlow("14".to_string())));
        assert!(FlowType::from_name("format-card").is_err());
    }

    #[test]
    fn flow_names() {
        assert_eq!(FlowType::GetAppInfo.to_string(), "get-app-info");
        assert_eq!(
            FlowType::DeleteAccountAndUnpair.to_string(),
            "delete-account-and-unpair"
        );
    }
}
