// Copyright (c) 2022-2023 The MobileCoin Foundation

/// Metadata as stored on the card
///
/// Wallets are stored as the last (non-hardened) component of their
/// derivation path below the wallet root, the engine expands them to
/// full paths.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    pub name: String,
    pub wallets: Vec<u32>,
}
