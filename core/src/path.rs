// Copyright (c) 2022-2023 The MobileCoin Foundation

//! BIP-32 derivation path validation

use core::fmt;

use bip32::ChildNumber;

/// Invalid derivation path
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("invalid derivation path")]
pub struct PathError;

/// Validated BIP-32 derivation path (`m/44'/60'/0'/0/0`)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivationPath(bip32::DerivationPath);

impl DerivationPath {
    /// Parse and validate a derivation path
    pub fn parse(path: &str) -> Result<Self, PathError> {
        path.trim()
            .parse::<bip32::DerivationPath>()
            .map(Self)
            .map_err(|_| PathError)
    }

    /// Raw path indices (hardened indices have the top bit set)
    pub fn indices(&self) -> Vec<u32> {
        self.0.iter().map(|c| c.0).collect()
    }

    /// Append a (non-hardened) child index
    pub fn child(&self, index: u32) -> Result<Self, PathError> {
        let n = ChildNumber::new(index, false).map_err(|_| PathError)?;
        let mut p = self.0.clone();
        p.push(n);
        Ok(Self(p))
    }

    /// Fetch the last index when this path is a direct, non-hardened
    /// child of `parent`
    pub fn child_index_of(&self, parent: &DerivationPath) -> Option<u32> {
        let (a, b) = (self.indices(), parent.indices());

        if a.len() != b.len() + 1 || !a.starts_with(&b) {
            return None;
        }

        let last = ChildNumber(*a.last()?);
        match last.is_hardened() {
            true => None,
            false => Some(last.index()),
        }
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_wallet_path() {
        let p = DerivationPath::parse("m/44'/60'/0'/0/3").unwrap();
        assert_eq!(
            p.indices(),
            vec![0x8000_002c, 0x8000_003c, 0x8000_0000, 0, 3]
        );
        assert_eq!(p.to_string(), "m/44'/60'/0'/0/3");
    }

    #[test]
    fn parse_master() {
        let p = DerivationPath::parse("m").unwrap();
        assert!(p.indices().is_empty());
    }

    #[test]
    fn invalid_paths() {
        assert!(DerivationPath::parse("").is_err());
        assert!(DerivationPath::parse("44'/60'/0'").is_err());
        assert!(DerivationPath::parse("m/44'/abc/0").is_err());
    }

    #[test]
    fn child_index() {
        let root = DerivationPath::parse("m/44'/60'/0'/0").unwrap();

        let p = root.child(7).unwrap();
        assert_eq!(p.to_string(), "m/44'/60'/0'/0/7");
        assert_eq!(p.child_index_of(&root), Some(7));

        let hardened = DerivationPath::parse("m/44'/60'/0'/0/7'").unwrap();
        assert_eq!(hardened.child_index_of(&root), None);

        let other = DerivationPath::parse("m/44'/60'/1'/0/7").unwrap();
        assert_eq!(other.child_index_of(&root), None);

        let grandchild = DerivationPath::parse("m/44'/60'/0'/0/7/1").unwrap();
        assert_eq!(grandchild.child_index_of(&root), None);
    }
}
