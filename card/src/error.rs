// Copyright (c) 2022-2023 The MobileCoin Foundation

/// Keycard session error type
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum CardError {
    /// Smart card service unavailable
    #[error("smart card service unavailable")]
    NoService,

    /// Failed to list readers
    #[error("could not list readers")]
    ReaderList,

    /// No reader connected
    #[error("no reader found")]
    NoReader,

    /// Connection to the card was lost
    #[error("transport error: {0}")]
    Transport(String),

    /// Wrong PIN, with the number of remaining attempts
    #[error("wrong PIN ({remaining} attempts remaining)")]
    WrongPin { remaining: u8 },

    /// Wrong PUK, with the number of remaining attempts
    #[error("wrong PUK ({remaining} attempts remaining)")]
    WrongPuk { remaining: u8 },

    /// Pairing password rejected
    #[error("wrong pairing password")]
    WrongPairing,

    /// Secure channel could not be opened or is not open
    #[error("secure channel error")]
    SecureChannel,

    /// Card is not initialised
    #[error("card not initialised")]
    NotInitialized,

    /// Card holds no key
    #[error("no key loaded")]
    KeyMissing,

    /// Operation requires PIN verification
    #[error("PIN verification required")]
    NotAuthenticated,

    /// Invalid argument for the requested operation
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Unexpected status word
    #[error("card returned status 0x{0:04x}")]
    Status(u16),
}

impl CardError {
    /// Check whether the error was caused by the connection rather than the card
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CardError::Transport(_)
                | CardError::NoService
                | CardError::ReaderList
                | CardError::NoReader
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_classification() {
        assert!(CardError::Transport("removed".to_string()).is_transport());
        assert!(CardError::NoReader.is_transport());

        assert!(!CardError::WrongPairing.is_transport());
        assert!(!CardError::WrongPin { remaining: 2 }.is_transport());
        assert!(!CardError::Status(0x6985).is_transport());
    }
}
