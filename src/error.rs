//! The error type shared by key derivation and the security session.


use thiserror::Error;

use crate::flags::Flags;


/// An error that may occur while deriving keys or protecting messages.
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum Error {
    /// A key or key-derivation input does not have the required length.
    #[error("invalid key length (expected {expected} bytes, obtained {obtained})")]
    InvalidKeyLength { expected: usize, obtained: usize },

    /// A message signature is not exactly 16 bytes long.
    #[error("invalid signature length (expected 16 bytes, obtained {obtained})")]
    InvalidSignatureLength { obtained: usize },

    /// The negotiated flags combine capabilities in a way that cannot be served.
    ///
    /// No combination is rejected at this layer yet; validating combinations is left to the
    /// handshake.
    #[error("unsupported combination of negotiated flags: {flags}")]
    UnsupportedFlagCombination { flags: Flags },

    /// The signature of a received message does not match the expected one.
    ///
    /// The receiving direction is left exactly as it was before the failed call.
    #[error("message integrity check failed at sequence number {sequence_number}")]
    IntegrityFailure { sequence_number: u32 },

    /// An underlying cryptographic primitive rejected its input.
    #[error("{primitive} failed: {reason}")]
    PrimitiveFailure { primitive: &'static str, reason: String },
}

impl Error {
    pub(crate) fn primitive<E: std::fmt::Display>(primitive: &'static str, err: E) -> Self {
        Self::PrimitiveFailure { primitive, reason: err.to_string() }
    }

    /// Whether the session that produced this error may keep being used.
    ///
    /// Only integrity failures are recoverable; the caller decides whether to drop the message
    /// or tear down the connection.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::IntegrityFailure { .. })
    }
}


/// Shorthand for results carrying this crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;


/// Checks that `value` is exactly `expected` bytes long.
pub(crate) fn check_len(value: &[u8], expected: usize) -> Result<()> {
    if value.len() != expected {
        return Err(Error::InvalidKeyLength { expected, obtained: value.len() });
    }
    Ok(())
}

/// Checks that `value` is at least `expected` bytes long.
pub(crate) fn check_min_len(value: &[u8], expected: usize) -> Result<()> {
    if value.len() < expected {
        return Err(Error::InvalidKeyLength { expected, obtained: value.len() });
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_checks() {
        assert_eq!(check_len(&[0u8; 16], 16), Ok(()));
        assert_eq!(
            check_len(&[0u8; 15], 16),
            Err(Error::InvalidKeyLength { expected: 16, obtained: 15 }),
        );
        assert_eq!(check_min_len(&[0u8; 24], 8), Ok(()));
        assert_eq!(
            check_min_len(&[0u8; 7], 8),
            Err(Error::InvalidKeyLength { expected: 8, obtained: 7 }),
        );
    }

    #[test]
    fn test_display() {
        let err = Error::IntegrityFailure { sequence_number: 3 };
        assert_eq!(err.to_string(), "message integrity check failed at sequence number 3");
        assert!(err.is_recoverable());

        let err = Error::InvalidKeyLength { expected: 16, obtained: 4 };
        assert_eq!(err.to_string(), "invalid key length (expected 16 bytes, obtained 4)");
        assert!(!err.is_recoverable());

        let err = Error::UnsupportedFlagCombination { flags: Flags::NEGOTIATE_SIGN | Flags::NEGOTIATE_SEAL };
        assert_eq!(
            err.to_string(),
            "unsupported combination of negotiated flags: NTLMSSP_NEGOTIATE_SIGN | NTLMSSP_NEGOTIATE_SEAL",
        );
    }
}
