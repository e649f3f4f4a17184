//! The 16-byte message signature.


use crate::error::Error;


/// The only signature version in use.
pub const SIGNATURE_VERSION: u32 = 0x0000_0001;

/// Length of a serialized signature.
pub const SIGNATURE_LEN: usize = 16;


/// A message signature, produced when wrapping or signing a message and checked when unwrapping
/// or verifying it.
///
/// Serialized as the version, the checksum and the sequence number, with both integers in
/// little-endian byte order. Without extended session security, the sequence number field holds
/// the sequence number encrypted with the sealing keystream.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Signature {
    pub version: u32,
    pub checksum: [u8; 8],
    pub sequence_number: u32,
}
impl Signature {
    /// Creates a signature of the current version.
    pub fn new(checksum: [u8; 8], sequence_number: u32) -> Self {
        Self {
            version: SIGNATURE_VERSION,
            checksum,
            sequence_number,
        }
    }

    /// Serializes the signature into its wire format.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        let mut ret = [0u8; SIGNATURE_LEN];
        ret[0..4].copy_from_slice(&self.version.to_le_bytes());
        ret[4..12].copy_from_slice(&self.checksum);
        ret[12..16].copy_from_slice(&self.sequence_number.to_le_bytes());
        ret
    }
}
impl From<[u8; SIGNATURE_LEN]> for Signature {
    fn from(value: [u8; SIGNATURE_LEN]) -> Self {
        let mut version = [0u8; 4];
        version.copy_from_slice(&value[0..4]);
        let mut checksum = [0u8; 8];
        checksum.copy_from_slice(&value[4..12]);
        let mut sequence_number = [0u8; 4];
        sequence_number.copy_from_slice(&value[12..16]);

        Self {
            version: u32::from_le_bytes(version),
            checksum,
            sequence_number: u32::from_le_bytes(sequence_number),
        }
    }
}
impl TryFrom<&[u8]> for Signature {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.len() != SIGNATURE_LEN {
            return Err(Error::InvalidSignatureLength { obtained: value.len() });
        }
        let mut bytes = [0u8; SIGNATURE_LEN];
        bytes.copy_from_slice(value);
        Ok(Self::from(bytes))
    }
}
impl From<Signature> for [u8; SIGNATURE_LEN] {
    fn from(signature: Signature) -> Self {
        signature.to_bytes()
    }
}
