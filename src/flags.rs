//! The negotiated capability set.
//!
//! Both peers agree on a 32-bit set of flags during the handshake. The security session only
//! consumes the result; whether a combination makes sense is for the handshake to decide, so
//! every bit pattern decodes.


use std::fmt;

use bitflags::bitflags;


bitflags! {
    /// NTLM negotiation flags.
    #[derive(Clone, Copy, Debug, Default, Hash, Eq, Ord, PartialEq, PartialOrd)]
    pub struct Flags: u32 {
        const NEGOTIATE_UNICODE = 0x0000_0001;
        const NEGOTIATE_OEM = 0x0000_0002;
        const REQUEST_TARGET = 0x0000_0004;
        const RESERVED_8 = 0x0000_0008;
        const NEGOTIATE_SIGN = 0x0000_0010;
        const NEGOTIATE_SEAL = 0x0000_0020;
        const NEGOTIATE_DATAGRAM = 0x0000_0040;
        const NEGOTIATE_LM_KEY = 0x0000_0080;
        const RESERVED_100 = 0x0000_0100;
        const NEGOTIATE_NTLM = 0x0000_0200;
        const RESERVED_400 = 0x0000_0400;
        const NEGOTIATE_ANONYMOUS = 0x0000_0800;
        const NEGOTIATE_OEM_DOMAIN_SUPPLIED = 0x0000_1000;
        const NEGOTIATE_OEM_WORKSTATION_SUPPLIED = 0x0000_2000;
        const RESERVED_4000 = 0x0000_4000;
        const NEGOTIATE_ALWAYS_SIGN = 0x0000_8000;
        const TARGET_TYPE_DOMAIN = 0x0001_0000;
        const TARGET_TYPE_SERVER = 0x0002_0000;
        const RESERVED_40000 = 0x0004_0000;
        const NEGOTIATE_EXTENDED_SESSION_SECURITY = 0x0008_0000;
        const NEGOTIATE_IDENTIFY = 0x0010_0000;
        const RESERVED_200000 = 0x0020_0000;
        const REQUEST_NON_NT_SESSION_KEY = 0x0040_0000;
        const NEGOTIATE_TARGET_INFO = 0x0080_0000;
        const RESERVED_1000000 = 0x0100_0000;
        const NEGOTIATE_VERSION = 0x0200_0000;
        const RESERVED_4000000 = 0x0400_0000;
        const RESERVED_8000000 = 0x0800_0000;
        const RESERVED_10000000 = 0x1000_0000;
        const NEGOTIATE_128 = 0x2000_0000;
        const NEGOTIATE_KEY_EXCH = 0x4000_0000;
        const NEGOTIATE_56 = 0x8000_0000;
    }
}


/// The canonical protocol names of the flags, in the order in which they are listed.
///
/// Diagnostics and some callers parse the listing produced by [`Flags::describe`], so neither the
/// names nor the order may change.
const CANONICAL_NAMES: [(Flags, &str); 22] = [
    (Flags::NEGOTIATE_UNICODE, "NTLMSSP_NEGOTIATE_UNICODE"),
    (Flags::NEGOTIATE_OEM, "NTLM_NEGOTIATE_OEM"),
    (Flags::REQUEST_TARGET, "NTLMSSP_REQUEST_TARGET"),
    (Flags::NEGOTIATE_SIGN, "NTLMSSP_NEGOTIATE_SIGN"),
    (Flags::NEGOTIATE_SEAL, "NTLMSSP_NEGOTIATE_SEAL"),
    (Flags::NEGOTIATE_DATAGRAM, "NTLMSSP_NEGOTIATE_DATAGRAM"),
    (Flags::NEGOTIATE_LM_KEY, "NTLMSSP_NEGOTIATE_LM_KEY"),
    (Flags::NEGOTIATE_NTLM, "NTLMSSP_NEGOTIATE_NTLM"),
    (Flags::NEGOTIATE_ANONYMOUS, "NTLMSSP_NEGOTIATE_ANONYMOUS"),
    (Flags::NEGOTIATE_OEM_DOMAIN_SUPPLIED, "NTLMSSP_NEGOTIATE_OEM_DOMAIN_SUPPLIED"),
    (Flags::NEGOTIATE_OEM_WORKSTATION_SUPPLIED, "NTLMSSP_NEGOTIATE_OEM_WORKSTATION_SUPPLIED"),
    (Flags::NEGOTIATE_ALWAYS_SIGN, "NTLMSSP_NEGOTIATE_ALWAYS_SIGN"),
    (Flags::TARGET_TYPE_DOMAIN, "NTLMSSP_TARGET_TYPE_DOMAIN"),
    (Flags::TARGET_TYPE_SERVER, "NTLMSSP_TARGET_TYPE_SERVER"),
    (Flags::NEGOTIATE_EXTENDED_SESSION_SECURITY, "NTLMSSP_NEGOTIATE_EXTENDED_SESSIONSECURITY"),
    (Flags::NEGOTIATE_IDENTIFY, "NTLMSSP_NEGOTIATE_IDENTIFY"),
    (Flags::REQUEST_NON_NT_SESSION_KEY, "NTLMSSP_REQUEST_NON_NT_SESSION_KEY"),
    (Flags::NEGOTIATE_TARGET_INFO, "NTLMSSP_NEGOTIATE_TARGET_INFO"),
    (Flags::NEGOTIATE_VERSION, "NTLMSSP_NEGOTIATE_VERSION"),
    (Flags::NEGOTIATE_128, "NTLMSSP_NEGOTIATE_128"),
    (Flags::NEGOTIATE_KEY_EXCH, "NTLMSSP_NEGOTIATE_KEY_EXCH"),
    (Flags::NEGOTIATE_56, "NTLMSSP_NEGOTIATE_56"),
];


/// The effective strength of the sealing key.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum KeyStrength {
    Bits40,
    Bits56,
    Bits128,
}
impl KeyStrength {
    /// The number of leading session key bytes that feed a key of this strength.
    pub fn key_bytes(&self) -> usize {
        match self {
            Self::Bits40 => 5,
            Self::Bits56 => 7,
            Self::Bits128 => 16,
        }
    }
}


impl Flags {
    /// Decodes a raw negotiated-flags value. Never fails; reserved bits are kept.
    pub fn decode(bits: u32) -> Self {
        Self::from_bits_retain(bits)
    }

    /// Returns whether all capabilities in `cap` have been negotiated.
    pub fn has(self, cap: Flags) -> bool {
        self.contains(cap)
    }

    /// Lists the set flags by their canonical names, joined by `" | "`.
    ///
    /// Reserved bits have no canonical name and are not listed.
    pub fn describe(&self) -> String {
        CANONICAL_NAMES.iter()
            .filter(|(flag, _name)| self.contains(*flag))
            .map(|(_flag, name)| *name)
            .collect::<Vec<&str>>()
            .join(" | ")
    }

    /// The sealing key strength selected by these flags.
    ///
    /// 128-bit takes precedence over 56-bit; if neither is negotiated, 40-bit keys are used.
    pub fn key_strength(&self) -> KeyStrength {
        if self.contains(Flags::NEGOTIATE_128) {
            KeyStrength::Bits128
        } else if self.contains(Flags::NEGOTIATE_56) {
            KeyStrength::Bits56
        } else {
            KeyStrength::Bits40
        }
    }
}
impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}
impl From<u32> for Flags {
    fn from(bits: u32) -> Self {
        Self::decode(bits)
    }
}
impl From<Flags> for u32 {
    fn from(flags: Flags) -> Self {
        flags.bits()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_fixture() {
        assert_eq!(
            Flags::decode(0xe202b232).describe(),
            "NTLM_NEGOTIATE_OEM | NTLMSSP_NEGOTIATE_SIGN | NTLMSSP_NEGOTIATE_SEAL | NTLMSSP_NEGOTIATE_NTLM | NTLMSSP_NEGOTIATE_OEM_DOMAIN_SUPPLIED | NTLMSSP_NEGOTIATE_OEM_WORKSTATION_SUPPLIED | NTLMSSP_NEGOTIATE_ALWAYS_SIGN | NTLMSSP_TARGET_TYPE_SERVER | NTLMSSP_NEGOTIATE_VERSION | NTLMSSP_NEGOTIATE_128 | NTLMSSP_NEGOTIATE_KEY_EXCH | NTLMSSP_NEGOTIATE_56",
        );
    }

    #[test]
    fn test_describe_edges() {
        assert_eq!(Flags::decode(0).describe(), "");
        // reserved bits only
        assert_eq!(Flags::decode(0x0000_0408).describe(), "");
        assert_eq!(
            Flags::decode(0x0008_0001).to_string(),
            "NTLMSSP_NEGOTIATE_UNICODE | NTLMSSP_NEGOTIATE_EXTENDED_SESSIONSECURITY",
        );
    }

    #[test]
    fn test_decode_keeps_raw_bits() {
        for bits in [0u32, 0x0000_0008, 0xe202_b232, 0xffff_ffff] {
            assert_eq!(Flags::decode(bits).bits(), bits);
            assert_eq!(u32::from(Flags::from(bits)), bits);
        }
    }

    #[test]
    fn test_has() {
        let flags = Flags::decode(0xe202_8233);
        assert!(flags.has(Flags::NEGOTIATE_SIGN));
        assert!(flags.has(Flags::NEGOTIATE_SIGN | Flags::NEGOTIATE_SEAL));
        assert!(!flags.has(Flags::NEGOTIATE_EXTENDED_SESSION_SECURITY));
        assert!(!flags.has(Flags::NEGOTIATE_LM_KEY | Flags::NEGOTIATE_SIGN));
    }

    #[test]
    fn test_canonical_names_are_ordered_and_unique() {
        for pair in CANONICAL_NAMES.windows(2) {
            assert!(pair[0].0.bits() < pair[1].0.bits());
        }
    }

    #[test]
    fn test_key_strength() {
        assert_eq!(Flags::decode(0).key_strength(), KeyStrength::Bits40);
        assert_eq!(Flags::NEGOTIATE_56.key_strength(), KeyStrength::Bits56);
        assert_eq!(Flags::NEGOTIATE_128.key_strength(), KeyStrength::Bits128);
        assert_eq!((Flags::NEGOTIATE_56 | Flags::NEGOTIATE_128).key_strength(), KeyStrength::Bits128);
        assert_eq!(KeyStrength::Bits56.key_bytes(), 7);
    }
}
