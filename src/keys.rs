//! Derivation of signing, sealing and key exchange keys.
//!
//! Every function in this module is pure. The session secret (the exported session key) is the
//! 16-byte value both peers hold after the handshake; each direction of a connection derives its
//! own signing and sealing keys from it using the constants of the role sending in that direction.


use cipher::{BlockEncrypt, KeyInit, StreamCipher};
use cipher::generic_array::GenericArray;
use cipher::generic_array::typenum::{U16, U8};
use des::Des;
use digest::Digest;
use hmac::{Hmac, Mac};
use md5::Md5;
use rand::RngCore;
use rand::rngs::OsRng;
use rc4::Rc4;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{check_len, check_min_len, Error, Result};
use crate::flags::{Flags, KeyStrength};


/// Length of the session secret and of every full-strength key.
pub const SESSION_KEY_LEN: usize = 16;

/// Suffix completing a 56-bit LM sealing key to eight bytes.
const LM_KEY_SUFFIX_56: [u8; 1] = [0xA0];

/// Suffix completing a 40-bit LM sealing key to eight bytes.
const LM_KEY_SUFFIX_40: [u8; 3] = [0xE5, 0x38, 0xB0];

/// Filler for the second DES key of the LM key exchange.
const LM_KEY_EXCHANGE_FILLER: u8 = 0xBD;

pub const CLIENT_SIGNING: &[u8] = b"session key to client-to-server signing key magic constant\0";
pub const CLIENT_SEALING: &[u8] = b"session key to client-to-server sealing key magic constant\0";
pub const SERVER_SIGNING: &[u8] = b"session key to server-to-client signing key magic constant\0";
pub const SERVER_SEALING: &[u8] = b"session key to server-to-client sealing key magic constant\0";


/// The part a peer plays in the connection.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Role {
    /// The client, which sends the Negotiate and Authenticate messages.
    Initiator,

    /// The server, which sends the Challenge message.
    Responder,
}
impl Role {
    /// The other side of the connection.
    pub fn peer(&self) -> Role {
        match self {
            Self::Initiator => Self::Responder,
            Self::Responder => Self::Initiator,
        }
    }

    /// The constant from which the signing key for messages sent by this role is derived.
    pub fn signing_constant(&self) -> &'static [u8] {
        match self {
            Self::Initiator => CLIENT_SIGNING,
            Self::Responder => SERVER_SIGNING,
        }
    }

    /// The constant from which the sealing key for messages sent by this role is derived.
    pub fn sealing_constant(&self) -> &'static [u8] {
        match self {
            Self::Initiator => CLIENT_SEALING,
            Self::Responder => SERVER_SEALING,
        }
    }
}


/// The way the sealing key is obtained from the session secret.
///
/// Selected once from the negotiated flags; see [`SealKeyVariant::select`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum SealKeyVariant {
    /// The session secret is used as the sealing key.
    SessionKey,

    /// A weakened 8-byte key for legacy LAN Manager sealing.
    LanManager(KeyStrength),

    /// MD5 over a prefix of the session secret and the role's sealing constant.
    Extended(KeyStrength),
}
impl SealKeyVariant {
    /// Picks the sealing key variant for the negotiated flags.
    ///
    /// Extended session security takes precedence over the LM key; without either, the session
    /// secret is used directly regardless of the 56- and 128-bit flags.
    pub fn select(flags: Flags) -> Self {
        if flags.contains(Flags::NEGOTIATE_EXTENDED_SESSION_SECURITY) {
            Self::Extended(flags.key_strength())
        } else if flags.contains(Flags::NEGOTIATE_LM_KEY) {
            // LM keys are never longer than 56 bits
            if flags.contains(Flags::NEGOTIATE_56) {
                Self::LanManager(KeyStrength::Bits56)
            } else {
                Self::LanManager(KeyStrength::Bits40)
            }
        } else {
            Self::SessionKey
        }
    }
}


/// Computes MD5 over the concatenation of the given parts.
fn md5_concat(parts: &[&[u8]]) -> [u8; 16] {
    let mut md5 = <Md5 as Digest>::new();
    for part in parts {
        md5.update(part);
    }
    let mut ret = [0u8; 16];
    ret.copy_from_slice(md5.finalize().as_slice());
    ret
}

/// Computes HMAC-MD5 over the concatenation of the given parts.
pub(crate) fn hmac_md5_concat(key: &[u8], parts: &[&[u8]]) -> Result<[u8; 16]> {
    let mut hmac_md5: Hmac<Md5> = <Hmac<Md5> as Mac>::new_from_slice(key)
        .map_err(|e| Error::primitive("HMAC-MD5", e))?;
    for part in parts {
        hmac_md5.update(part);
    }
    let mut ret = [0u8; 16];
    ret.copy_from_slice(hmac_md5.finalize().into_bytes().as_slice());
    Ok(ret)
}

/// Spreads a 56-bit key over the eight bytes DES expects, seven bits per byte.
///
/// The lowest bit of each byte is the DES parity bit and is left clear.
fn expand_des_key(key: &[u8; 7]) -> [u8; 8] {
    let mut packed = [0u8; 8];
    packed[1..].copy_from_slice(key);
    let bits = u64::from_be_bytes(packed);

    let mut ret = [0u8; 8];
    for (i, b) in ret.iter_mut().enumerate() {
        let shift = 49 - 7 * i;
        *b = (((bits >> shift) & 0x7F) as u8) << 1;
    }
    ret
}

/// Encrypts a single block with DES, keyed by a 56-bit key.
pub(crate) fn des_encrypt_block(key: &[u8; 7], data: [u8; 8]) -> Result<[u8; 8]> {
    let expanded = Zeroizing::new(expand_des_key(key));
    let des = Des::new_from_slice(expanded.as_slice())
        .map_err(|e| Error::primitive("DES", e))?;

    let mut block: GenericArray<u8, U8> = GenericArray::from(data);
    des.encrypt_block(&mut block);

    let mut ret = [0u8; 8];
    ret.copy_from_slice(block.as_slice());
    Ok(ret)
}


/// Derives a signing key from the session secret and a role constant.
///
/// The result does not depend on the negotiated flags; it is only used when extended session
/// security is negotiated.
pub fn sign_key(session_secret: &[u8], role_constant: &[u8]) -> Result<[u8; 16]> {
    check_len(session_secret, SESSION_KEY_LEN)?;
    Ok(md5_concat(&[session_secret, role_constant]))
}

/// Derives a sealing key from the session secret and a role constant.
///
/// Depending on the negotiated flags, the key is 16 bytes (session secret or MD5 digest) or
/// 8 bytes (weakened LAN Manager key).
pub fn seal_key(flags: Flags, session_secret: &[u8], role_constant: &[u8]) -> Result<Vec<u8>> {
    check_len(session_secret, SESSION_KEY_LEN)?;

    let key = match SealKeyVariant::select(flags) {
        SealKeyVariant::SessionKey => Vec::from(session_secret),
        SealKeyVariant::LanManager(strength) => {
            let suffix: &[u8] = match strength {
                KeyStrength::Bits56 => &LM_KEY_SUFFIX_56,
                _ => &LM_KEY_SUFFIX_40,
            };
            let mut key = Vec::with_capacity(8);
            key.extend_from_slice(&session_secret[..strength.key_bytes()]);
            key.extend_from_slice(suffix);
            key
        },
        SealKeyVariant::Extended(strength) => {
            let prefix = &session_secret[..strength.key_bytes()];
            Vec::from(md5_concat(&[prefix, role_constant]))
        },
    };
    Ok(key)
}

/// Computes the NTLMv1 key exchange key from the handshake material.
///
/// `lm_hash` is the LM one-way function of the password (see [`crate::lm_owf_v1`]),
/// `lm_response` the LM challenge response sent by the client. Which inputs are consulted
/// depends on the flags:
///
/// * extended session security: HMAC-MD5 keyed by `session_base_key` over the server challenge
///   and the first eight bytes of the LM response,
/// * LM key: the first eight bytes of the LM response DES-encrypted twice, once keyed by the
///   first seven bytes of `lm_hash` and once by its eighth byte padded with `0xBD`,
/// * non-NT session key requested: the first eight bytes of `lm_hash`, zero-extended,
/// * otherwise the session base key itself.
pub fn exchange_key(
    flags: Flags,
    session_base_key: &[u8],
    lm_hash: &[u8],
    lm_response: &[u8],
    server_challenge: &[u8],
) -> Result<[u8; 16]> {
    check_len(session_base_key, SESSION_KEY_LEN)?;

    if flags.contains(Flags::NEGOTIATE_EXTENDED_SESSION_SECURITY) {
        check_min_len(server_challenge, 8)?;
        check_min_len(lm_response, 8)?;
        hmac_md5_concat(session_base_key, &[&server_challenge[..8], &lm_response[..8]])
    } else if flags.contains(Flags::NEGOTIATE_LM_KEY) {
        check_min_len(lm_hash, 8)?;
        check_min_len(lm_response, 8)?;

        let mut data = [0u8; 8];
        data.copy_from_slice(&lm_response[..8]);

        let mut first_key = Zeroizing::new([0u8; 7]);
        first_key.copy_from_slice(&lm_hash[..7]);
        let mut second_key = Zeroizing::new([LM_KEY_EXCHANGE_FILLER; 7]);
        second_key[0] = lm_hash[7];

        let mut ret = [0u8; 16];
        ret[..8].copy_from_slice(&des_encrypt_block(&first_key, data)?);
        ret[8..].copy_from_slice(&des_encrypt_block(&second_key, data)?);
        Ok(ret)
    } else if flags.contains(Flags::REQUEST_NON_NT_SESSION_KEY) {
        check_min_len(lm_hash, 8)?;
        let mut ret = [0u8; 16];
        ret[..8].copy_from_slice(&lm_hash[..8]);
        Ok(ret)
    } else {
        let mut ret = [0u8; 16];
        ret.copy_from_slice(session_base_key);
        Ok(ret)
    }
}


/// Applies RC4 keyed by a 16-byte key to a 16-byte value.
fn rc4_session_key(key: &[u8], value: &[u8]) -> Result<[u8; 16]> {
    check_len(key, SESSION_KEY_LEN)?;
    check_len(value, SESSION_KEY_LEN)?;

    let mut rc4 = <Rc4<U16> as KeyInit>::new_from_slice(key)
        .map_err(|e| Error::primitive("RC4", e))?;
    let mut ret = [0u8; 16];
    ret.copy_from_slice(value);
    rc4.try_apply_keystream(&mut ret)
        .map_err(|e| Error::primitive("RC4", e))?;
    Ok(ret)
}

/// Encrypts the exported session key for transport in the Authenticate message.
///
/// Only used when key exchange is negotiated; otherwise the key exchange key is the exported
/// session key.
pub fn encrypt_session_key(key_exchange_key: &[u8], exported_session_key: &[u8]) -> Result<[u8; 16]> {
    rc4_session_key(key_exchange_key, exported_session_key)
}

/// Recovers the exported session key from the encrypted random session key of an Authenticate
/// message.
pub fn decrypt_session_key(key_exchange_key: &[u8], encrypted_session_key: &[u8]) -> Result<[u8; 16]> {
    rc4_session_key(key_exchange_key, encrypted_session_key)
}

/// Generates a fresh exported session key.
pub fn random_session_key() -> [u8; 16] {
    let mut ret = [0u8; 16];
    OsRng.fill_bytes(&mut ret);
    ret
}


/// The signing and sealing keys protecting one direction of a connection.
///
/// Both are wiped when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DirectionKeys {
    signing_key: [u8; 16],
    sealing_key: Vec<u8>,
}
impl DirectionKeys {
    /// Derives the keys protecting messages sent by `sender`.
    pub fn derive(flags: Flags, session_secret: &[u8], sender: Role) -> Result<Self> {
        let signing_key = sign_key(session_secret, sender.signing_constant())?;
        let sealing_key = seal_key(flags, session_secret, sender.sealing_constant())?;
        Ok(Self {
            signing_key,
            sealing_key,
        })
    }

    pub fn signing_key(&self) -> &[u8; 16] {
        &self.signing_key
    }

    pub fn sealing_key(&self) -> &[u8] {
        &self.sealing_key
    }
}
