//! The security session: signing and sealing of application messages.
//!
//! A session owns one channel per direction. The outgoing channel is keyed with the constants of
//! the local role, the incoming channel with those of the peer, so an initiator's outgoing channel
//! and a responder's incoming channel derived from the same secret are identical.
//!
//! Each channel carries an RC4 keystream and a sequence number that advance with every message.
//! Both peers must process the messages of a direction in wire order; a dropped or reordered
//! message makes every later signature check of that direction fail.


use std::fmt;

use cipher::{KeyInit, StreamCipher};
use cipher::generic_array::typenum::{U16, U8};
use rc4::Rc4;
use subtle::ConstantTimeEq;
use tracing::{debug, trace, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{check_len, Error, Result};
use crate::flags::Flags;
use crate::keys::{hmac_md5_concat, DirectionKeys, Role, SealKeyVariant, SESSION_KEY_LEN};
use crate::signature::Signature;


/// How message checksums are calculated.
///
/// Selected once from the negotiated flags; see [`SigningScheme::select`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum SigningScheme {
    /// CRC-32 of the message, encrypted with the sealing keystream together with the sequence
    /// number.
    Crc32,

    /// HMAC-MD5 over sequence number and message, keyed by the signing key and truncated to eight
    /// bytes. If `seal_checksum` is set, the truncated digest is encrypted with the sealing
    /// keystream.
    HmacMd5 { seal_checksum: bool },
}
impl SigningScheme {
    /// Picks the signing scheme for the negotiated flags.
    pub fn select(flags: Flags) -> Self {
        if flags.contains(Flags::NEGOTIATE_EXTENDED_SESSION_SECURITY) {
            Self::HmacMd5 {
                seal_checksum: flags.contains(Flags::NEGOTIATE_KEY_EXCH),
            }
        } else {
            Self::Crc32
        }
    }
}


/// RC4 with one of the two sealing key lengths.
enum Rc4State {
    Weak(Rc4<U8>),
    Full(Rc4<U16>),
}
impl Rc4State {
    fn new(key: &[u8]) -> Result<Self> {
        match key.len() {
            8 => <Rc4<U8> as KeyInit>::new_from_slice(key)
                .map(Self::Weak)
                .map_err(|e| Error::primitive("RC4", e)),
            16 => <Rc4<U16> as KeyInit>::new_from_slice(key)
                .map(Self::Full)
                .map_err(|e| Error::primitive("RC4", e)),
            other => Err(Error::PrimitiveFailure {
                primitive: "RC4",
                reason: format!("unsupported sealing key length {}", other),
            }),
        }
    }

    fn apply_keystream(&mut self, buf: &mut [u8]) -> Result<()> {
        let res = match self {
            Self::Weak(rc4) => rc4.try_apply_keystream(buf),
            Self::Full(rc4) => rc4.try_apply_keystream(buf),
        };
        res.map_err(|e| Error::primitive("RC4", e))
    }
}


/// The sealing keystream of one direction.
///
/// Keeps the key and the number of keystream bytes used so far, which allows returning to an
/// earlier position after a failed integrity check.
struct SealingCipher {
    key: Zeroizing<Vec<u8>>,
    state: Rc4State,
    position: u64,
}
impl SealingCipher {
    fn new(key: &[u8]) -> Result<Self> {
        Ok(Self {
            key: Zeroizing::new(Vec::from(key)),
            state: Rc4State::new(key)?,
            position: 0,
        })
    }

    /// XORs `buf` with the next keystream bytes.
    fn apply(&mut self, buf: &mut [u8]) -> Result<()> {
        self.state.apply_keystream(buf)?;
        self.position += buf.len() as u64;
        Ok(())
    }

    /// Restarts the keystream and skips ahead to `position`.
    fn rewind(&mut self, position: u64) -> Result<()> {
        let mut state = Rc4State::new(&self.key)?;
        let mut remaining = position;
        let mut discard = Zeroizing::new([0u8; 256]);
        while remaining > 0 {
            let chunk = remaining.min(discard.len() as u64) as usize;
            state.apply_keystream(&mut discard[..chunk])?;
            remaining -= chunk as u64;
        }
        self.state = state;
        self.position = position;
        Ok(())
    }
}


/// One direction of a connection: keys, keystream and sequence number.
struct Channel {
    sender: Role,
    scheme: SigningScheme,
    signing_key: Zeroizing<[u8; 16]>,
    cipher: SealingCipher,
    sequence_number: u32,
}
impl Channel {
    fn new(flags: Flags, scheme: SigningScheme, session_secret: &[u8], sender: Role) -> Result<Self> {
        let keys = DirectionKeys::derive(flags, session_secret, sender)?;
        Ok(Self {
            sender,
            scheme,
            signing_key: Zeroizing::new(*keys.signing_key()),
            cipher: SealingCipher::new(keys.sealing_key())?,
            sequence_number: 0,
        })
    }

    /// Calculates the signature of `message` at the current sequence number.
    ///
    /// Consumes keystream bytes unless the scheme is HMAC-MD5 without checksum sealing. Does not
    /// advance the sequence number.
    fn signature(&mut self, message: &[u8]) -> Result<Signature> {
        let sequence_number = self.sequence_number;
        match self.scheme {
            SigningScheme::HmacMd5 { seal_checksum } => {
                let digest = hmac_md5_concat(
                    &self.signing_key[..],
                    &[&sequence_number.to_le_bytes()[..], message],
                )?;
                let mut checksum = [0u8; 8];
                checksum.copy_from_slice(&digest[..8]);
                if seal_checksum {
                    self.cipher.apply(&mut checksum)?;
                }
                Ok(Signature::new(checksum, sequence_number))
            },
            SigningScheme::Crc32 => {
                // random pad, CRC-32, sequence number; all three run through the keystream
                let mut block = [0u8; 12];
                block[4..8].copy_from_slice(&crc32fast::hash(message).to_le_bytes());
                block[8..12].copy_from_slice(&sequence_number.to_le_bytes());
                self.cipher.apply(&mut block)?;

                // the encrypted pad is not transmitted
                let mut checksum = [0u8; 8];
                checksum[4..8].copy_from_slice(&block[4..8]);
                let mut encrypted_sequence = [0u8; 4];
                encrypted_sequence.copy_from_slice(&block[8..12]);
                Ok(Signature::new(checksum, u32::from_le_bytes(encrypted_sequence)))
            },
        }
    }

    /// Wraps around to 0 after `u32::MAX`; the keystream keeps running.
    fn advance(&mut self) {
        self.sequence_number = self.sequence_number.wrapping_add(1);
    }

    /// Runs `op` against the channel. If it fails, the keystream is returned to where it was
    /// before, so the failed call has no effect on the channel.
    ///
    /// `op` must only advance the sequence number once nothing else can fail.
    fn rollback_on_error<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let checkpoint = self.cipher.position;
        let res = op(self);
        if res.is_err() && self.cipher.position != checkpoint {
            self.cipher.rewind(checkpoint)?;
        }
        res
    }

    /// Checks `supplied` against the signature of `message` and advances on a match.
    fn check(&mut self, message: &[u8], supplied: &[u8]) -> Result<()> {
        let expected = self.signature(message)?.to_bytes();
        if bool::from(expected[..].ct_eq(supplied)) {
            self.advance();
            return Ok(());
        }

        warn!(
            sender = ?self.sender,
            sequence_number = self.sequence_number,
            "message signature mismatch"
        );
        Err(Error::IntegrityFailure { sequence_number: self.sequence_number })
    }
}
impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("sender", &self.sender)
            .field("scheme", &self.scheme)
            .field("sequence_number", &self.sequence_number)
            .field("keystream_position", &self.cipher.position)
            .finish_non_exhaustive()
    }
}


/// The outgoing direction of a session.
#[derive(Debug)]
pub struct SendChannel {
    channel: Channel,
}
impl SendChannel {
    /// Seals and signs a message.
    ///
    /// Returns the sealed message and its signature. The signature covers the plaintext.
    pub fn wrap(&mut self, plaintext: &[u8]) -> Result<(Vec<u8>, Signature)> {
        trace!(
            sequence_number = self.channel.sequence_number,
            len = plaintext.len(),
            "wrapping message"
        );

        let mut sealed = Vec::from(plaintext);
        self.channel.cipher.apply(&mut sealed)?;
        let signature = self.channel.signature(plaintext)?;
        self.channel.advance();
        Ok((sealed, signature))
    }

    /// Signs a message without sealing it.
    pub fn sign(&mut self, message: &[u8]) -> Result<Signature> {
        trace!(
            sequence_number = self.channel.sequence_number,
            len = message.len(),
            "signing message"
        );

        let signature = self.channel.signature(message)?;
        self.channel.advance();
        Ok(signature)
    }

    /// The sequence number the next outgoing message will carry.
    ///
    /// After `u32::MAX` the counter wraps around to 0, matching the 32-bit wire field.
    pub fn next_sequence_number(&self) -> u32 {
        self.channel.sequence_number
    }
}


/// The incoming direction of a session.
#[derive(Debug)]
pub struct ReceiveChannel {
    channel: Channel,
}
impl ReceiveChannel {
    /// Unseals a message and checks its signature.
    ///
    /// If the signature does not match, [`Error::IntegrityFailure`] is returned and the channel
    /// stays as it was before the call.
    pub fn unwrap(&mut self, sealed: &[u8], signature: &[u8]) -> Result<Vec<u8>> {
        Signature::try_from(signature)?;
        trace!(
            sequence_number = self.channel.sequence_number,
            len = sealed.len(),
            "unwrapping message"
        );

        self.channel.rollback_on_error(|channel| {
            let mut plaintext = Vec::from(sealed);
            channel.cipher.apply(&mut plaintext)?;
            if let Err(e) = channel.check(&plaintext, signature) {
                plaintext.zeroize();
                return Err(e);
            }
            Ok(plaintext)
        })
    }

    /// Checks the signature of a message that was signed without sealing.
    pub fn verify(&mut self, message: &[u8], signature: &[u8]) -> Result<()> {
        Signature::try_from(signature)?;
        trace!(
            sequence_number = self.channel.sequence_number,
            len = message.len(),
            "verifying message"
        );

        self.channel.rollback_on_error(|channel| channel.check(message, signature))
    }

    /// The sequence number the next incoming message is expected to carry.
    ///
    /// Wraps around to 0 after `u32::MAX`, like the sender's counter.
    pub fn next_sequence_number(&self) -> u32 {
        self.channel.sequence_number
    }
}


/// A security session protecting messages between two peers.
///
/// Constructed once per connection after the handshake. Outgoing messages are protected with
/// [`wrap`](Self::wrap) or [`sign`](Self::sign), incoming messages checked with
/// [`unwrap`](Self::unwrap) or [`verify`](Self::verify). To drive both directions from different
/// tasks, split the session with [`into_split`](Self::into_split).
#[derive(Debug)]
pub struct SecuritySession {
    flags: Flags,
    role: Role,
    outgoing: SendChannel,
    incoming: ReceiveChannel,
}
impl SecuritySession {
    /// Derives the keys of both directions and starts a session.
    ///
    /// `session_secret` is the 16-byte exported session key; the session does not keep it.
    pub fn new(flags: Flags, session_secret: &[u8], role: Role) -> Result<Self> {
        check_len(session_secret, SESSION_KEY_LEN)?;

        let scheme = SigningScheme::select(flags);
        let outgoing = Channel::new(flags, scheme, session_secret, role)?;
        let incoming = Channel::new(flags, scheme, session_secret, role.peer())?;

        debug!(
            flags = %flags,
            ?role,
            ?scheme,
            seal_key_variant = ?SealKeyVariant::select(flags),
            "security session established"
        );

        Ok(Self {
            flags,
            role,
            outgoing: SendChannel { channel: outgoing },
            incoming: ReceiveChannel { channel: incoming },
        })
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Seals and signs an outgoing message. See [`SendChannel::wrap`].
    pub fn wrap(&mut self, plaintext: &[u8]) -> Result<(Vec<u8>, Signature)> {
        self.outgoing.wrap(plaintext)
    }

    /// Unseals an incoming message and checks its signature. See [`ReceiveChannel::unwrap`].
    pub fn unwrap(&mut self, sealed: &[u8], signature: &[u8]) -> Result<Vec<u8>> {
        self.incoming.unwrap(sealed, signature)
    }

    /// Signs an outgoing message without sealing it. See [`SendChannel::sign`].
    pub fn sign(&mut self, message: &[u8]) -> Result<Signature> {
        self.outgoing.sign(message)
    }

    /// Checks the signature of an incoming unsealed message. See [`ReceiveChannel::verify`].
    pub fn verify(&mut self, message: &[u8], signature: &[u8]) -> Result<()> {
        self.incoming.verify(message, signature)
    }

    pub fn next_send_sequence(&self) -> u32 {
        self.outgoing.next_sequence_number()
    }

    pub fn next_receive_sequence(&self) -> u32 {
        self.incoming.next_sequence_number()
    }

    /// Splits the session into its two directions.
    pub fn into_split(self) -> (SendChannel, ReceiveChannel) {
        (self.outgoing, self.incoming)
    }
}
