//! NTLM SSP message signing and sealing for Rust.
//!
//! Once an NTLM handshake has completed, both peers share the negotiated flags and a 16-byte
//! exported session key. This crate derives the per-direction signing and sealing keys from them
//! and protects application messages: [`SecuritySession::wrap`] seals a message and produces a
//! 16-byte [`Signature`], [`SecuritySession::unwrap`] reverses this on the other side and rejects
//! messages whose signature does not match.
//!
//! Sample usage:
//! ```
//! use ntlmseal::{Flags, Role, SecuritySession};
//!
//! let flags
//!     = Flags::NEGOTIATE_UNICODE
//!     | Flags::NEGOTIATE_SIGN
//!     | Flags::NEGOTIATE_SEAL
//!     | Flags::NEGOTIATE_NTLM
//!     | Flags::NEGOTIATE_EXTENDED_SESSION_SECURITY
//!     | Flags::NEGOTIATE_128
//!     | Flags::NEGOTIATE_KEY_EXCH
//!     ;
//! let exported_session_key = ntlmseal::random_session_key();
//!
//! let mut client = SecuritySession::new(flags, &exported_session_key, Role::Initiator)?;
//! let mut server = SecuritySession::new(flags, &exported_session_key, Role::Responder)?;
//!
//! let (sealed, signature) = client.wrap(b"GET /resource")?;
//! let plaintext = server.unwrap(&sealed, &signature.to_bytes())?;
//! assert_eq!(plaintext, b"GET /resource");
//!
//! // a tampered signature is rejected without disturbing the session
//! let (sealed, signature) = server.wrap(b"200 OK")?;
//! let mut tampered = signature.to_bytes();
//! tampered[5] ^= 0xFF;
//! assert!(client.unwrap(&sealed, &tampered).is_err());
//! assert_eq!(client.unwrap(&sealed, &signature.to_bytes())?, b"200 OK");
//! # Ok::<(), ntlmseal::Error>(())
//! ```
//!
//! With NTLMv1, the exported session key is obtained from the handshake material through
//! [`exchange_key`] (and [`decrypt_session_key`] if key exchange was negotiated):
//! ```
//! use ntlmseal::{Flags, Role, SecuritySession};
//!
//! let flags = Flags::NEGOTIATE_NTLM | Flags::NEGOTIATE_SIGN | Flags::NEGOTIATE_SEAL | Flags::NEGOTIATE_LM_KEY;
//! let server_challenge = [0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef];
//!
//! let lm_hash = ntlmseal::lm_owf_v1("Password")?;
//! let lm_response = ntlmseal::lm_challenge_response_v1(&lm_hash, server_challenge)?;
//! let session_base_key = ntlmseal::session_base_key_v1(&ntlmseal::nt_owf_v1("Password"));
//!
//! let exported_session_key = ntlmseal::exchange_key(
//!     flags,
//!     &session_base_key,
//!     &lm_hash,
//!     &lm_response,
//!     &server_challenge,
//! )?;
//! let session = SecuritySession::new(flags, &exported_session_key, Role::Initiator)?;
//! # drop(session);
//! # Ok::<(), ntlmseal::Error>(())
//! ```


mod error;
mod filetime;
mod flags;
mod keys;
mod password;
mod session;
mod signature;


pub use crate::error::{Error, Result};
pub use crate::filetime::FileTime;
pub use crate::flags::{Flags, KeyStrength};
pub use crate::keys::{
    decrypt_session_key, encrypt_session_key, exchange_key, random_session_key, seal_key,
    sign_key, DirectionKeys, Role, SealKeyVariant, CLIENT_SEALING, CLIENT_SIGNING,
    SERVER_SEALING, SERVER_SIGNING, SESSION_KEY_LEN,
};
pub use crate::password::{lm_challenge_response_v1, lm_owf_v1, nt_owf_v1, session_base_key_v1};
pub use crate::session::{ReceiveChannel, SecuritySession, SendChannel, SigningScheme};
pub use crate::signature::{Signature, SIGNATURE_LEN, SIGNATURE_VERSION};
