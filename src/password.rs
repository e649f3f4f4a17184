//! NTLMv1 one-way functions, producing the handshake material consumed by
//! [`exchange_key`](crate::exchange_key).


use digest::Digest;
use md4::Md4;
use zeroize::Zeroizing;

use crate::error::Result;
use crate::keys::des_encrypt_block;


/// The plaintext encrypted by both halves of the LM hash.
const LM_MAGIC: [u8; 8] = *b"KGS!@#$%";


/// Derives the LM hash (LMOWFv1) of a password.
///
/// The password is uppercased, encoded, truncated or zero-padded to 14 bytes and split into two
/// DES keys, each of which encrypts `KGS!@#$%`:
///
/// ```plain
///            ┌────────────┐  ┌───────────────┐  ┌─────────────┐
/// password ──┤ convert to ├──┤    encode     ├──┤ truncate or ├──┐
///            │ uppercase  │  │               │  │ pad to 14 B │  │
///            └────────────┘  └───────────────┘  └─────────────┘  │
///           ┌────────────────────────────────────────────────────┘
///           │┌───────┐
///           └┤ split │           "KGS!@#$%"
///            └─┬───┬─┘               │ input
///         0..7 │   │ 7..14    key ┌──┴──┐ output
///              │   └──────────────┤ DES ├────────────┐
///              │                  └─────┘            │ 8..16
///              │                                  ┌──┴───┐
///              │                 "KGS!@#$%"       │ join ├──── hash
///              │                     │ input      └──┬───┘
///              │              key ┌──┴──┐ output     │ 0..8
///              └──────────────────┤ DES ├────────────┘
///                                 └─────┘
/// ```
///
/// The password is encoded as UTF-8, which matches the OEM code page for ASCII passwords only.
pub fn lm_owf_v1(password: &str) -> Result<[u8; 16]> {
    let mut password_bytes = Zeroizing::new(password.to_uppercase().into_bytes());
    password_bytes.resize(14, 0x00);

    let mut first_key = Zeroizing::new([0u8; 7]);
    first_key.copy_from_slice(&password_bytes[0..7]);
    let mut second_key = Zeroizing::new([0u8; 7]);
    second_key.copy_from_slice(&password_bytes[7..14]);

    let mut output = [0u8; 16];
    output[0..8].copy_from_slice(&des_encrypt_block(&first_key, LM_MAGIC)?);
    output[8..16].copy_from_slice(&des_encrypt_block(&second_key, LM_MAGIC)?);
    Ok(output)
}

/// Derives the NT hash (NTOWFv1) of a password.
///
/// The password is encoded as UTF-16 in little-endian byte order (without the Byte Order Mark)
/// and hashed using MD4.
pub fn nt_owf_v1(password: &str) -> [u8; 16] {
    let password_bytes: Zeroizing<Vec<u8>> = Zeroizing::new(
        password.encode_utf16()
            .flat_map(|p| p.to_le_bytes())
            .collect()
    );
    md4(&password_bytes)
}

/// Derives the NTLMv1 session base key from the NT hash.
pub fn session_base_key_v1(nt_hash: &[u8; 16]) -> [u8; 16] {
    md4(nt_hash)
}

/// Calculates the NTLMv1 LM challenge response from the LM hash.
///
/// The hash is zero-padded to 21 bytes, split into three DES keys, and each of them encrypts the
/// server challenge.
pub fn lm_challenge_response_v1(lm_hash: &[u8; 16], server_challenge: [u8; 8]) -> Result<[u8; 24]> {
    let mut padded = Zeroizing::new([0u8; 21]);
    padded[..16].copy_from_slice(lm_hash);

    let mut ret = [0u8; 24];
    for (i, chunk) in ret.chunks_exact_mut(8).enumerate() {
        let mut key = Zeroizing::new([0u8; 7]);
        key.copy_from_slice(&padded[7*i..7*(i+1)]);
        chunk.copy_from_slice(&des_encrypt_block(&key, server_challenge)?);
    }
    Ok(ret)
}

fn md4(data: &[u8]) -> [u8; 16] {
    let mut md4_state = <Md4 as Digest>::new();
    md4_state.update(data);
    let mut ret = [0u8; 16];
    ret.copy_from_slice(md4_state.finalize().as_slice());
    ret
}


#[cfg(test)]
mod tests {
    use super::*;

    const SERVER_CHALLENGE: [u8; 8] = [0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef];

    #[test]
    fn test_lm_owf_v1() {
        let hash = lm_owf_v1("Password").unwrap();
        assert_eq!(hash.to_vec(), hex::decode("e52cac67419a9a224a3b108f3fa6cb6d").unwrap());
        assert_eq!(lm_owf_v1("PASSWORD").unwrap(), hash);
    }

    #[test]
    fn test_lm_owf_v1_truncates() {
        assert_eq!(
            lm_owf_v1("abcdefghijklmn").unwrap(),
            lm_owf_v1("ABCDEFGHIJKLMNOPQRSTUVWXYZ").unwrap(),
        );
    }

    #[test]
    fn test_nt_owf_v1() {
        let hash = nt_owf_v1("Password");
        assert_eq!(hash.to_vec(), hex::decode("a4f49c406510bdcab6824ee7c30fd852").unwrap());
    }

    #[test]
    fn test_session_base_key_v1() {
        let key = session_base_key_v1(&nt_owf_v1("Password"));
        assert_eq!(key.to_vec(), hex::decode("d87262b0cde4b1cb7499becccdf10784").unwrap());
    }

    #[test]
    fn test_lm_challenge_response_v1() {
        let lm_hash = lm_owf_v1("Password").unwrap();
        let response = lm_challenge_response_v1(&lm_hash, SERVER_CHALLENGE).unwrap();
        assert_eq!(
            response.to_vec(),
            hex::decode("98def7b87f88aa5dafe2df779688a172def11c7d5ccdef13").unwrap(),
        );
    }
}
