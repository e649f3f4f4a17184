use ntlmseal::{Error, Flags, Role, SecuritySession};


const SERVER_CHALLENGE: [u8; 8] = [0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef];


fn utf16_le(s: &str) -> Vec<u8> {
    s.encode_utf16()
        .flat_map(|w| w.to_le_bytes())
        .collect()
}

fn exchange(client: &mut SecuritySession, server: &mut SecuritySession, rounds: u32) {
    let client_send = client.next_send_sequence();
    let client_receive = client.next_receive_sequence();
    let server_send = server.next_send_sequence();
    let server_receive = server.next_receive_sequence();

    for round in 0..rounds {
        let request = format!("request {}", round).into_bytes();
        let (sealed, signature) = client.wrap(&request).unwrap();
        assert_ne!(sealed, request);
        assert_eq!(server.unwrap(&sealed, &signature.to_bytes()).unwrap(), request);

        let response = utf16_le(&format!("response {}", round));
        let (sealed, signature) = server.wrap(&response).unwrap();
        assert_eq!(client.unwrap(&sealed, &signature.to_bytes()).unwrap(), response);
    }
    assert_eq!(client.next_send_sequence(), client_send + rounds);
    assert_eq!(server.next_receive_sequence(), server_receive + rounds);
    assert_eq!(server.next_send_sequence(), server_send + rounds);
    assert_eq!(client.next_receive_sequence(), client_receive + rounds);
}


#[test]
fn reference_session_vector() {
    let flags = Flags::decode(0xe202_8233);
    let secret = [0x55u8; 16];
    let mut client = SecuritySession::new(flags, &secret, Role::Initiator).unwrap();
    let mut server = SecuritySession::new(flags, &secret, Role::Responder).unwrap();

    let (sealed, signature) = client.wrap(&utf16_le("Plaintext")).unwrap();
    assert_eq!(hex::encode(&sealed), "56fe04d861f9319af0d7238a2e3b4d457fb8");
    assert_eq!(hex::encode(signature.to_bytes()), "010000000000000009dcd1df2e459d36");

    let plaintext = server.unwrap(&sealed, &signature.to_bytes()).unwrap();
    assert_eq!(plaintext, utf16_le("Plaintext"));
}

#[test]
fn lm_key_exchange_with_encrypted_session_key() {
    let flags
        = Flags::NEGOTIATE_UNICODE
        | Flags::NEGOTIATE_SIGN
        | Flags::NEGOTIATE_SEAL
        | Flags::NEGOTIATE_LM_KEY
        | Flags::NEGOTIATE_NTLM
        | Flags::NEGOTIATE_KEY_EXCH
        | Flags::NEGOTIATE_56
        ;

    // both sides know the password hashes; the client also picks the exported session key
    let lm_hash = ntlmseal::lm_owf_v1("Password").unwrap();
    let lm_response = ntlmseal::lm_challenge_response_v1(&lm_hash, SERVER_CHALLENGE).unwrap();
    let session_base_key = ntlmseal::session_base_key_v1(&ntlmseal::nt_owf_v1("Password"));
    let key_exchange_key = ntlmseal::exchange_key(
        flags, &session_base_key, &lm_hash, &lm_response, &SERVER_CHALLENGE,
    ).unwrap();
    assert_eq!(hex::encode(key_exchange_key), "b09e379f7fbecb1eaf0afdcb0383c8a0");

    let exported_session_key = [0x55u8; 16];
    let encrypted = ntlmseal::encrypt_session_key(&key_exchange_key, &exported_session_key).unwrap();
    assert_eq!(hex::encode(encrypted), "4cd7bb57d697ef9b549f02b8f9b37864");
    let recovered = ntlmseal::decrypt_session_key(&key_exchange_key, &encrypted).unwrap();
    assert_eq!(recovered, exported_session_key);

    let sealing_key = ntlmseal::seal_key(flags, &recovered, ntlmseal::CLIENT_SEALING).unwrap();
    assert_eq!(sealing_key.len(), 8);

    let mut client = SecuritySession::new(flags, &exported_session_key, Role::Initiator).unwrap();
    let mut server = SecuritySession::new(flags, &recovered, Role::Responder).unwrap();
    exchange(&mut client, &mut server, 5);
}

#[test]
fn extended_session_security_v1() {
    let flags = Flags::decode(0x820a_8233);
    let mut lm_response = [0u8; 24];
    lm_response[..8].copy_from_slice(&[0xaa; 8]);

    let session_base_key = ntlmseal::session_base_key_v1(&ntlmseal::nt_owf_v1("Password"));
    let exported_session_key = ntlmseal::exchange_key(
        flags, &session_base_key, &[], &lm_response, &SERVER_CHALLENGE,
    ).unwrap();

    let mut client = SecuritySession::new(flags, &exported_session_key, Role::Initiator).unwrap();
    let mut server = SecuritySession::new(flags, &exported_session_key, Role::Responder).unwrap();

    let (sealed, signature) = client.wrap(&utf16_le("Plaintext")).unwrap();
    assert_eq!(hex::encode(&sealed), "a02372f6530273f3aa1eb90190ce5200c99d");
    assert_eq!(hex::encode(signature.to_bytes()), "01000000ff2aeb52f681793a00000000");
    assert_eq!(server.unwrap(&sealed, &signature.to_bytes()).unwrap(), utf16_le("Plaintext"));

    exchange(&mut client, &mut server, 3);
}

#[test]
fn mismatched_secrets_never_verify() {
    let flags = Flags::decode(0xe28a_8234);
    let mut client = SecuritySession::new(flags, &[0x55; 16], Role::Initiator).unwrap();
    let mut server = SecuritySession::new(flags, &[0x56; 16], Role::Responder).unwrap();

    let (sealed, signature) = client.wrap(b"hello").unwrap();
    let err = server.unwrap(&sealed, &signature.to_bytes()).unwrap_err();
    assert_eq!(err, Error::IntegrityFailure { sequence_number: 0 });
    assert!(err.is_recoverable());
    assert_eq!(server.next_receive_sequence(), 0);
}

#[test]
fn same_role_cannot_talk() {
    let flags = Flags::decode(0xe28a_8234);
    let mut first = SecuritySession::new(flags, &[0x55; 16], Role::Initiator).unwrap();
    let mut second = SecuritySession::new(flags, &[0x55; 16], Role::Initiator).unwrap();

    let (sealed, signature) = first.wrap(b"hello").unwrap();
    assert!(second.unwrap(&sealed, &signature.to_bytes()).is_err());
}

#[test]
fn session_reports_configuration() {
    let flags = Flags::decode(0xe202_b232);
    let session = SecuritySession::new(flags, &[0x11; 16], Role::Responder).unwrap();
    assert_eq!(session.flags(), flags);
    assert_eq!(session.role(), Role::Responder);
    assert!(session.flags().to_string().starts_with("NTLM_NEGOTIATE_OEM | NTLMSSP_NEGOTIATE_SIGN"));
}
