//! Codec property tests.
//!
//! Frames must survive encode/decode for any payload, sequence id and key
//! state, and a corrupted frame must never decode to a different payload.

use botwire::codec::crypto::{EphemeralKeys, SessionKey};
use botwire::codec::{decode_frame, DecodeError, FrameCodec, LENGTH_PREFIX_SIZE};
use botwire::protocol::{ProtocolMessage, PushNotice};
use proptest::prelude::*;

fn session_pair(uin: u64) -> (SessionKey, SessionKey) {
    let bot = EphemeralKeys::generate();
    let server = EphemeralKeys::generate();
    let (bot_public, server_public) = (bot.public_key(), server.public_key());
    let bot_key = SessionKey::derive(&bot.agree(&server_public).unwrap(), uin).unwrap();
    let server_key = SessionKey::derive(&server.agree(&bot_public).unwrap(), uin).unwrap();
    (bot_key, server_key)
}

proptest! {
    #[test]
    fn prop_plain_frames_roundtrip(
        seq in any::<u32>(),
        payload in prop::collection::vec(any::<u8>(), 0..2048),
        threshold in 0usize..1024,
    ) {
        let codec = FrameCodec::new(threshold);
        let frame = codec.encode(seq, &payload, None).unwrap();
        let decoded = codec.decode(&frame, None).unwrap();
        prop_assert_eq!(decoded.sequence, seq);
        prop_assert_eq!(decoded.payload, payload);
    }

    #[test]
    fn prop_encrypted_frames_roundtrip(
        seq in any::<u32>(),
        payload in prop::collection::vec(any::<u8>(), 0..2048),
        key_bytes in any::<[u8; 32]>(),
    ) {
        let key = SessionKey::from_bytes(key_bytes);
        let codec = FrameCodec::default();
        let frame = codec.encode(seq, &payload, Some(&key)).unwrap();
        let decoded = codec.decode(&frame, Some(&key)).unwrap();
        prop_assert!(decoded.flags.is_encrypted());
        prop_assert_eq!(decoded.sequence, seq);
        prop_assert_eq!(decoded.payload, payload);
    }

    #[test]
    fn prop_bit_flip_never_yields_other_payload(
        payload in prop::collection::vec(any::<u8>(), 1..256),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let key = SessionKey::from_bytes([3u8; 32]);
        let mut frame = FrameCodec::default().encode(1, &payload, Some(&key)).unwrap();
        // Leave the length prefix intact so the damage reaches the header or body
        let i = LENGTH_PREFIX_SIZE + position.index(frame.len() - LENGTH_PREFIX_SIZE);
        frame[i] ^= 1 << bit;

        prop_assert!(decode_frame(&frame, Some(&key)).is_err());
    }
}

/// Test both sides of the key agreement derive the same session key
#[test]
fn test_key_agreement_is_symmetric() {
    let (bot_key, server_key) = session_pair(10_001);
    assert_eq!(bot_key.as_bytes(), server_key.as_bytes());

    let frame = FrameCodec::default()
        .encode(7, b"hello", Some(&bot_key))
        .unwrap();
    let (seq, payload) = decode_frame(&frame, Some(&server_key)).unwrap();
    assert_eq!(seq, 7);
    assert_eq!(payload, b"hello");
}

/// Test session keys are bound to the account uin
#[test]
fn test_session_key_bound_to_uin() {
    let bot = EphemeralKeys::generate();
    let server = EphemeralKeys::generate();
    let shared = bot.agree(&server.public_key()).unwrap();
    let a = SessionKey::derive(&shared, 1).unwrap();
    let b = SessionKey::derive(&shared, 2).unwrap();

    let frame = FrameCodec::default().encode(1, b"x", Some(&a)).unwrap();
    assert!(matches!(
        decode_frame(&frame, Some(&b)),
        Err(DecodeError::Decryption(_))
    ));
}

/// Test protocol messages survive the full body and frame path
#[test]
fn test_protocol_message_through_frame() {
    let (bot_key, server_key) = session_pair(10_001);
    let codec = FrameCodec::new(64);

    let messages = vec![
        ProtocolMessage::Heartbeat,
        ProtocolMessage::Error {
            code: 500,
            message: "x".repeat(300),
        },
        ProtocolMessage::Push {
            notice: PushNotice::MemberCardChanged {
                group_id: 500,
                member_id: 30_001,
                card: "card".to_string(),
                operator_id: 30_002,
            },
        },
    ];

    for (seq, message) in messages.into_iter().enumerate() {
        let body = message.to_bytes().unwrap();
        let frame = codec.encode(seq as u32, &body, Some(&bot_key)).unwrap();
        let decoded = codec.decode(&frame, Some(&server_key)).unwrap();
        assert_eq!(decoded.sequence, seq as u32);
        assert_eq!(ProtocolMessage::from_bytes(&decoded.payload).unwrap(), message);
    }
}

/// Test an encrypted frame cannot be read as a plain one
#[test]
fn test_encrypted_frame_requires_key() {
    let key = SessionKey::from_bytes([5u8; 32]);
    let frame = FrameCodec::default().encode(1, b"secret", Some(&key)).unwrap();
    assert!(matches!(
        decode_frame(&frame, None),
        Err(DecodeError::Decryption(_))
    ));
}
