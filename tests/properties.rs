mod common;

use bytes::BytesMut;
use common::{run_handshake, Completed};
use noisette::{
    ChaChaPoly, Curve25519, Dh, Error, HandshakePattern, PatternModifiers, Protocol, Sha256,
};
use proptest::prelude::*;

fn established() -> Completed<ChaChaPoly> {
    let protocol = Protocol::<ChaChaPoly, Curve25519, Sha256>::new(
        HandshakePattern::NN,
        PatternModifiers::NONE,
    )
    .unwrap();
    let mut alice = protocol
        .create_handshake_state(true, b"properties", None, None, &[])
        .unwrap();
    let mut bob = protocol
        .create_handshake_state(false, b"properties", None, None, &[])
        .unwrap();
    run_handshake(&mut alice, &mut bob).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn transport_delivers_any_payload(payload in prop::collection::vec(any::<u8>(), 0..2048)) {
        let mut done = established();
        let mut wire = BytesMut::new();
        let mut out = BytesMut::new();
        let len = done.initiator.write_message(&payload, &mut wire).unwrap();
        prop_assert_eq!(len, payload.len() + 16);
        done.responder.read_message(&wire, &mut out).unwrap();
        prop_assert_eq!(&out[..], &payload[..]);
    }

    #[test]
    fn any_flipped_bit_is_rejected(
        payload in prop::collection::vec(any::<u8>(), 0..256),
        bit in any::<prop::sample::Index>(),
    ) {
        let mut done = established();
        let mut wire = BytesMut::new();
        done.responder.write_message(&payload, &mut wire).unwrap();

        let i = bit.index(wire.len() * 8);
        wire[i / 8] ^= 1 << (i % 8);
        let mut out = BytesMut::new();
        prop_assert_eq!(done.initiator.read_message(&wire, &mut out), Err(Error::Decrypt));
        prop_assert!(out.is_empty());
    }

    #[test]
    fn nonces_count_up_from_zero(count in 1usize..40) {
        let mut done = established();
        let mut wire = BytesMut::new();
        for expected in 0..count as u64 {
            wire.clear();
            let (_, nonce) = done.initiator.write_message_with_nonce(b"tick", &mut wire).unwrap();
            prop_assert_eq!(nonce, expected);
        }
        prop_assert_eq!(done.initiator.sender().unwrap().nonce(), count as u64);
    }

    #[test]
    fn handshake_payloads_arrive_intact(
        first in prop::collection::vec(any::<u8>(), 0..512),
        second in prop::collection::vec(any::<u8>(), 0..512),
    ) {
        let protocol = Protocol::<ChaChaPoly, Curve25519, Sha256>::new(
            HandshakePattern::NK,
            PatternModifiers::NONE,
        )
        .unwrap();
        let responder_static = Curve25519::generate_keypair();
        let mut alice = protocol
            .create_handshake_state(true, b"", None, Some(responder_static.public_key()), &[])
            .unwrap();
        let mut bob = protocol
            .create_handshake_state(false, b"", Some(responder_static.private_key()), None, &[])
            .unwrap();

        let mut wire = BytesMut::new();
        let mut out = BytesMut::new();
        alice.write_message(&first, &mut wire).unwrap();
        // e plus an encrypted payload, since es keys the first message
        prop_assert_eq!(wire.len(), 32 + first.len() + 16);
        bob.read_message(&wire, &mut out).unwrap();
        prop_assert_eq!(&out[..], &first[..]);

        wire.clear();
        out.clear();
        bob.write_message(&second, &mut wire).unwrap();
        let done = alice.read_message(&wire, &mut out).unwrap();
        prop_assert_eq!(&out[..], &second[..]);
        prop_assert!(done.transport.is_some());
    }
}
