mod common;

use bytes::BytesMut;
use common::run_handshake;
use noisette::{
    Blake2b, ChaChaPoly, Curve25519, Dh, Error, HandshakePattern, PatternModifiers, Protocol,
};

#[test]
fn ikpsk2_transport_read_in_reverse() {
    let psk = [0u8; 32];
    let initiator_static = Curve25519::generate_keypair();
    let responder_static = Curve25519::generate_keypair();

    let protocol = Protocol::<ChaChaPoly, Curve25519, Blake2b>::new(
        HandshakePattern::IK,
        PatternModifiers::PSK2,
    )
    .unwrap();
    assert_eq!(protocol.name(), "Noise_IKpsk2_25519_ChaChaPoly_BLAKE2b");

    let identifier = b"out-of-order test";
    let mut initiator = protocol
        .create_handshake_state(
            true,
            identifier,
            Some(initiator_static.private_key()),
            Some(responder_static.public_key()),
            &[psk.as_slice()],
        )
        .unwrap();
    let mut responder = protocol
        .create_handshake_state(
            false,
            identifier,
            Some(responder_static.private_key()),
            None,
            &[psk.as_slice()],
        )
        .unwrap();

    let mut done = run_handshake(&mut initiator, &mut responder).unwrap();
    assert_eq!(done.initiator_hash, done.responder_hash);

    let sent: Vec<(BytesMut, u64)> = (0..5)
        .map(|i| {
            let mut wire = BytesMut::new();
            let (len, nonce) = done
                .initiator
                .write_message_with_nonce(format!("message {i}").as_bytes(), &mut wire)
                .unwrap();
            assert_eq!(len, wire.len());
            (wire, nonce)
        })
        .collect();
    assert_eq!(
        sent.iter().map(|(_, n)| *n).collect::<Vec<_>>(),
        vec![0, 1, 2, 3, 4]
    );

    for (i, (wire, nonce)) in sent.iter().enumerate().rev() {
        let mut out = BytesMut::new();
        done.responder
            .read_message_at(*nonce, wire, &mut out)
            .unwrap();
        assert_eq!(&out[..], format!("message {i}").as_bytes());
    }

    // explicit-nonce reads leave the ordered counter where it was
    let receiver = done.responder.receiver().unwrap();
    assert_eq!(receiver.nonce(), 0);
    let mut out = BytesMut::new();
    for (i, (wire, _)) in sent.iter().enumerate() {
        out.clear();
        receiver.read_message(wire, &mut out).unwrap();
        assert_eq!(&out[..], format!("message {i}").as_bytes());
    }

    // wrong nonce never authenticates
    assert_eq!(
        receiver.read_message_at(3, &sent[2].0, &mut out),
        Err(Error::Decrypt)
    );
}

#[test]
fn set_nonce_skips_lost_messages() {
    let protocol = Protocol::<ChaChaPoly, Curve25519, Blake2b>::new(
        HandshakePattern::NN,
        PatternModifiers::NONE,
    )
    .unwrap();
    let mut alice = protocol
        .create_handshake_state(true, b"", None, None, &[])
        .unwrap();
    let mut bob = protocol
        .create_handshake_state(false, b"", None, None, &[])
        .unwrap();
    let mut done = run_handshake(&mut alice, &mut bob).unwrap();

    let mut lost = BytesMut::new();
    done.initiator.write_message(b"lost", &mut lost).unwrap();
    let mut wire = BytesMut::new();
    done.initiator.write_message(b"kept", &mut wire).unwrap();

    let receiver = done.responder.receiver().unwrap();
    let mut out = BytesMut::new();
    assert_eq!(receiver.read_message(&wire, &mut out), Err(Error::Decrypt));
    receiver.set_nonce(1);
    receiver.read_message(&wire, &mut out).unwrap();
    assert_eq!(&out[..], b"kept");
    assert_eq!(receiver.nonce(), 2);
}
