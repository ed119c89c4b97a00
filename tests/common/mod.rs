//! Handshake driver shared by the integration tests.
#![allow(dead_code)]

use bytes::BytesMut;
use noisette::{
    Cipher, Curve25519, Dh, HandshakeState, Hash, KeyPair, Protocol, ProtocolConfig, Result,
    TransportPair,
};

pub struct Peers {
    pub initiator_static: KeyPair,
    pub responder_static: KeyPair,
    pub psks: Vec<[u8; 32]>,
}

impl Peers {
    pub fn generate(psk_count: usize) -> Self {
        Self {
            initiator_static: Curve25519::generate_keypair(),
            responder_static: Curve25519::generate_keypair(),
            psks: (0..psk_count).map(|i| [i as u8 + 1; 32]).collect(),
        }
    }

    /// Exactly the key material `protocol` wants for one side.
    pub fn config<C: Cipher, D: Dh, H: Hash>(
        &self,
        protocol: &Protocol<C, D, H>,
        initiator: bool,
        prologue: &[u8],
    ) -> ProtocolConfig {
        let (local, remote) = if initiator {
            (&self.initiator_static, &self.responder_static)
        } else {
            (&self.responder_static, &self.initiator_static)
        };
        let mut config = if initiator {
            ProtocolConfig::initiator()
        } else {
            ProtocolConfig::responder()
        }
        .with_prologue(prologue);
        if protocol.requires_local_static(initiator) {
            config = config.with_local_static(local.private_key());
        }
        if protocol.requires_remote_static(initiator) {
            config = config.with_remote_static(remote.public_key());
        }
        for psk in &self.psks[..protocol.psk_count()] {
            config = config.with_preshared_key(psk);
        }
        config
    }
}

pub struct Completed<C> {
    pub initiator: TransportPair<C>,
    pub responder: TransportPair<C>,
    pub initiator_hash: Vec<u8>,
    pub responder_hash: Vec<u8>,
    pub messages: usize,
}

/// Runs the handshake to completion, checking every payload arrives intact.
pub fn run_handshake<C: Cipher, D: Dh, H: Hash>(
    initiator: &mut HandshakeState<C, D, H>,
    responder: &mut HandshakeState<C, D, H>,
) -> Result<Completed<C>> {
    let mut messages = 0;
    loop {
        let initiator_writes = initiator.is_my_turn();
        let (writer, reader) = if initiator_writes {
            (&mut *initiator, &mut *responder)
        } else {
            (&mut *responder, &mut *initiator)
        };

        let payload = format!("handshake payload {messages}");
        let mut wire = BytesMut::new();
        let mut out = BytesMut::new();
        let sent = writer.write_message(payload.as_bytes(), &mut wire)?;
        assert_eq!(sent.len, wire.len());
        let received = reader.read_message(&wire, &mut out)?;
        assert_eq!(&out[..], payload.as_bytes());
        assert_eq!(received.len, out.len());
        messages += 1;

        match (sent.transport, received.transport) {
            (None, None) => continue,
            (Some(sender_side), Some(receiver_side)) => {
                let (initiator_side, responder_side) = if initiator_writes {
                    (sender_side, receiver_side)
                } else {
                    (receiver_side, sender_side)
                };
                let (initiator_hash, responder_hash) = if initiator_writes {
                    (sent.handshake_hash, received.handshake_hash)
                } else {
                    (received.handshake_hash, sent.handshake_hash)
                };
                return Ok(Completed {
                    initiator: initiator_side,
                    responder: responder_side,
                    initiator_hash: initiator_hash.unwrap_or_default(),
                    responder_hash: responder_hash.unwrap_or_default(),
                    messages,
                });
            }
            _ => panic!("only one side completed the handshake"),
        }
    }
}

/// Sends `payload` from `from` to `to` in order and returns what arrived.
pub fn transfer<C: Cipher>(
    from: &mut TransportPair<C>,
    to: &mut TransportPair<C>,
    payload: &[u8],
) -> Result<Vec<u8>> {
    let mut wire = BytesMut::new();
    let mut out = BytesMut::new();
    from.write_message(payload, &mut wire)?;
    to.read_message(&wire, &mut out)?;
    Ok(out.to_vec())
}
