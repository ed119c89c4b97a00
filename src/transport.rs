//! Post-handshake traffic. Each [`Transport`] owns one direction; [`TransportPair`] holds the
//! directions a side is allowed to use.
//!
//! Reads come in two flavours: in order, where the counter must match and advances on success,
//! and at an explicit nonce, which leaves the counter alone so messages can be processed in any
//! order. Rejecting replays on the explicit path is up to the caller.
use bytes::BytesMut;

use crate::{
    cipher_state::CipherState,
    error::{Error, Result},
    primitives::{Cipher, TAG_LEN},
    protocol::MAX_MESSAGE_LEN,
    segments::Segments,
};

#[derive(Debug)]
pub struct Transport<C> {
    cipher_state: CipherState<C>,
}

impl<C: Cipher> Transport<C> {
    pub(crate) fn new(cipher_state: CipherState<C>) -> Self {
        Self { cipher_state }
    }

    fn check_plaintext(len: usize) -> Result<()> {
        if len + TAG_LEN > MAX_MESSAGE_LEN {
            return Err(Error::MessageTooLong(len + TAG_LEN));
        }
        Ok(())
    }

    fn check_ciphertext(len: usize) -> Result<()> {
        if len > MAX_MESSAGE_LEN {
            return Err(Error::MessageTooLong(len));
        }
        if len < TAG_LEN {
            return Err(Error::MessageTooShort {
                expected: TAG_LEN,
                actual: len,
            });
        }
        Ok(())
    }

    /// Appends `ciphertext || tag` to `out` and returns its length.
    pub fn write_message(&mut self, payload: &[u8], out: &mut BytesMut) -> Result<usize> {
        self.write_message_vectored(&[payload], out)
    }

    pub fn write_message_vectored(
        &mut self,
        payload: &[&[u8]],
        out: &mut BytesMut,
    ) -> Result<usize> {
        self.write_message_with_nonce_vectored(payload, out)
            .map(|(len, _)| len)
    }

    /// Like [`Transport::write_message`], also returning the nonce the message was sealed with
    /// so the receiver can open it out of order.
    pub fn write_message_with_nonce(
        &mut self,
        payload: &[u8],
        out: &mut BytesMut,
    ) -> Result<(usize, u64)> {
        self.write_message_with_nonce_vectored(&[payload], out)
    }

    pub fn write_message_with_nonce_vectored(
        &mut self,
        payload: &[&[u8]],
        out: &mut BytesMut,
    ) -> Result<(usize, u64)> {
        let payload = Segments::new(payload);
        Self::check_plaintext(payload.len())?;
        self.cipher_state.encrypt_with_ad(&[], &payload, out)
    }

    /// In-order read; the nonce only advances when the message authenticates.
    pub fn read_message(&mut self, message: &[u8], out: &mut BytesMut) -> Result<usize> {
        self.read_message_vectored(&[message], out)
    }

    pub fn read_message_vectored(
        &mut self,
        message: &[&[u8]],
        out: &mut BytesMut,
    ) -> Result<usize> {
        let message = Segments::new(message);
        Self::check_ciphertext(message.len())?;
        self.cipher_state.decrypt_with_ad(&[], &message, out)
    }

    /// Opens a message sealed at `nonce`, whatever the current counter.
    pub fn read_message_at(&self, nonce: u64, message: &[u8], out: &mut BytesMut) -> Result<usize> {
        self.read_message_at_vectored(nonce, &[message], out)
    }

    pub fn read_message_at_vectored(
        &self,
        nonce: u64,
        message: &[&[u8]],
        out: &mut BytesMut,
    ) -> Result<usize> {
        let message = Segments::new(message);
        Self::check_ciphertext(message.len())?;
        self.cipher_state
            .decrypt_with_nonce_and_ad(nonce, &[], &message, out)
    }

    pub fn rekey(&mut self) -> Result<()> {
        self.cipher_state.rekey()
    }

    pub fn nonce(&self) -> u64 {
        self.cipher_state.nonce()
    }

    pub fn set_nonce(&mut self, nonce: u64) {
        self.cipher_state.set_nonce(nonce);
    }
}

/// The transports one side gets from a completed handshake. One-way patterns give the
/// initiator a sender only and the responder a receiver only.
#[derive(Debug)]
pub struct TransportPair<C> {
    send: Option<Transport<C>>,
    recv: Option<Transport<C>>,
    one_way: bool,
}

impl<C: Cipher> TransportPair<C> {
    /// `c1` protects traffic from the party that sent the first handshake message.
    pub(crate) fn new(
        first_sender: bool,
        c1: CipherState<C>,
        c2: CipherState<C>,
        one_way: bool,
    ) -> Self {
        let (send, recv) = if first_sender { (c1, c2) } else { (c2, c1) };
        let (send, recv) = match (one_way, first_sender) {
            (false, _) => (Some(send), Some(recv)),
            (true, true) => (Some(send), None),
            (true, false) => (None, Some(recv)),
        };
        Self {
            send: send.map(Transport::new),
            recv: recv.map(Transport::new),
            one_way,
        }
    }

    pub fn is_one_way(&self) -> bool {
        self.one_way
    }

    pub fn sender(&mut self) -> Result<&mut Transport<C>> {
        self.send.as_mut().ok_or(Error::OneWay)
    }

    pub fn receiver(&mut self) -> Result<&mut Transport<C>> {
        self.recv.as_mut().ok_or(Error::OneWay)
    }

    pub fn write_message(&mut self, payload: &[u8], out: &mut BytesMut) -> Result<usize> {
        self.sender()?.write_message(payload, out)
    }

    pub fn write_message_vectored(
        &mut self,
        payload: &[&[u8]],
        out: &mut BytesMut,
    ) -> Result<usize> {
        self.sender()?.write_message_vectored(payload, out)
    }

    pub fn write_message_with_nonce(
        &mut self,
        payload: &[u8],
        out: &mut BytesMut,
    ) -> Result<(usize, u64)> {
        self.sender()?.write_message_with_nonce(payload, out)
    }

    pub fn read_message(&mut self, message: &[u8], out: &mut BytesMut) -> Result<usize> {
        self.receiver()?.read_message(message, out)
    }

    pub fn read_message_vectored(
        &mut self,
        message: &[&[u8]],
        out: &mut BytesMut,
    ) -> Result<usize> {
        self.receiver()?.read_message_vectored(message, out)
    }

    pub fn read_message_at(
        &mut self,
        nonce: u64,
        message: &[u8],
        out: &mut BytesMut,
    ) -> Result<usize> {
        self.receiver()?.read_message_at(nonce, message, out)
    }

    /// Splits into the send and receive halves so each can move to its own thread.
    pub fn into_parts(self) -> (Option<Transport<C>>, Option<Transport<C>>) {
        (self.send, self.recv)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::primitives::ChaChaPoly;

    fn states() -> (CipherState<ChaChaPoly>, CipherState<ChaChaPoly>) {
        let mut c1 = CipherState::new();
        let mut c2 = CipherState::new();
        c1.initialize_key(&[1; 32]);
        c2.initialize_key(&[2; 32]);
        (c1, c2)
    }

    fn pairs(one_way: bool) -> (TransportPair<ChaChaPoly>, TransportPair<ChaChaPoly>) {
        let (a1, a2) = states();
        let (b1, b2) = states();
        (
            TransportPair::new(true, a1, a2, one_way),
            TransportPair::new(false, b1, b2, one_way),
        )
    }

    #[test]
    fn both_directions() {
        let (mut alice, mut bob) = pairs(false);
        let mut wire = BytesMut::new();
        let mut out = BytesMut::new();

        alice.write_message(b"ping", &mut wire).unwrap();
        bob.read_message(&wire, &mut out).unwrap();
        assert_eq!(&out[..], b"ping");

        wire.clear();
        out.clear();
        bob.write_message_vectored(&[b"po".as_slice(), b"ng"], &mut wire)
            .unwrap();
        alice.read_message(&wire, &mut out).unwrap();
        assert_eq!(&out[..], b"pong");
    }

    #[test]
    fn one_way_halves() {
        let (mut alice, mut bob) = pairs(true);
        assert!(alice.is_one_way());
        let mut wire = BytesMut::new();
        let mut out = BytesMut::new();
        alice.write_message(b"only", &mut wire).unwrap();
        bob.read_message(&wire, &mut out).unwrap();

        assert_eq!(alice.read_message(&wire, &mut out), Err(Error::OneWay));
        assert_eq!(bob.write_message(b"no", &mut wire), Err(Error::OneWay));
        let (send, recv) = bob.into_parts();
        assert!(send.is_none() && recv.is_some());
    }

    #[test]
    fn reverse_order_reads() {
        let (mut alice, mut bob) = pairs(false);
        let sent: Vec<(BytesMut, u64)> = (0u8..5)
            .map(|i| {
                let mut wire = BytesMut::new();
                let (_, nonce) = alice.write_message_with_nonce(&[i; 10], &mut wire).unwrap();
                (wire, nonce)
            })
            .collect();

        for (i, (wire, nonce)) in sent.iter().enumerate().rev() {
            assert_eq!(*nonce, i as u64);
            let mut out = BytesMut::new();
            bob.read_message_at(*nonce, wire, &mut out).unwrap();
            assert_eq!(&out[..], &[i as u8; 10]);
        }
        assert_eq!(bob.receiver().unwrap().nonce(), 0);
    }

    #[test]
    fn length_limits() {
        let (mut alice, mut bob) = pairs(false);
        let mut wire = BytesMut::new();
        let big = vec![0; MAX_MESSAGE_LEN - TAG_LEN + 1];
        assert_eq!(
            alice.write_message(&big, &mut wire),
            Err(Error::MessageTooLong(MAX_MESSAGE_LEN + 1))
        );
        assert!(wire.is_empty());
        alice
            .write_message(&big[..MAX_MESSAGE_LEN - TAG_LEN], &mut wire)
            .unwrap();
        assert_eq!(wire.len(), MAX_MESSAGE_LEN);

        let mut out = BytesMut::new();
        assert_eq!(
            bob.read_message(&[0; 15], &mut out),
            Err(Error::MessageTooShort {
                expected: 16,
                actual: 15
            })
        );
    }

    #[test]
    fn rekey_in_step() {
        let (mut alice, mut bob) = pairs(false);
        alice.sender().unwrap().rekey().unwrap();
        bob.receiver().unwrap().rekey().unwrap();

        let mut wire = BytesMut::new();
        let mut out = BytesMut::new();
        alice.write_message(b"after rekey", &mut wire).unwrap();
        bob.read_message(&wire, &mut out).unwrap();
        assert_eq!(&out[..], b"after rekey");
    }
}
