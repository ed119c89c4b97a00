//! Noise Protocol Framework handshakes and transport encryption.
//!
//! A [`Protocol`] names a pattern, its modifiers and the three primitives. It creates a
//! [`HandshakeState`] per side; the sides trade handshake messages until the last one yields a
//! [`TransportPair`] for ongoing traffic.
//!
//! ```
//! use bytes::BytesMut;
//! use noisette::{
//!     Blake2s, ChaChaPoly, Curve25519, HandshakePattern, PatternModifiers, Protocol,
//! };
//!
//! let protocol = Protocol::<ChaChaPoly, Curve25519, Blake2s>::new(
//!     HandshakePattern::NN,
//!     PatternModifiers::NONE,
//! )?;
//! let mut alice = protocol.create_handshake_state(true, b"prologue", None, None, &[])?;
//! let mut bob = protocol.create_handshake_state(false, b"prologue", None, None, &[])?;
//!
//! let (mut wire, mut payload) = (BytesMut::new(), BytesMut::new());
//! alice.write_message(b"", &mut wire)?;
//! bob.read_message(&wire, &mut payload)?;
//!
//! wire.clear();
//! let bob_done = bob.write_message(b"", &mut wire)?;
//! let alice_done = alice.read_message(&wire, &mut payload)?;
//! assert_eq!(alice_done.handshake_hash, bob_done.handshake_hash);
//!
//! let (mut to_bob, mut to_alice) = (alice_done.transport.unwrap(), bob_done.transport.unwrap());
//! wire.clear();
//! to_bob.write_message(b"hello", &mut wire)?;
//! to_alice.read_message(&wire, &mut payload)?;
//! assert_eq!(&payload[..], b"hello");
//! # Ok::<(), noisette::Error>(())
//! ```

/// A key and a nonce. One drives the handshake; each transport direction gets one from `Split`.
pub mod cipher_state;
pub mod error;
pub mod hkdf;
/// Drives the token script of a pattern, owns the DH keys.
/// Dropped (and zeroed) once the handshake is complete.
pub mod hs_state;
pub mod nonce;
pub mod pattern;
pub mod primitives;
pub mod protocol;
pub mod segments;
/// Contains cipher_state + ck and h variables. Each party's sole symm_state encapsulates the
/// "symmetric cryptography" used by Noise.
/// Deleted once handshake is complete.
pub mod symm_state;
pub mod transport;

pub use cipher_state::CipherState;
pub use error::{Error, Result};
pub use hs_state::{HandshakeOutput, HandshakeState};
pub use pattern::{HandshakePattern, PatternModifiers, Role, Token};
pub use primitives::{
    AesGcm, Blake2b, Blake2s, ChaChaPoly, Cipher, Curve25519, Dh, Hash, KeyPair, Sha256, Sha512,
    KEY_LEN, TAG_LEN,
};
pub use protocol::{Protocol, ProtocolConfig, MAX_MESSAGE_LEN, MAX_PROTOCOL_NAME_LEN, PSK_LEN};
pub use transport::{Transport, TransportPair};
