//! The three capability contracts the handshake core is generic over, and the bindings this
//! crate ships for them.
//!
//! All three are used through associated functions only, so a `HandshakeState<ChaChaPoly,
//! Curve25519, Blake2s>` is fully monomorphized and the encrypt/decrypt path has no dynamic
//! dispatch. Any other implementation (hardware backed, another curve) plugs in by implementing
//! the trait.

mod cipher;
mod dh;
mod hash;

use std::fmt;

use bytes::BytesMut;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    error::{Error, Result},
    segments::Segments,
};

pub use cipher::{AesGcm, ChaChaPoly};
pub use dh::Curve25519;
pub use hash::{Blake2b, Blake2s, Sha256, Sha512};

/// Symmetric key size for every cipher.
pub const KEY_LEN: usize = 32;
/// AEAD authentication tag size for every cipher.
pub const TAG_LEN: usize = 16;
/// Largest `HASHLEN` of any supported hash.
pub const MAX_HASH_LEN: usize = 64;

/// A DH key pair. Both halves are zeroed when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyPair {
    private: Vec<u8>,
    public: Vec<u8>,
}

impl KeyPair {
    /// For `Dh` implementations; the pair is trusted to be consistent.
    pub fn from_parts(private: Vec<u8>, public: Vec<u8>) -> Self {
        Self { private, public }
    }

    pub fn private_key(&self) -> &[u8] {
        &self.private
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// Diffie-Hellman function. Implementations must be constant time in the private key.
pub trait Dh {
    /// Protocol name tag, e.g. `25519`.
    const NAME: &'static str;
    /// Length of public keys and shared secrets.
    const DH_LEN: usize;

    fn generate_keypair() -> KeyPair;

    fn keypair_from_private(private_key: &[u8]) -> Result<KeyPair>;

    /// Writes `DH_LEN` bytes of shared secret into `out`.
    fn dh(keypair: &KeyPair, public_key: &[u8], out: &mut [u8]) -> Result<()>;
}

/// AEAD cipher keyed with 32 bytes and a 64 bit counter nonce.
pub trait Cipher {
    /// Protocol name tag, e.g. `ChaChaPoly`.
    const NAME: &'static str;

    /// Encrypts `buffer` in place and returns the detached tag.
    fn encrypt_in_place(
        key: &[u8; KEY_LEN],
        nonce: u64,
        ad: &[u8],
        buffer: &mut [u8],
    ) -> [u8; TAG_LEN];

    /// Decrypts `buffer` in place. On `Err(Error::Decrypt)` the buffer content is unspecified
    /// and must not be released.
    fn decrypt_in_place(
        key: &[u8; KEY_LEN],
        nonce: u64,
        ad: &[u8],
        buffer: &mut [u8],
        tag: &[u8; TAG_LEN],
    ) -> Result<()>;

    /// Appends `ciphertext || tag` to `out`, treating the segments as one plaintext. Returns the
    /// number of bytes appended.
    fn encrypt(
        key: &[u8; KEY_LEN],
        nonce: u64,
        ad: &[u8],
        plaintext: &Segments<'_>,
        out: &mut BytesMut,
    ) -> usize {
        let start = out.len();
        plaintext.gather_into(out);
        let tag = Self::encrypt_in_place(key, nonce, ad, &mut out[start..]);
        out.extend_from_slice(&tag);
        out.len() - start
    }

    /// Appends the plaintext of the segmented `ciphertext || tag` to `out`. Nothing is left in
    /// `out` when authentication fails.
    fn decrypt(
        key: &[u8; KEY_LEN],
        nonce: u64,
        ad: &[u8],
        ciphertext: &Segments<'_>,
        out: &mut BytesMut,
    ) -> Result<usize> {
        let total = ciphertext.len();
        if total < TAG_LEN {
            return Err(Error::MessageTooShort {
                expected: TAG_LEN,
                actual: total,
            });
        }
        let (body, tag_part) = ciphertext.split_at(total - TAG_LEN);
        let mut tag = [0; TAG_LEN];
        tag_part.copy_to_slice(&mut tag);

        let start = out.len();
        body.gather_into(out);
        match Self::decrypt_in_place(key, nonce, ad, &mut out[start..], &tag) {
            Ok(()) => Ok(out.len() - start),
            Err(e) => {
                out[start..].zeroize();
                out.truncate(start);
                Err(e)
            }
        }
    }

    /// Noise default REKEY: the first 32 bytes of `ENCRYPT(k, 2^64-1, "", zeros)`.
    fn rekey(key: &[u8; KEY_LEN]) -> [u8; KEY_LEN] {
        let mut next = [0; KEY_LEN];
        let _tag = Self::encrypt_in_place(key, u64::MAX, &[], &mut next);
        next
    }
}

/// Hash function with the HMAC built on it.
pub trait Hash: Default {
    /// Protocol name tag, e.g. `BLAKE2s`.
    const NAME: &'static str;
    const HASH_LEN: usize;
    const BLOCK_LEN: usize;

    fn append_data(&mut self, data: &[u8]);

    /// Writes `HASH_LEN` bytes into `out` and resets the hasher for reuse.
    fn get_hash_and_reset(&mut self, out: &mut [u8]);

    /// `HMAC-HASH(key, data[0] || data[1] || ...)` into `out` (`HASH_LEN` bytes).
    fn hmac(key: &[u8], data: &[&[u8]], out: &mut [u8]);
}
