use std::fmt;

use bytes::BytesMut;
use zeroize::Zeroize;

use crate::{
    cipher_state::CipherState,
    error::Result,
    hkdf::hkdf,
    primitives::{Cipher, Hash, KEY_LEN, MAX_HASH_LEN},
    segments::Segments,
};

/// Chaining key, transcript hash and the handshake cipher. Only the first `H::HASH_LEN` bytes of
/// `chaining_key` and `output_hash` are live.
pub struct SymmState<C, H> {
    cipher_state: CipherState<C>,
    chaining_key: [u8; MAX_HASH_LEN],
    output_hash: [u8; MAX_HASH_LEN],
    hasher: H,
}

impl<C, H> Drop for SymmState<C, H> {
    fn drop(&mut self) {
        self.chaining_key.zeroize();
        self.output_hash.zeroize();
    }
}

impl<C, H> fmt::Debug for SymmState<C, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmState")
            .field("cipher_state", &self.cipher_state)
            .finish_non_exhaustive()
    }
}

fn first_key(block: &[u8; MAX_HASH_LEN]) -> [u8; KEY_LEN] {
    let mut key = [0; KEY_LEN];
    key.copy_from_slice(&block[..KEY_LEN]);
    key
}

impl<C: Cipher, H: Hash> SymmState<C, H> {
    /// `h` is the name zero padded to `HASHLEN`, or its hash when it is longer. `ck = h`.
    pub fn init(proto_name: &[u8]) -> Self {
        let mut hasher = H::default();
        let mut init_state = [0; MAX_HASH_LEN];
        if proto_name.len() > H::HASH_LEN {
            hasher.append_data(proto_name);
            hasher.get_hash_and_reset(&mut init_state[..H::HASH_LEN]);
        } else {
            init_state[..proto_name.len()].copy_from_slice(proto_name);
        }

        Self {
            cipher_state: CipherState::new(),
            chaining_key: init_state,
            output_hash: init_state,
            hasher,
        }
    }

    pub fn mix_key(&mut self, input: &[u8]) {
        let len = H::HASH_LEN;
        let out = hkdf::<H>(&self.chaining_key[..len], input, 2);
        self.chaining_key = out[0];
        let mut key = first_key(&out[1]);
        self.cipher_state.initialize_key(&key);
        key.zeroize();
    }

    pub fn mix_hash(&mut self, data: &[u8]) {
        self.mix_hash_segments(&Segments::single(data));
    }

    /// `h = HASH(h || s0 || s1 || ...)` without joining the segments first.
    pub fn mix_hash_segments(&mut self, data: &Segments<'_>) {
        let len = H::HASH_LEN;
        self.hasher.append_data(&self.output_hash[..len]);
        for part in data.iter() {
            self.hasher.append_data(part);
        }
        self.hasher.get_hash_and_reset(&mut self.output_hash[..len]);
    }

    pub fn mix_key_and_hash(&mut self, input: &[u8]) {
        let len = H::HASH_LEN;
        let out = hkdf::<H>(&self.chaining_key[..len], input, 3);
        self.chaining_key = out[0];
        self.mix_hash(&out[1][..len]);
        let mut key = first_key(&out[2]);
        self.cipher_state.initialize_key(&key);
        key.zeroize();
    }

    pub fn has_key(&self) -> bool {
        self.cipher_state.has_key()
    }

    /// Encrypts with `h` as associated data and mixes the produced bytes into `h`.
    pub fn encrypt_and_hash(
        &mut self,
        plaintext: &Segments<'_>,
        out: &mut BytesMut,
    ) -> Result<(usize, u64)> {
        let len = H::HASH_LEN;
        let start = out.len();
        let (written, nonce) =
            self.cipher_state
                .encrypt_with_ad(&self.output_hash[..len], plaintext, out)?;
        let produced = &out[start..start + written];
        self.hasher.append_data(&self.output_hash[..len]);
        self.hasher.append_data(produced);
        self.hasher.get_hash_and_reset(&mut self.output_hash[..len]);
        Ok((written, nonce))
    }

    /// Decrypts with `h` as associated data. `h` absorbs the ciphertext only once it has
    /// authenticated, so a failed attempt leaves the transcript as it was.
    pub fn decrypt_and_hash(
        &mut self,
        ciphertext: &Segments<'_>,
        out: &mut BytesMut,
    ) -> Result<usize> {
        let len = H::HASH_LEN;
        let read = self
            .cipher_state
            .decrypt_with_ad(&self.output_hash[..len], ciphertext, out)?;
        self.mix_hash_segments(ciphertext);
        Ok(read)
    }

    /// `decrypt_and_hash` at an explicit nonce; the cipher counter is not touched.
    pub fn decrypt_and_hash_at(
        &mut self,
        nonce: u64,
        ciphertext: &Segments<'_>,
        out: &mut BytesMut,
    ) -> Result<usize> {
        let len = H::HASH_LEN;
        let read = self.cipher_state.decrypt_with_nonce_and_ad(
            nonce,
            &self.output_hash[..len],
            ciphertext,
            out,
        )?;
        self.mix_hash_segments(ciphertext);
        Ok(read)
    }

    /// Derives the two transport cipher states: the first for initiator to responder traffic.
    pub fn split(&self) -> (CipherState<C>, CipherState<C>) {
        let len = H::HASH_LEN;
        let out = hkdf::<H>(&self.chaining_key[..len], &[], 2);
        let mut k1 = first_key(&out[0]);
        let mut k2 = first_key(&out[1]);
        let mut c1 = CipherState::new();
        let mut c2 = CipherState::new();
        c1.initialize_key(&k1);
        c2.initialize_key(&k2);
        k1.zeroize();
        k2.zeroize();
        (c1, c2)
    }

    pub fn handshake_hash(&self) -> &[u8] {
        &self.output_hash[..H::HASH_LEN]
    }
}
