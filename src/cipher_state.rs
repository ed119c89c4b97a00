//! A key and a nonce counter. Before the first `MixKey` there is no key and encryption is the
//! identity; after it every message is sealed at the counter, which then moves on.
use std::{fmt, marker::PhantomData};

use bytes::BytesMut;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    error::{Error, Result},
    nonce::Nonce,
    primitives::{Cipher, KEY_LEN},
    segments::Segments,
};

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
struct CipherKey([u8; KEY_LEN]);

pub struct CipherState<C> {
    key: Option<CipherKey>,
    nonce: Nonce,
    cipher: PhantomData<fn() -> C>,
}

impl<C> Default for CipherState<C> {
    fn default() -> Self {
        Self {
            key: None,
            nonce: Nonce::new(),
            cipher: PhantomData,
        }
    }
}

impl<C> fmt::Debug for CipherState<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherState")
            .field("has_key", &self.key.is_some())
            .field("nonce", &self.nonce)
            .finish()
    }
}

impl<C: Cipher> CipherState<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `key` and resets the counter to 0.
    pub fn initialize_key(&mut self, key: &[u8; KEY_LEN]) {
        self.key = Some(CipherKey(*key));
        self.nonce = Nonce::new();
    }

    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    pub fn nonce(&self) -> u64 {
        self.nonce.value()
    }

    pub fn set_nonce(&mut self, nonce: u64) {
        self.nonce.set(nonce);
    }

    /// Appends the ciphertext (or the plaintext, while there is no key) to `out`. Returns the
    /// bytes written and the nonce used. Only a keyed encryption advances the counter.
    pub fn encrypt_with_ad(
        &mut self,
        ad: &[u8],
        plaintext: &Segments<'_>,
        out: &mut BytesMut,
    ) -> Result<(usize, u64)> {
        let nonce = self.nonce.current()?;
        let Some(key) = &self.key else {
            plaintext.gather_into(out);
            return Ok((plaintext.len(), nonce));
        };
        let written = C::encrypt(&key.0, nonce, ad, plaintext, out);
        self.nonce.harvest()?;
        Ok((written, nonce))
    }

    /// Decrypts at the counter. The counter only advances when the tag verifies.
    pub fn decrypt_with_ad(
        &mut self,
        ad: &[u8],
        ciphertext: &Segments<'_>,
        out: &mut BytesMut,
    ) -> Result<usize> {
        let nonce = self.nonce.current()?;
        let Some(key) = &self.key else {
            ciphertext.gather_into(out);
            return Ok(ciphertext.len());
        };
        let read = C::decrypt(&key.0, nonce, ad, ciphertext, out)?;
        self.nonce.harvest()?;
        Ok(read)
    }

    /// Decrypts at an explicit nonce, leaving the counter untouched.
    pub fn decrypt_with_nonce_and_ad(
        &self,
        nonce: u64,
        ad: &[u8],
        ciphertext: &Segments<'_>,
        out: &mut BytesMut,
    ) -> Result<usize> {
        if nonce == Nonce::MAX {
            return Err(Error::NonceExhausted);
        }
        let Some(key) = &self.key else {
            ciphertext.gather_into(out);
            return Ok(ciphertext.len());
        };
        C::decrypt(&key.0, nonce, ad, ciphertext, out)
    }

    /// One way ratchet of the key. The counter is kept.
    pub fn rekey(&mut self) -> Result<()> {
        let key = self.key.as_mut().ok_or(Error::NoKey)?;
        let mut next = C::rekey(&key.0);
        key.0.copy_from_slice(&next);
        next.zeroize();
        Ok(())
    }
}
