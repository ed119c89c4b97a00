use aes_gcm::Aes256Gcm;
use chacha20poly1305::{
    aead::{AeadInPlace, KeyInit},
    ChaCha20Poly1305,
};

use super::{Cipher, KEY_LEN, TAG_LEN};
use crate::{
    error::{Error, Result},
    nonce::Nonce,
};

/// AEAD_CHACHA20_POLY1305 from RFC 7539. Nonce is 32 zero bits then the little-endian counter.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChaChaPoly;

/// AES-256-GCM. Nonce is 32 zero bits then the big-endian counter.
#[derive(Clone, Copy, Debug, Default)]
pub struct AesGcm;

impl Cipher for ChaChaPoly {
    const NAME: &'static str = "ChaChaPoly";

    fn encrypt_in_place(
        key: &[u8; KEY_LEN],
        nonce: u64,
        ad: &[u8],
        buffer: &mut [u8],
    ) -> [u8; TAG_LEN] {
        let aead = ChaCha20Poly1305::new(key.into());
        let nonce = Nonce::chacha_bytes(nonce);
        let Ok(tag) = aead.encrypt_in_place_detached(&nonce.into(), ad, buffer) else {
            unreachable!("ChaCha20-Poly1305 only rejects messages beyond 256 GiB");
        };
        tag.into()
    }

    fn decrypt_in_place(
        key: &[u8; KEY_LEN],
        nonce: u64,
        ad: &[u8],
        buffer: &mut [u8],
        tag: &[u8; TAG_LEN],
    ) -> Result<()> {
        let aead = ChaCha20Poly1305::new(key.into());
        let nonce = Nonce::chacha_bytes(nonce);
        aead.decrypt_in_place_detached(&nonce.into(), ad, buffer, tag.into())
            .map_err(|_| Error::Decrypt)
    }
}

impl Cipher for AesGcm {
    const NAME: &'static str = "AESGCM";

    fn encrypt_in_place(
        key: &[u8; KEY_LEN],
        nonce: u64,
        ad: &[u8],
        buffer: &mut [u8],
    ) -> [u8; TAG_LEN] {
        let aead = Aes256Gcm::new(key.into());
        let nonce = Nonce::aesgcm_bytes(nonce);
        let Ok(tag) = aead.encrypt_in_place_detached(&nonce.into(), ad, buffer) else {
            unreachable!("AES-GCM only rejects messages beyond 64 GiB");
        };
        tag.into()
    }

    fn decrypt_in_place(
        key: &[u8; KEY_LEN],
        nonce: u64,
        ad: &[u8],
        buffer: &mut [u8],
        tag: &[u8; TAG_LEN],
    ) -> Result<()> {
        let aead = Aes256Gcm::new(key.into());
        let nonce = Nonce::aesgcm_bytes(nonce);
        aead.decrypt_in_place_detached(&nonce.into(), ad, buffer, tag.into())
            .map_err(|_| Error::Decrypt)
    }
}
