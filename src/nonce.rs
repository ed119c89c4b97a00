//! Noise nonce rules:
//! A nonce must never repeat under one key; repeating one is catastrophic.
//! The max value is reserved (it is the rekey nonce), so a counter that reaches it is exhausted.
//!
//! We use rusts type system to keep the counter behind these rules.

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Nonce(u64);

impl Nonce {
    /// Reserved for rekey, never used for a message.
    pub const MAX: u64 = u64::MAX;

    pub fn new() -> Self {
        Self(0)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    pub fn set(&mut self, value: u64) {
        self.0 = value;
    }

    pub fn is_exhausted(self) -> bool {
        self.0 == Self::MAX
    }

    /// The value the next message must use. Fails once the reserved max is reached.
    pub fn current(self) -> Result<u64> {
        if self.is_exhausted() {
            return Err(Error::NonceExhausted);
        }
        Ok(self.0)
    }

    /// Consumes the current value and moves the counter on.
    pub fn harvest(&mut self) -> Result<u64> {
        let n = self.current()?;
        self.0 += 1;
        Ok(n)
    }

    /// RFC 7539 layout used by ChaChaPoly: 32 zero bits, then the counter little-endian.
    pub fn chacha_bytes(n: u64) -> [u8; 12] {
        let mut nonce = [0; 12];
        nonce[4..].copy_from_slice(&n.to_le_bytes());
        nonce
    }

    /// AES-GCM layout: 32 zero bits, then the counter big-endian.
    pub fn aesgcm_bytes(n: u64) -> [u8; 12] {
        let mut nonce = [0; 12];
        nonce[4..].copy_from_slice(&n.to_be_bytes());
        nonce
    }
}
