use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use super::{Dh, KeyPair};
use crate::error::{Error, Result};

/// X25519 from RFC 7748, using x25519-dalek.
#[derive(Clone, Copy, Debug, Default)]
pub struct Curve25519;

const DH_LEN: usize = 32;

impl Curve25519 {
    fn secret(private_key: &[u8]) -> Result<StaticSecret> {
        if private_key.len() != DH_LEN {
            return Err(Error::InvalidPrivateKey {
                expected: DH_LEN,
                actual: private_key.len(),
            });
        }
        let mut bytes = Zeroizing::new([0; DH_LEN]);
        bytes.copy_from_slice(private_key);
        Ok(StaticSecret::from(*bytes))
    }

    fn pair(secret: &StaticSecret) -> KeyPair {
        let private = Zeroizing::new(secret.to_bytes());
        let public = PublicKey::from(secret);
        KeyPair::from_parts(private.to_vec(), public.as_bytes().to_vec())
    }
}

impl Dh for Curve25519 {
    const NAME: &'static str = "25519";
    const DH_LEN: usize = DH_LEN;

    fn generate_keypair() -> KeyPair {
        Self::pair(&StaticSecret::random())
    }

    fn keypair_from_private(private_key: &[u8]) -> Result<KeyPair> {
        Ok(Self::pair(&Self::secret(private_key)?))
    }

    fn dh(keypair: &KeyPair, public_key: &[u8], out: &mut [u8]) -> Result<()> {
        let public: [u8; DH_LEN] = public_key
            .try_into()
            .map_err(|_| Error::InvalidPublicKey {
                expected: DH_LEN,
                actual: public_key.len(),
            })?;
        let secret = Self::secret(keypair.private_key())?;
        let shared = secret.diffie_hellman(&PublicKey::from(public));
        out.copy_from_slice(shared.as_bytes());
        Ok(())
    }
}
