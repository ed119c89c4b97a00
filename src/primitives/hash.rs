use blake2::{Blake2b512, Blake2s256};
use hmac::{Mac, SimpleHmac};
use sha2::Digest;

use super::Hash;

/// Binds a RustCrypto digest to the `Hash` contract. HMAC goes through `SimpleHmac`, which
/// accepts every digest here, BLAKE2 included.
macro_rules! digest_hash {
    (
        $(#[$doc:meta])*
        $name:ident, $inner:ty, $tag:literal, $hash_len:literal, $block_len:literal
    ) => {
        $(#[$doc])*
        #[derive(Clone, Debug, Default)]
        pub struct $name($inner);

        impl Hash for $name {
            const NAME: &'static str = $tag;
            const HASH_LEN: usize = $hash_len;
            const BLOCK_LEN: usize = $block_len;

            fn append_data(&mut self, data: &[u8]) {
                Digest::update(&mut self.0, data);
            }

            fn get_hash_and_reset(&mut self, out: &mut [u8]) {
                let finished = std::mem::take(&mut self.0);
                out.copy_from_slice(&finished.finalize());
            }

            fn hmac(key: &[u8], data: &[&[u8]], out: &mut [u8]) {
                let Ok(mut mac) = <SimpleHmac<$inner> as Mac>::new_from_slice(key) else {
                    unreachable!("HMAC accepts keys of any length");
                };
                for d in data {
                    Mac::update(&mut mac, d);
                }
                out.copy_from_slice(&mac.finalize().into_bytes());
            }
        }
    };
}

digest_hash!(
    /// SHA-256.
    Sha256, sha2::Sha256, "SHA256", 32, 64
);
digest_hash!(
    /// SHA-512.
    Sha512, sha2::Sha512, "SHA512", 64, 128
);
digest_hash!(
    /// BLAKE2s with a 32 byte output.
    Blake2s, Blake2s256, "BLAKE2s", 32, 64
);
digest_hash!(
    /// BLAKE2b with a 64 byte output.
    Blake2b, Blake2b512, "BLAKE2b", 64, 128
);
