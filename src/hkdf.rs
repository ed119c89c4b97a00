//! Noise's HKDF: RFC 5869 extract-then-expand with an empty info string and two or three
//! `HASHLEN` outputs, each chained on the previous block plus a counter byte.

use zeroize::Zeroizing;

use crate::primitives::{Hash, MAX_HASH_LEN};

pub type HkdfOutput = Zeroizing<[[u8; MAX_HASH_LEN]; 3]>;

/// Derives `num_outputs` (2 or 3) blocks from `chaining_key` and `input_key_material`. Only the
/// first `H::HASH_LEN` bytes of each block are meaningful.
pub fn hkdf<H: Hash>(
    chaining_key: &[u8],
    input_key_material: &[u8],
    num_outputs: usize,
) -> HkdfOutput {
    assert!(
        (2..=3).contains(&num_outputs),
        "Invariant broken: Noise HKDF produces 2 or 3 outputs"
    );
    let len = H::HASH_LEN;
    let mut temp_key = Zeroizing::new([0; MAX_HASH_LEN]);
    H::hmac(chaining_key, &[input_key_material], &mut temp_key[..len]);

    let mut out = Zeroizing::new([[0; MAX_HASH_LEN]; 3]);
    H::hmac(&temp_key[..len], &[[1u8].as_slice()], &mut out[0][..len]);
    for i in 1..num_outputs {
        let (done, rest) = out.split_at_mut(i);
        let counter = [i as u8 + 1];
        H::hmac(
            &temp_key[..len],
            &[&done[i - 1][..len], counter.as_slice()],
            &mut rest[0][..len],
        );
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::primitives::{Blake2b, Blake2s, Sha256, Sha512};

    // RFC 5869 test case 3: empty salt behaves as a HASHLEN zero key.
    #[test]
    fn rfc5869_sha256_case3() {
        let ikm = [0x0b; 22];
        let out = hkdf::<Sha256>(&[0; 32], &ikm, 2);
        assert_eq!(
            hex::encode(&out[0][..32]),
            "8da4e775a563c18f715f802a063c5a31b8a11f5c5ee1879ec3454e5f3c738d2d"
        );
        assert_eq!(hex::encode(&out[1][..10]), "9d201395faa4b61a96c8");
    }

    fn matches_hkdf_crate<H: Hash, D>()
    where
        D: hmac::digest::Digest + hmac::digest::core_api::BlockSizeUser + Clone,
    {
        let ck = [7u8; 48];
        let ikm = b"input key material";
        let len = H::HASH_LEN;
        let ours = hkdf::<H>(&ck, ikm, 3);

        let reference = ::hkdf::SimpleHkdf::<D>::new(Some(&ck), ikm);
        let mut okm = vec![0; 3 * len];
        reference.expand(&[], &mut okm).unwrap();
        for i in 0..3 {
            assert_eq!(&ours[i][..len], &okm[i * len..(i + 1) * len], "block {i}");
        }
    }

    #[test]
    fn agrees_with_rfc5869_for_every_hash() {
        matches_hkdf_crate::<Sha256, sha2::Sha256>();
        matches_hkdf_crate::<Sha512, sha2::Sha512>();
        matches_hkdf_crate::<Blake2s, blake2::Blake2s256>();
        matches_hkdf_crate::<Blake2b, blake2::Blake2b512>();
    }

    #[test]
    fn two_outputs_prefix_three() {
        let two = hkdf::<Blake2s>(b"ck", b"ikm", 2);
        let three = hkdf::<Blake2s>(b"ck", b"ikm", 3);
        assert_eq!(two[0], three[0]);
        assert_eq!(two[1], three[1]);
        assert_eq!(two[2], [0; MAX_HASH_LEN]);
    }

    #[test]
    #[should_panic]
    fn one_output_is_invalid() {
        hkdf::<Sha256>(b"ck", b"", 1);
    }
}
