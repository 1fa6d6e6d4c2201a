//! Shamir secret sharing over GF(256).
//!
//! The content key is split byte-wise: each secret byte becomes the
//! constant term of a random polynomial of degree `threshold - 1`, and
//! share `x` is the polynomial evaluated at `x`. Any `threshold` distinct
//! shares recombine via Lagrange interpolation at zero; fewer reveal
//! nothing about the secret.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SealError};

/// One share of a split secret: the evaluation point and one byte of
/// polynomial output per secret byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    /// Evaluation point, never zero.
    pub index: u8,
    /// Polynomial evaluations, one per secret byte.
    pub data: Vec<u8>,
}

// GF(256) with the AES reduction polynomial x^8 + x^4 + x^3 + x + 1.

fn gf_mul(mut a: u8, mut b: u8) -> u8 {
    let mut product = 0u8;
    while b != 0 {
        if b & 1 != 0 {
            product ^= a;
        }
        let carry = a & 0x80;
        a <<= 1;
        if carry != 0 {
            a ^= 0x1b;
        }
        b >>= 1;
    }
    product
}

fn gf_pow(base: u8, exp: u8) -> u8 {
    let mut result = 1u8;
    for _ in 0..exp {
        result = gf_mul(result, base);
    }
    result
}

fn gf_inv(a: u8) -> u8 {
    // a^254 = a^-1 in GF(256) by Fermat's little theorem.
    debug_assert_ne!(a, 0);
    gf_pow(a, 254)
}

/// Split a secret into shares at the given evaluation points.
///
/// Points must be distinct and non-zero; `threshold` shares are needed
/// to recombine.
pub fn split(secret: &[u8], threshold: u8, indexes: &[u8]) -> Result<Vec<Share>> {
    if threshold == 0 {
        return Err(SealError::EncryptionUnavailable(
            "threshold must be positive".to_string(),
        ));
    }
    if (indexes.len() as u16) < threshold as u16 {
        return Err(SealError::EncryptionUnavailable(format!(
            "{} share indexes cannot satisfy threshold {}",
            indexes.len(),
            threshold
        )));
    }
    if indexes.iter().any(|&x| x == 0) {
        return Err(SealError::EncryptionUnavailable(
            "share index zero is reserved for the secret".to_string(),
        ));
    }

    let mut rng = rand::thread_rng();

    // One random polynomial per secret byte, constant term = the byte.
    let mut coefficients = vec![vec![0u8; threshold as usize]; secret.len()];
    for (byte_idx, &byte) in secret.iter().enumerate() {
        coefficients[byte_idx][0] = byte;
        let mut tail = vec![0u8; threshold as usize - 1];
        rng.fill_bytes(&mut tail);
        coefficients[byte_idx][1..].copy_from_slice(&tail);
    }

    let shares = indexes
        .iter()
        .map(|&x| {
            let data = coefficients
                .iter()
                .map(|poly| {
                    // Horner evaluation at x.
                    poly.iter()
                        .rev()
                        .fold(0u8, |acc, &coeff| gf_mul(acc, x) ^ coeff)
                })
                .collect();
            Share { index: x, data }
        })
        .collect();

    Ok(shares)
}

/// Recombine shares into the secret by Lagrange interpolation at zero.
///
/// Exactly `threshold` distinct shares must be supplied; extras should be
/// dropped by the caller.
pub fn combine(shares: &[Share], secret_len: usize) -> Result<Vec<u8>> {
    if shares.is_empty() {
        return Err(SealError::DecryptionError("no shares supplied".to_string()));
    }
    for i in 0..shares.len() {
        for j in i + 1..shares.len() {
            if shares[i].index == shares[j].index {
                return Err(SealError::DecryptionError(format!(
                    "duplicate share index {}",
                    shares[i].index
                )));
            }
        }
    }
    if shares.iter().any(|s| s.data.len() != secret_len) {
        return Err(SealError::DecryptionError(
            "share length mismatch".to_string(),
        ));
    }

    let mut secret = vec![0u8; secret_len];
    for (i, share) in shares.iter().enumerate() {
        // Lagrange basis value at x = 0 for this share.
        let mut basis = 1u8;
        for (j, other) in shares.iter().enumerate() {
            if i == j {
                continue;
            }
            let numerator = other.index;
            let denominator = share.index ^ other.index;
            basis = gf_mul(basis, gf_mul(numerator, gf_inv(denominator)));
        }
        for (byte_idx, &byte) in share.data.iter().enumerate() {
            secret[byte_idx] ^= gf_mul(byte, basis);
        }
    }

    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn threshold_shares_recover_secret() {
        let secret = [0x42u8; 32];
        let shares = split(&secret, 2, &[1, 2, 3]).unwrap();
        let recovered = combine(&shares[..2], 32).unwrap();
        assert_eq!(recovered, secret);
    }

    #[test]
    fn any_subset_at_threshold_recovers() {
        let secret: Vec<u8> = (0..32).collect();
        let shares = split(&secret, 3, &[1, 2, 3, 4, 5]).unwrap();
        for subset in [[0, 1, 2], [0, 2, 4], [1, 3, 4], [2, 3, 4]] {
            let picked: Vec<Share> = subset.iter().map(|&i| shares[i].clone()).collect();
            assert_eq!(combine(&picked, 32).unwrap(), secret);
        }
    }

    #[test]
    fn below_threshold_yields_garbage() {
        let secret = [0x42u8; 32];
        let shares = split(&secret, 3, &[1, 2, 3]).unwrap();
        // Interpolating a degree-2 polynomial from 2 points cannot
        // recover the constant term except by chance.
        let wrong = combine(&shares[..2], 32).unwrap();
        assert_ne!(wrong, secret);
    }

    #[test]
    fn duplicate_indexes_rejected() {
        let secret = [1u8; 4];
        let shares = split(&secret, 2, &[1, 2]).unwrap();
        let dup = vec![shares[0].clone(), shares[0].clone()];
        assert!(combine(&dup, 4).is_err());
    }

    #[test]
    fn zero_index_rejected() {
        assert!(split(&[1u8; 4], 2, &[0, 1]).is_err());
    }

    #[test]
    fn gf_mul_matches_known_values() {
        // From the AES field: 0x57 * 0x83 = 0xc1.
        assert_eq!(gf_mul(0x57, 0x83), 0xc1);
        assert_eq!(gf_mul(0, 0xff), 0);
        assert_eq!(gf_mul(1, 0xab), 0xab);
    }

    #[test]
    fn gf_inv_is_inverse() {
        for a in 1..=255u8 {
            assert_eq!(gf_mul(a, gf_inv(a)), 1, "a = {a}");
        }
    }

    proptest! {
        #[test]
        fn prop_split_combine_roundtrip(
            secret in proptest::collection::vec(any::<u8>(), 1..64),
            threshold in 1u8..5,
        ) {
            let indexes: Vec<u8> = (1..=5).collect();
            let shares = split(&secret, threshold, &indexes).unwrap();
            let recovered = combine(&shares[..threshold as usize], secret.len()).unwrap();
            prop_assert_eq!(recovered, secret);
        }
    }
}
