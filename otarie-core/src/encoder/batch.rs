use std::sync::Arc;

use otarie_math::modulus::WordOps;
use otarie_math::ntt::NttTable;

use crate::context::Context;
use crate::error::{HeError, Result};
use crate::plaintext::Plaintext;

/// CRT batching encoder packing N values mod t into the N evaluation
/// slots of one plaintext.
///
/// Slots form a 2 x (N/2) matrix: the multiplicative group mod 2N splits
/// into the powers of 3 and their negatives, so Galois automorphisms act
/// on the matrix as cyclic row shifts and a row swap. The index map sends
/// matrix positions to the transform's bit-reversed evaluation order.
pub struct BatchEncoder {
    ctx: Arc<Context>,
    index_map: Vec<usize>,
}

impl BatchEncoder {
    pub fn new(ctx: Arc<Context>) -> Result<BatchEncoder> {
        if !ctx.qualifiers().using_batching {
            return Err(HeError::BatchingNotSupported(format!(
                "plain_modulus = {} is not a prime congruent to 1 mod {}",
                ctx.plain_modulus(),
                2 * ctx.n()
            )));
        }
        let n: usize = ctx.n();
        let log_n: u32 = n.trailing_zeros();
        let row_size: usize = n >> 1;
        let m: usize = n << 1;

        let mut index_map: Vec<usize> = vec![0; n];
        let mut pos: usize = 1;
        for i in 0..row_size {
            index_map[i] = ((pos - 1) >> 1).reverse_bits_msb(log_n);
            index_map[row_size + i] = ((m - pos - 1) >> 1).reverse_bits_msb(log_n);
            pos = (pos * 3) & (m - 1);
        }
        Ok(BatchEncoder { ctx, index_map })
    }

    #[inline(always)]
    pub fn slot_count(&self) -> usize {
        self.ctx.slot_count()
    }

    /// Packs `values` into one plaintext; inverse of [`Self::decompose`].
    pub fn compose(&self, values: &[u64]) -> Result<Plaintext> {
        let n: usize = self.ctx.n();
        if values.len() != n {
            return Err(HeError::InvalidParameters(format!(
                "expected {} slot values, got {}",
                n,
                values.len()
            )));
        }
        let t: u64 = self.ctx.plain_modulus();
        if let Some(&v) = values.iter().find(|&&v| v >= t) {
            return Err(HeError::EncodingOverflow(format!(
                "slot value {} is not reduced modulo plain_modulus = {}",
                v, t
            )));
        }

        let mut coeffs: Vec<u64> = vec![0; n];
        for (i, &v) in values.iter().enumerate() {
            coeffs[self.index_map[i]] = v;
        }
        self.plain_table().backward_inplace(&mut coeffs);
        Ok(Plaintext::from_coeffs(coeffs))
    }

    /// Reads the slot values out of a plaintext.
    pub fn decompose(&self, plain: &Plaintext) -> Result<Vec<u64>> {
        let n: usize = self.ctx.n();
        if plain.coeff_count() > n {
            return Err(HeError::PlaintextTooLarge {
                degree: plain.coeff_count(),
                limit: n,
            });
        }
        let t: u64 = self.ctx.plain_modulus();
        if let Some(&c) = plain.coeffs().iter().find(|&&c| c >= t) {
            return Err(HeError::InvalidParameters(format!(
                "plaintext coefficient {} is not reduced modulo plain_modulus = {}",
                c, t
            )));
        }

        let mut buffer: Vec<u64> = vec![0; n];
        buffer[..plain.coeff_count()].copy_from_slice(plain.coeffs());
        self.plain_table().forward_inplace(&mut buffer);
        Ok(self.index_map.iter().map(|&i| buffer[i]).collect())
    }

    fn plain_table(&self) -> &NttTable {
        // The batching qualifier guarantees the table exists.
        self.ctx
            .plain_table()
            .unwrap_or_else(|| unreachable!("batching qualifier implies a plaintext NTT table"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::EncryptionParameters;

    fn batching_ctx() -> Arc<Context> {
        Arc::new(
            EncryptionParameters::new()
                .set_poly_modulus_degree(16)
                .set_coeff_modulus(otarie_math::primes::primes_of_size(30, 16, 2).unwrap())
                .set_plain_modulus(97)
                .validate()
                .unwrap(),
        )
    }

    #[test]
    fn test_roundtrip() {
        let encoder: BatchEncoder = BatchEncoder::new(batching_ctx()).unwrap();
        let values: Vec<u64> = (0..16).map(|i| (i * 13 + 5) % 97).collect();
        let plain: Plaintext = encoder.compose(&values).unwrap();
        assert_eq!(encoder.decompose(&plain).unwrap(), values);
    }

    #[test]
    fn test_constant_vector() {
        // A constant vector composes to the constant polynomial.
        let encoder: BatchEncoder = BatchEncoder::new(batching_ctx()).unwrap();
        let plain: Plaintext = encoder.compose(&[7; 16]).unwrap();
        assert_eq!(plain.coeffs()[0], 7);
        assert!(plain.coeffs()[1..].iter().all(|&c| c == 0));
    }

    #[test]
    fn test_rejects_unreduced_values() {
        let encoder: BatchEncoder = BatchEncoder::new(batching_ctx()).unwrap();
        assert!(matches!(
            encoder.compose(&[97; 16]),
            Err(HeError::EncodingOverflow(_))
        ));
    }

    #[test]
    fn test_requires_batching_qualifier() {
        let ctx: Arc<Context> = Arc::new(
            EncryptionParameters::new()
                .set_poly_modulus_degree(16)
                .set_coeff_modulus(otarie_math::primes::primes_of_size(30, 16, 2).unwrap())
                .set_plain_modulus(96)
                .validate()
                .unwrap(),
        );
        assert!(matches!(
            BatchEncoder::new(ctx),
            Err(HeError::BatchingNotSupported(_))
        ));
    }
}
