use std::hash::Hasher;

use fnv::FnvHasher;
use num_bigint::BigUint;
use num_traits::ToPrimitive;

use otarie_math::modulus::prime::{is_prime, Prime};
use otarie_math::modulus::barrett::BarrettPrecomp;
use otarie_math::ntt::NttTable;
use otarie_math::primes::NttPrimeGenerator;
use otarie_math::ring::RnsRing;

use crate::error::{HeError, Result};
use crate::params::{
    EncryptionParameters, ParameterQualifiers, FACTOR_BIT_MAX, FACTOR_BIT_MIN, POLY_DEGREE_MAX,
    POLY_DEGREE_MIN,
};

/// Bit length of the auxiliary primes extending the coefficient modulus
/// basis for exact tensor products.
const AUX_PRIME_BITS: usize = 61;

/// Validated parameter set with every table the engine needs precomputed.
///
/// Construction is the single validation point: a `Context` in hand means
/// the parameters passed every check in `EncryptionParameters::validate`.
/// Objects produced under one context carry its fingerprint and are
/// rejected by components holding a different one.
pub struct Context {
    parms: EncryptionParameters,
    qualifiers: ParameterQualifiers,
    ring: RnsRing,
    /// Base plus auxiliary primes, wide enough that a ciphertext tensor
    /// product never wraps before rescaling.
    ext_ring: RnsRing,
    plain_table: Option<NttTable>,
    plain_barrett: BarrettPrecomp,
    delta: BigUint,
    delta_mod_q: Vec<u64>,
    upper_half_threshold: BigUint,
    plain_upper_half_threshold: u64,
    coeff_modulus_bits: usize,
    fingerprint: u64,
}

impl Context {
    pub(crate) fn new(parms: EncryptionParameters) -> Result<Context> {
        let n: usize = parms.poly_modulus_degree();
        if !(POLY_DEGREE_MIN..=POLY_DEGREE_MAX).contains(&n) || n & (n - 1) != 0 {
            return Err(HeError::InvalidParameters(format!(
                "poly_modulus_degree = {} is not a power of two in [{}, {}]",
                n, POLY_DEGREE_MIN, POLY_DEGREE_MAX
            )));
        }

        let factors: &[u64] = parms.coeff_modulus();
        if factors.is_empty() {
            return Err(HeError::InvalidParameters(
                "coeff_modulus is empty".to_string(),
            ));
        }
        let two_n: u64 = (n as u64) << 1;
        for (i, &q) in factors.iter().enumerate() {
            let bits: usize = (64 - q.leading_zeros()) as usize;
            if !(FACTOR_BIT_MIN..=FACTOR_BIT_MAX).contains(&bits) {
                return Err(HeError::InvalidParameters(format!(
                    "coeff_modulus[{}] = {} has {} bits, outside [{}, {}]",
                    i, q, bits, FACTOR_BIT_MIN, FACTOR_BIT_MAX
                )));
            }
            if !is_prime(q) {
                return Err(HeError::InvalidParameters(format!(
                    "coeff_modulus[{}] = {} is not prime",
                    i, q
                )));
            }
            if q % two_n != 1 {
                return Err(HeError::InvalidParameters(format!(
                    "coeff_modulus[{}] = {} is not 1 mod 2n = {}",
                    i, q, two_n
                )));
            }
            if factors[..i].contains(&q) {
                return Err(HeError::InvalidParameters(format!(
                    "coeff_modulus[{}] = {} is repeated",
                    i, q
                )));
            }
        }

        let t: u64 = parms.plain_modulus();
        if t < 2 {
            return Err(HeError::InvalidParameters(format!(
                "plain_modulus = {} must be at least 2",
                t
            )));
        }
        for &q in factors {
            if t % q == 0 {
                return Err(HeError::InvalidParameters(format!(
                    "plain_modulus = {} is not coprime to coeff_modulus factor {}",
                    t, q
                )));
            }
        }

        let modulus: BigUint = factors.iter().map(|&q| BigUint::from(q)).product();
        if BigUint::from(t) >= modulus {
            return Err(HeError::InvalidParameters(format!(
                "plain_modulus = {} is not smaller than the total coeff_modulus",
                t
            )));
        }

        let std_dev: f64 = parms.noise_standard_deviation();
        if !std_dev.is_finite() || std_dev <= 0.0 {
            return Err(HeError::InvalidParameters(format!(
                "noise_standard_deviation = {} must be finite and positive",
                std_dev
            )));
        }

        let ring: RnsRing = RnsRing::new(n, factors);
        let coeff_modulus_bits: usize = ring.modulus().bits() as usize;

        // Tensoring two size-M, size-N ciphertexts sums up to M*N*n products
        // of centered residues, so the extended basis must clear
        // 2*bits(q) + log2(n) plus headroom for the pair count.
        let needed_bits: usize = 2 * coeff_modulus_bits + n.trailing_zeros() as usize + 16;
        let mut ext_moduli: Vec<u64> = factors.to_vec();
        let mut ext_bits: usize = coeff_modulus_bits;
        let mut generator: NttPrimeGenerator = NttPrimeGenerator::new(AUX_PRIME_BITS, n);
        while ext_bits < needed_bits {
            let p: u64 = generator.next_downstream().ok_or_else(|| {
                HeError::InvalidParameters(format!(
                    "cannot extend the coefficient modulus basis for degree {}",
                    n
                ))
            })?;
            if ext_moduli.contains(&p) {
                continue;
            }
            ext_bits += AUX_PRIME_BITS - 1;
            ext_moduli.push(p);
        }
        let ext_ring: RnsRing = RnsRing::new(n, &ext_moduli);

        let qualifiers: ParameterQualifiers = ParameterQualifiers {
            using_batching: is_prime(t) && t % two_n == 1,
            using_fast_plain_lift: factors.iter().all(|&q| q > t),
        };
        let plain_table: Option<NttTable> = qualifiers
            .using_batching
            .then(|| NttTable::new(Prime::new(t), n));

        let delta: BigUint = ring.modulus() / t;
        let delta_mod_q: Vec<u64> = factors
            .iter()
            .map(|&q| (&delta % q).to_u64().unwrap_or(0))
            .collect();
        let upper_half_threshold: BigUint = (ring.modulus() + 1u32) >> 1;

        let mut hasher: FnvHasher = FnvHasher::default();
        hasher.write_u64(n as u64);
        for &q in factors {
            hasher.write_u64(q);
        }
        hasher.write_u64(t);
        hasher.write_u64(std_dev.to_bits());
        let fingerprint: u64 = hasher.finish();

        Ok(Context {
            plain_barrett: BarrettPrecomp::new(t),
            parms,
            qualifiers,
            ring,
            ext_ring,
            plain_table,
            delta,
            delta_mod_q,
            upper_half_threshold,
            plain_upper_half_threshold: (t + 1) >> 1,
            coeff_modulus_bits,
            fingerprint,
        })
    }

    #[inline(always)]
    pub fn parms(&self) -> &EncryptionParameters {
        &self.parms
    }

    #[inline(always)]
    pub fn qualifiers(&self) -> ParameterQualifiers {
        self.qualifiers
    }

    #[inline(always)]
    pub fn n(&self) -> usize {
        self.parms.poly_modulus_degree()
    }

    #[inline(always)]
    pub fn plain_modulus(&self) -> u64 {
        self.parms.plain_modulus()
    }

    #[inline(always)]
    pub fn ring(&self) -> &RnsRing {
        &self.ring
    }

    #[inline(always)]
    pub fn ext_ring(&self) -> &RnsRing {
        &self.ext_ring
    }

    #[inline(always)]
    pub fn plain_table(&self) -> Option<&NttTable> {
        self.plain_table.as_ref()
    }

    #[inline(always)]
    pub fn plain_barrett(&self) -> &BarrettPrecomp {
        &self.plain_barrett
    }

    #[inline(always)]
    pub fn total_coeff_modulus(&self) -> &BigUint {
        self.ring.modulus()
    }

    #[inline(always)]
    pub fn coeff_modulus_bits(&self) -> usize {
        self.coeff_modulus_bits
    }

    #[inline(always)]
    pub fn delta(&self) -> &BigUint {
        &self.delta
    }

    #[inline(always)]
    pub fn delta_mod_q(&self) -> &[u64] {
        &self.delta_mod_q
    }

    #[inline(always)]
    pub fn upper_half_threshold(&self) -> &BigUint {
        &self.upper_half_threshold
    }

    #[inline(always)]
    pub fn plain_upper_half_threshold(&self) -> u64 {
        self.plain_upper_half_threshold
    }

    /// Slots available to the batching encoder.
    #[inline(always)]
    pub fn slot_count(&self) -> usize {
        self.n()
    }

    #[inline(always)]
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub(crate) fn check_fingerprint(&self, fingerprint: u64, what: &str) -> Result<()> {
        if fingerprint != self.fingerprint {
            return Err(HeError::ParameterMismatch(format!(
                "{} was produced under different encryption parameters",
                what
            )));
        }
        Ok(())
    }

    /// Galois element of a cyclic row rotation by `step` slots.
    pub fn galois_elt_from_step(&self, step: i64) -> u64 {
        let row_size: u64 = (self.n() as u64) >> 1;
        let two_n: u64 = (self.n() as u64) << 1;
        let exponent: u64 = if step >= 0 {
            (step as u64) % row_size
        } else {
            row_size - ((step.unsigned_abs()) % row_size)
        };
        let mut elt: u64 = 1;
        for _ in 0..exponent {
            elt = (elt * 3) % two_n;
        }
        elt
    }

    /// Galois element swapping the two batching rows.
    #[inline(always)]
    pub fn galois_elt_columns(&self) -> u64 {
        ((self.n() as u64) << 1) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{standard_parameters, SecurityLevel};

    fn small_parms() -> EncryptionParameters {
        EncryptionParameters::new()
            .set_poly_modulus_degree(16)
            .set_coeff_modulus(otarie_math::primes::primes_of_size(30, 16, 2).unwrap())
            .set_plain_modulus(97)
    }

    #[test]
    fn test_validate_small() {
        let ctx: Context = small_parms().validate().unwrap();
        assert_eq!(ctx.n(), 16);
        assert!(ctx.qualifiers().using_batching);
        assert!(ctx.qualifiers().using_fast_plain_lift);
        assert!(ctx.ext_ring().factors() > ctx.ring().factors());
        assert_eq!(ctx.delta(), &(ctx.total_coeff_modulus() / 97u64));
    }

    #[test]
    fn test_reject_bad_degree() {
        let err = small_parms().set_poly_modulus_degree(24).validate();
        assert!(matches!(err, Err(HeError::InvalidParameters(_))));
    }

    #[test]
    fn test_reject_non_ntt_factor() {
        // 65539 is prime but not 1 mod 32.
        let err = small_parms().set_coeff_modulus(vec![65539]).validate();
        assert!(matches!(err, Err(HeError::InvalidParameters(_))));
    }

    #[test]
    fn test_reject_repeated_factor() {
        let q: u64 = otarie_math::primes::primes_of_size(30, 16, 1).unwrap()[0];
        let err = small_parms().set_coeff_modulus(vec![q, q]).validate();
        assert!(matches!(err, Err(HeError::InvalidParameters(_))));
    }

    #[test]
    fn test_reject_tiny_plain_modulus() {
        let err = small_parms().set_plain_modulus(1).validate();
        assert!(matches!(err, Err(HeError::InvalidParameters(_))));
    }

    #[test]
    fn test_no_batching_for_composite_plain_modulus() {
        let ctx: Context = small_parms().set_plain_modulus(96).validate().unwrap();
        assert!(!ctx.qualifiers().using_batching);
        assert!(ctx.plain_table().is_none());
    }

    #[test]
    fn test_fingerprint_distinguishes_parms() {
        let a: Context = small_parms().validate().unwrap();
        let b: Context = small_parms().set_plain_modulus(193).validate().unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert!(a.check_fingerprint(b.fingerprint(), "ciphertext").is_err());
    }

    #[test]
    fn test_standard_parameters_validate() {
        let factors: Vec<u64> = standard_parameters(SecurityLevel::Tc128, 2048).unwrap();
        let ctx: Context = EncryptionParameters::new()
            .set_poly_modulus_degree(2048)
            .set_coeff_modulus(factors)
            .set_plain_modulus(257)
            .validate()
            .unwrap();
        assert!(ctx.coeff_modulus_bits() >= 50);
    }

    #[test]
    fn test_galois_elements() {
        let ctx: Context = small_parms().validate().unwrap();
        assert_eq!(ctx.galois_elt_from_step(1), 3);
        assert_eq!(ctx.galois_elt_from_step(-1), ctx.galois_elt_from_step(7));
        assert_eq!(ctx.galois_elt_columns(), 31);
        // All row elements are odd and distinct.
        let mut seen: Vec<u64> = (0..8).map(|s| ctx.galois_elt_from_step(s)).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 8);
        assert!(seen.iter().all(|e| e % 2 == 1));
    }
}
