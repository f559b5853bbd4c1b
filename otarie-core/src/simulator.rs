use num_bigint::BigUint;
use num_traits::Zero;

use crate::error::{HeError, Result};
use crate::params::{EncryptionParameters, DBC_MAX, DBC_MIN};

/// Symbolic noise tracker: an upper bound on the inherent noise of a
/// hypothetical ciphertext under a candidate parameter set. Decryption is
/// reliable while the bound stays below q / (2t); no key or ciphertext
/// material is ever involved.
#[derive(Clone, Debug)]
pub struct Simulation {
    noise: BigUint,
    max_noise: BigUint,
    coeff_modulus: BigUint,
    plain_modulus: BigUint,
    poly_modulus_degree: usize,
    noise_max_deviation: f64,
    decomposition_bit_count: usize,
}

impl Simulation {
    /// Fresh-encryption noise estimate: 2 * sqrt(2N/3) * B * t, where B
    /// is the sampling clip bound.
    pub fn fresh(parms: &EncryptionParameters, decomposition_bit_count: usize) -> Result<Simulation> {
        if parms.coeff_modulus().is_empty() {
            return Err(HeError::InvalidParameters(
                "cannot simulate with an empty coeff_modulus".to_string(),
            ));
        }
        if !(DBC_MIN..=DBC_MAX).contains(&decomposition_bit_count) {
            return Err(HeError::InvalidParameters(format!(
                "decomposition_bit_count = {} is outside [{}, {}]",
                decomposition_bit_count, DBC_MIN, DBC_MAX
            )));
        }
        let coeff_modulus: BigUint = parms
            .coeff_modulus()
            .iter()
            .map(|&q| BigUint::from(q))
            .product();
        let plain_modulus: BigUint = BigUint::from(parms.plain_modulus());
        let max_noise: BigUint = &coeff_modulus / (&plain_modulus << 1);
        let n: usize = parms.poly_modulus_degree();
        let growth_factor: u64 = growth_factor(n);
        let noise: BigUint =
            BigUint::from(2 * growth_factor * parms.noise_max_deviation() as u64) * &plain_modulus;
        Ok(Simulation {
            noise,
            max_noise,
            coeff_modulus,
            plain_modulus,
            poly_modulus_degree: n,
            noise_max_deviation: parms.noise_max_deviation(),
            decomposition_bit_count,
        })
    }

    #[inline(always)]
    fn with_noise(&self, noise: BigUint) -> Simulation {
        Simulation {
            noise,
            ..self.clone()
        }
    }

    fn check_same(&self, other: &Simulation) -> Result<()> {
        if self.coeff_modulus != other.coeff_modulus
            || self.plain_modulus != other.plain_modulus
            || self.poly_modulus_degree != other.poly_modulus_degree
        {
            return Err(HeError::ParameterMismatch(
                "simulations were produced under different encryption parameters".to_string(),
            ));
        }
        Ok(())
    }

    #[inline(always)]
    pub fn noise(&self) -> &BigUint {
        &self.noise
    }

    #[inline(always)]
    pub fn max_noise(&self) -> &BigUint {
        &self.max_noise
    }

    /// Predicted invariant noise budget in bits; 0 means decryption is no
    /// longer expected to be reliable.
    pub fn noise_budget(&self) -> u32 {
        self.max_noise.bits().saturating_sub(self.noise.bits()) as u32
    }

    pub fn decrypts(&self, budget_floor: u32) -> bool {
        self.noise_budget() > budget_floor
    }

    /// Sum bound: the larger noise plus min^2 / (2 max), a proxy for the
    /// root-sum-square of independent noises, plus the q mod t rounding
    /// term.
    pub fn add(&self, other: &Simulation) -> Result<Simulation> {
        self.check_same(other)?;
        if self.noise.is_zero() {
            return Ok(other.clone());
        }
        if other.noise.is_zero() {
            return Ok(self.clone());
        }
        let (hi, lo) = if self.noise >= other.noise {
            (&self.noise, &other.noise)
        } else {
            (&other.noise, &self.noise)
        };
        let q_mod_t: BigUint = &self.coeff_modulus % &self.plain_modulus;
        Ok(self.with_noise(hi + (lo * lo) / (hi << 1) + q_mod_t))
    }

    pub fn sub(&self, other: &Simulation) -> Result<Simulation> {
        self.add(other)
    }

    pub fn negate(&self) -> Simulation {
        self.clone()
    }

    pub fn add_plain(&self) -> Simulation {
        self.clone()
    }

    pub fn sub_plain(&self) -> Simulation {
        self.clone()
    }

    /// Tensor-product bound without relinearization:
    /// sqrt(2N/3) * (N+1) * t^2 / 2 * (noise1 + noise2).
    pub fn multiply_norelin(&self, other: &Simulation) -> Result<Simulation> {
        self.check_same(other)?;
        let factor: BigUint = BigUint::from(
            growth_factor(self.poly_modulus_degree) * (self.poly_modulus_degree as u64 + 1),
        ) * &self.plain_modulus
            * &self.plain_modulus
            >> 1;
        Ok(self.with_noise(factor * (&self.noise + &other.noise)))
    }

    /// Key-switching adds sqrt(2N/3) * sqrt(N) * B * L * t * 2^dbc on top
    /// of the incoming noise, L being the digit count.
    pub fn relinearize(&self, decomposition_bit_count: usize) -> Result<Simulation> {
        if !(DBC_MIN..=DBC_MAX).contains(&decomposition_bit_count) {
            return Err(HeError::InvalidParameters(format!(
                "decomposition_bit_count = {} is outside [{}, {}]",
                decomposition_bit_count, DBC_MIN, DBC_MAX
            )));
        }
        let n: usize = self.poly_modulus_degree;
        let digits: usize = (self.coeff_modulus.bits() as usize).div_ceil(decomposition_bit_count);
        let scale: u64 = growth_factor(n)
            * ((n as f64).sqrt() as u64)
            * (self.noise_max_deviation as u64)
            * digits as u64;
        let ksw: BigUint = (BigUint::from(scale) * &self.plain_modulus) << decomposition_bit_count;
        Ok(self.with_noise(&self.noise + ksw))
    }

    pub fn multiply(&self, other: &Simulation) -> Result<Simulation> {
        self.multiply_norelin(other)?
            .relinearize(self.decomposition_bit_count)
    }

    pub fn multiply_plain(
        &self,
        plain_max_coeff_count: usize,
        plain_max_abs_value: &BigUint,
    ) -> Result<Simulation> {
        if plain_max_coeff_count == 0 || plain_max_coeff_count > self.poly_modulus_degree {
            return Err(HeError::InvalidParameters(format!(
                "plain_max_coeff_count = {} is outside [1, {}]",
                plain_max_coeff_count, self.poly_modulus_degree
            )));
        }
        if plain_max_abs_value.is_zero() {
            return Ok(self.with_noise(BigUint::zero()));
        }
        let scale: BigUint = BigUint::from((plain_max_coeff_count as f64).sqrt() as u64);
        Ok(self.with_noise(scale * &self.noise * plain_max_abs_value))
    }

    /// Mirrors the real left-to-right square-and-multiply with a
    /// relinearization after every product.
    pub fn exponentiate(&self, exponent: u64, decomposition_bit_count: usize) -> Result<Simulation> {
        if exponent == 0 {
            return Err(HeError::InvalidParameters(
                "exponent must be positive".to_string(),
            ));
        }
        let bits: u32 = 64 - exponent.leading_zeros();
        let mut result: Simulation = self.clone();
        for i in (0..bits - 1).rev() {
            result = result
                .multiply_norelin(&result)?
                .relinearize(decomposition_bit_count)?;
            if (exponent >> i) & 1 == 1 {
                result = result
                    .multiply_norelin(self)?
                    .relinearize(decomposition_bit_count)?;
            }
        }
        Ok(result)
    }
}

/// Expected-norm growth of a negacyclic product: sqrt(2N/3).
#[inline(always)]
fn growth_factor(n: usize) -> u64 {
    ((2 * n) as f64 / 3.0).sqrt() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::EncryptionParameters;
    use crate::tables::{standard_parameters, SecurityLevel};

    fn parms() -> EncryptionParameters {
        EncryptionParameters::new()
            .set_poly_modulus_degree(4096)
            .set_coeff_modulus(standard_parameters(SecurityLevel::Tc128, 4096).unwrap())
            .set_plain_modulus(1 << 10)
    }

    #[test]
    fn test_fresh_budget_positive() {
        let sim: Simulation = Simulation::fresh(&parms(), 16).unwrap();
        assert!(sim.noise_budget() > 0);
        assert!(sim.decrypts(10));
    }

    #[test]
    fn test_noise_grows_monotonically() {
        let fresh: Simulation = Simulation::fresh(&parms(), 16).unwrap();
        let sum: Simulation = fresh.add(&fresh).unwrap();
        let product: Simulation = fresh.multiply(&fresh).unwrap();
        assert!(sum.noise() >= fresh.noise());
        assert!(product.noise() > sum.noise());
        assert!(product.noise_budget() < fresh.noise_budget());
    }

    #[test]
    fn test_relinearize_adds_noise() {
        let fresh: Simulation = Simulation::fresh(&parms(), 16).unwrap();
        let relin: Simulation = fresh.relinearize(16).unwrap();
        assert!(relin.noise() > fresh.noise());
    }

    #[test]
    fn test_multiply_plain_by_zero_clears_noise() {
        let fresh: Simulation = Simulation::fresh(&parms(), 16).unwrap();
        let scaled: Simulation = fresh.multiply_plain(1, &BigUint::zero()).unwrap();
        assert!(scaled.noise().is_zero());
    }

    #[test]
    fn test_mismatched_parameters_rejected() {
        let a: Simulation = Simulation::fresh(&parms(), 16).unwrap();
        let b: Simulation = Simulation::fresh(&parms().set_plain_modulus(1 << 12), 16).unwrap();
        assert!(matches!(a.add(&b), Err(HeError::ParameterMismatch(_))));
    }
}
