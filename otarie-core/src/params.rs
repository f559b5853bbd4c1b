use crate::context::Context;
use crate::error::Result;

/// Degree bounds for the cyclotomic ring X^n + 1.
pub const POLY_DEGREE_MIN: usize = 8;
pub const POLY_DEGREE_MAX: usize = 32768;

/// Coefficient modulus factors must have between 2 and 60 bits.
pub const FACTOR_BIT_MIN: usize = 2;
pub const FACTOR_BIT_MAX: usize = 60;

/// Decomposition bit count range for key switching.
pub const DBC_MIN: usize = 1;
pub const DBC_MAX: usize = 60;

/// Gaussian samples are rejected beyond six standard deviations.
pub const SIX_SIGMA: f64 = 6.0;

/// Default fresh-noise standard deviation.
pub const DEFAULT_NOISE_STANDARD_DEVIATION: f64 = 3.19;

/// User-facing description of an encryption scheme instance.
///
/// Plain data until validated: setters may be chained in any order, and
/// [`EncryptionParameters::validate`] consumes the value so every live
/// [`Context`] is backed by a frozen, checked parameter set.
#[derive(Clone, Debug, PartialEq)]
pub struct EncryptionParameters {
    poly_modulus_degree: usize,
    coeff_modulus: Vec<u64>,
    plain_modulus: u64,
    noise_standard_deviation: f64,
}

impl Default for EncryptionParameters {
    fn default() -> Self {
        Self::new()
    }
}

impl EncryptionParameters {
    pub fn new() -> EncryptionParameters {
        EncryptionParameters {
            poly_modulus_degree: 0,
            coeff_modulus: Vec::new(),
            plain_modulus: 0,
            noise_standard_deviation: DEFAULT_NOISE_STANDARD_DEVIATION,
        }
    }

    pub fn set_poly_modulus_degree(mut self, degree: usize) -> Self {
        self.poly_modulus_degree = degree;
        self
    }

    pub fn set_coeff_modulus(mut self, factors: Vec<u64>) -> Self {
        self.coeff_modulus = factors;
        self
    }

    pub fn set_plain_modulus(mut self, plain_modulus: u64) -> Self {
        self.plain_modulus = plain_modulus;
        self
    }

    pub fn set_noise_standard_deviation(mut self, std_dev: f64) -> Self {
        self.noise_standard_deviation = std_dev;
        self
    }

    #[inline(always)]
    pub fn poly_modulus_degree(&self) -> usize {
        self.poly_modulus_degree
    }

    #[inline(always)]
    pub fn coeff_modulus(&self) -> &[u64] {
        &self.coeff_modulus
    }

    #[inline(always)]
    pub fn plain_modulus(&self) -> u64 {
        self.plain_modulus
    }

    #[inline(always)]
    pub fn noise_standard_deviation(&self) -> f64 {
        self.noise_standard_deviation
    }

    #[inline(always)]
    pub fn noise_max_deviation(&self) -> f64 {
        self.noise_standard_deviation * SIX_SIGMA
    }

    /// Checks the parameter set and builds the derived evaluation context.
    pub fn validate(self) -> Result<Context> {
        Context::new(self)
    }
}

/// Properties a validated parameter set qualifies for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParameterQualifiers {
    /// Plain modulus is prime and 1 mod 2n: CRT batching is available.
    pub using_batching: bool,
    /// Every coefficient modulus factor exceeds the plain modulus.
    pub using_fast_plain_lift: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chain() {
        let parms: EncryptionParameters = EncryptionParameters::new()
            .set_poly_modulus_degree(2048)
            .set_plain_modulus(257)
            .set_noise_standard_deviation(3.19);
        assert_eq!(parms.poly_modulus_degree(), 2048);
        assert_eq!(parms.plain_modulus(), 257);
        assert!(parms.coeff_modulus().is_empty());
        assert_eq!(parms.noise_max_deviation(), 3.19 * SIX_SIGMA);
    }
}
