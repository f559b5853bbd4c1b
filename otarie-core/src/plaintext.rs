/// Polynomial over Z_t, the unencrypted message space.
///
/// Not bound to a parameter set: the same plaintext may be encrypted under
/// any context whose plain modulus covers its coefficients. The logical
/// degree is simply the coefficient count, at most the ring degree of the
/// context it is used with.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Plaintext {
    coeffs: Vec<u64>,
}

impl Plaintext {
    pub fn new() -> Plaintext {
        Plaintext { coeffs: Vec::new() }
    }

    pub fn zero(coeff_count: usize) -> Plaintext {
        Plaintext {
            coeffs: vec![0; coeff_count],
        }
    }

    pub fn from_coeffs(coeffs: Vec<u64>) -> Plaintext {
        Plaintext { coeffs }
    }

    #[inline(always)]
    pub fn coeffs(&self) -> &[u64] {
        &self.coeffs
    }

    #[inline(always)]
    pub fn coeffs_mut(&mut self) -> &mut [u64] {
        &mut self.coeffs
    }

    #[inline(always)]
    pub fn coeff_count(&self) -> usize {
        self.coeffs.len()
    }

    /// Count up to and including the highest nonzero coefficient.
    pub fn significant_coeff_count(&self) -> usize {
        self.coeffs
            .iter()
            .rposition(|&c| c != 0)
            .map_or(0, |i| i + 1)
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_significant_coeff_count() {
        assert_eq!(Plaintext::new().significant_coeff_count(), 0);
        assert_eq!(Plaintext::zero(8).significant_coeff_count(), 0);
        let p: Plaintext = Plaintext::from_coeffs(vec![1, 0, 5, 0, 0]);
        assert_eq!(p.significant_coeff_count(), 3);
        assert_eq!(p.coeff_count(), 5);
        assert!(!p.is_zero());
    }
}
