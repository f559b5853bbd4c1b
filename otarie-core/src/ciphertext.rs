use otarie_math::poly::RnsPoly;

/// Encrypted message: `size` polynomials over R_q in the coefficient
/// domain, a degree-(size-1) polynomial in the secret key.
///
/// Fresh encryptions have size 2. Multiplying sizes M and N yields
/// M + N - 1; relinearization brings a ciphertext back to size 2. The
/// fingerprint records the parameters the ciphertext was produced under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ciphertext {
    pub(crate) data: Vec<RnsPoly>,
    pub(crate) fingerprint: u64,
}

impl Ciphertext {
    pub(crate) fn new(data: Vec<RnsPoly>, fingerprint: u64) -> Ciphertext {
        debug_assert!(data.len() >= 2);
        Ciphertext { data, fingerprint }
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    #[inline(always)]
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    #[inline(always)]
    pub(crate) fn at(&self, i: usize) -> &RnsPoly {
        &self.data[i]
    }

    #[inline(always)]
    pub(crate) fn at_mut(&mut self, i: usize) -> &mut RnsPoly {
        &mut self.data[i]
    }
}
