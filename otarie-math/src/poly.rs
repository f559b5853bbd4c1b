use std::ops::{Deref, DerefMut};

/// Dense coefficient vector modulo a single prime factor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Poly(pub Vec<u64>);

impl Poly {
    pub fn new(n: usize) -> Poly {
        Poly(vec![0; n])
    }

    #[inline(always)]
    pub fn n(&self) -> usize {
        self.0.len()
    }

    pub fn zero(&mut self) {
        self.0.fill(0);
    }
}

impl Deref for Poly {
    type Target = [u64];

    fn deref(&self) -> &[u64] {
        &self.0
    }
}

impl DerefMut for Poly {
    fn deref_mut(&mut self) -> &mut [u64] {
        &mut self.0
    }
}

/// Polynomial in residue-number-system representation: one [`Poly`] per
/// prime factor of the modulus, all of identical degree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RnsPoly(pub Vec<Poly>);

impl RnsPoly {
    pub fn new(n: usize, factors: usize) -> RnsPoly {
        RnsPoly(vec![Poly::new(n); factors])
    }

    #[inline(always)]
    pub fn n(&self) -> usize {
        self.0[0].n()
    }

    #[inline(always)]
    pub fn factors(&self) -> usize {
        self.0.len()
    }

    #[inline(always)]
    pub fn at(&self, i: usize) -> &Poly {
        &self.0[i]
    }

    #[inline(always)]
    pub fn at_mut(&mut self, i: usize) -> &mut Poly {
        &mut self.0[i]
    }

    pub fn zero(&mut self) {
        self.0.iter_mut().for_each(|p| p.zero());
    }
}
