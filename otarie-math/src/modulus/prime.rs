use prime_factorization::Factorization;

use crate::modulus::barrett::BarrettPrecomp;

pub fn is_prime(q: u64) -> bool {
    Factorization::run(q).is_prime
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prime {
    pub q: u64,
    /// Distinct prime factors of q-1.
    pub factors: Vec<u64>,
    pub barrett: BarrettPrecomp,
}

impl Prime {
    /// Panics if q is not prime; callers validate untrusted moduli with
    /// [`is_prime`] first.
    pub fn new(q: u64) -> Prime {
        assert!(is_prime(q), "invalid argument: q = {} is not prime", q);
        let mut factors: Vec<u64> = Factorization::run(q - 1).factors;
        factors.dedup();
        Self {
            q,
            factors,
            barrett: BarrettPrecomp::new(q),
        }
    }

    #[inline(always)]
    pub fn q(&self) -> u64 {
        self.q
    }

    pub fn pow(&self, base: u64, mut exp: u64) -> u64 {
        let mut base: u64 = base % self.q;
        let mut r: u64 = 1;
        while exp > 0 {
            if exp & 1 == 1 {
                r = self.barrett.mul_mod(r, base);
            }
            base = self.barrett.mul_mod(base, base);
            exp >>= 1;
        }
        r
    }

    #[inline(always)]
    pub fn inv(&self, a: u64) -> u64 {
        self.pow(a, self.q - 2)
    }

    #[inline(always)]
    pub fn neg(&self, a: u64) -> u64 {
        debug_assert!(a < self.q);
        if a == 0 {
            0
        } else {
            self.q - a
        }
    }

    /// Smallest generator of the multiplicative group Z_q^*.
    pub fn primitive_root(&self) -> u64 {
        let phi: u64 = self.q - 1;
        'candidate: for g in 2..self.q {
            for f in self.factors.iter() {
                if self.pow(g, phi / f) == 1 {
                    continue 'candidate;
                }
            }
            return g;
        }
        unreachable!("no primitive root found for q = {}", self.q)
    }

    /// Primitive nth root of unity, with nth_root a power of two dividing q-1.
    pub fn primitive_nth_root(&self, nth_root: u64) -> u64 {
        assert!(
            nth_root & (nth_root - 1) == 0,
            "invalid argument: nth_root = {} is not a power of two",
            nth_root
        );
        assert!(
            (self.q - 1) % nth_root == 0,
            "invalid argument: nth_root = {} does not divide q-1 = {}",
            nth_root,
            self.q - 1
        );
        let psi: u64 = self.pow(self.primitive_root(), (self.q - 1) / nth_root);
        debug_assert!(self.pow(psi, nth_root >> 1) == self.q - 1);
        psi
    }
}
