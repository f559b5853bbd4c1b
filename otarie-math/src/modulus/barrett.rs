use num_bigint::BigUint;
use num_traits::ToPrimitive;

use crate::modulus::ReduceOnce;

/// Value together with its precomputed Shoup quotient floor(value * 2^64 / q).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Barrett(pub u64, pub u64);

impl Barrett {
    #[inline(always)]
    pub fn value(&self) -> u64 {
        self.0
    }

    #[inline(always)]
    pub fn quotient(&self) -> u64 {
        self.1
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BarrettPrecomp {
    pub q: u64,
    pub two_q: u64,
    /// floor(2^128 / q), split in two words.
    lo: u64,
    hi: u64,
}

impl BarrettPrecomp {
    pub fn new(q: u64) -> BarrettPrecomp {
        debug_assert!(q > 1);
        let big_r: BigUint = (BigUint::from(1usize) << ((u64::BITS << 1) as usize)) / BigUint::from(q);
        let lo: u64 = (&big_r & BigUint::from(u64::MAX)).to_u64().unwrap();
        let hi: u64 = (big_r >> u64::BITS).to_u64().unwrap();
        Self {
            q,
            two_q: q << 1,
            lo,
            hi,
        }
    }

    /// Reduces an arbitrary word modulo q.
    #[inline(always)]
    pub fn reduce(&self, x: u64) -> u64 {
        let mhi: u64 = (((x as u128) * (self.hi as u128)) >> 64) as u64;
        x.wrapping_sub(mhi.wrapping_mul(self.q)).reduce_once(self.q)
    }

    /// Reduces a full 128-bit product modulo q.
    #[inline(always)]
    pub fn reduce_u128(&self, x: u128) -> u64 {
        let xlo: u64 = x as u64;
        let xhi: u64 = (x >> 64) as u64;
        // floor(x * floor(2^128/q) / 2^128), computed over the two limbs.
        let m0: u128 = (xlo as u128) * (self.lo as u128);
        let m1: u128 = (xlo as u128) * (self.hi as u128) + (m0 >> 64);
        let m2: u128 = (xhi as u128) * (self.lo as u128) + (m1 & 0xFFFF_FFFF_FFFF_FFFF);
        let quo: u64 = ((xhi as u128) * (self.hi as u128) + (m1 >> 64) + (m2 >> 64)) as u64;
        (x as u64)
            .wrapping_sub(quo.wrapping_mul(self.q))
            .reduce_once(self.q)
            .reduce_once(self.q)
    }

    /// Product of two residues modulo q.
    #[inline(always)]
    pub fn mul_mod(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.q && b < self.q);
        self.reduce_u128((a as u128) * (b as u128))
    }

    #[inline(always)]
    pub fn prepare(&self, v: u64) -> Barrett {
        debug_assert!(v < self.q);
        let quotient: u64 = (((v as u128) << 64) / self.q as u128) as u64;
        Barrett(v, quotient)
    }

    /// Shoup product lhs * rhs mod q, valid for any rhs word.
    #[inline(always)]
    pub fn mul_external(&self, lhs: Barrett, rhs: u64) -> u64 {
        let t: u64 = ((lhs.quotient() as u128 * rhs as u128) >> 64) as u64;
        rhs.wrapping_mul(lhs.value())
            .wrapping_sub(self.q.wrapping_mul(t))
            .reduce_once(self.q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce() {
        let q: u64 = 0x800000000004001;
        let precomp: BarrettPrecomp = BarrettPrecomp::new(q);
        assert_eq!(precomp.reduce(u64::MAX), u64::MAX % q);
        assert_eq!(precomp.reduce(q), 0);
        assert_eq!(precomp.reduce(q - 1), q - 1);
    }

    #[test]
    fn test_reduce_u128() {
        let q: u64 = 0x800000000004001;
        let precomp: BarrettPrecomp = BarrettPrecomp::new(q);
        let x: u128 = u128::MAX;
        assert_eq!(precomp.reduce_u128(x) as u128, x % (q as u128));
        assert_eq!(precomp.reduce_u128(0), 0);
        assert_eq!(precomp.reduce_u128((q as u128) * (q as u128)), 0);
    }

    #[test]
    fn test_mul_external() {
        let q: u64 = 0x1fffffffffe00001;
        let precomp: BarrettPrecomp = BarrettPrecomp::new(q);
        let a: u64 = q - 12345;
        let b: u64 = q - 67891;
        let expected: u64 = (((a as u128) * (b as u128)) % q as u128) as u64;
        assert_eq!(precomp.mul_external(precomp.prepare(a), b), expected);
        assert_eq!(precomp.mul_mod(a, b), expected);
    }
}
