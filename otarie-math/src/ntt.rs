use itertools::izip;

use crate::modulus::barrett::Barrett;
use crate::modulus::prime::Prime;
use crate::modulus::{ReduceOnce, WordOps};

/// Negacyclic number-theoretic transform over Z_q[X]/(X^n+1).
///
/// The forward transform maps the natural coefficient order to the
/// bit-reversed evaluation order; the backward transform inverts it.
pub struct NttTable {
    prime: Prime,
    n: usize,
    psi_forward_rev: Vec<Barrett>,
    psi_backward_rev: Vec<Barrett>,
    n_inv: Barrett,
}

impl NttTable {
    pub fn new(prime: Prime, n: usize) -> NttTable {
        assert!(
            n >= 2 && n & (n - 1) == 0,
            "invalid argument: n = {} is not a power of two",
            n
        );

        let psi: u64 = prime.primitive_nth_root((n as u64) << 1);
        let psi_inv: u64 = prime.inv(psi);

        let log_n: u32 = n.log2() as u32;

        let mut psi_forward_rev: Vec<Barrett> = vec![Barrett(0, 0); n];
        let mut psi_backward_rev: Vec<Barrett> = vec![Barrett(0, 0); n];

        let mut power_forward: u64 = 1;
        let mut power_backward: u64 = 1;
        psi_forward_rev[0] = prime.barrett.prepare(1);
        psi_backward_rev[0] = prime.barrett.prepare(1);
        for i in 1..n {
            power_forward = prime.barrett.mul_mod(power_forward, psi);
            power_backward = prime.barrett.mul_mod(power_backward, psi_inv);
            let i_rev: usize = i.reverse_bits_msb(log_n);
            psi_forward_rev[i_rev] = prime.barrett.prepare(power_forward);
            psi_backward_rev[i_rev] = prime.barrett.prepare(power_backward);
        }

        let n_inv: Barrett = prime.barrett.prepare(prime.inv(n as u64));

        Self {
            prime,
            n,
            psi_forward_rev,
            psi_backward_rev,
            n_inv,
        }
    }

    #[inline(always)]
    pub fn q(&self) -> u64 {
        self.prime.q
    }

    #[inline(always)]
    pub fn n(&self) -> usize {
        self.n
    }

    #[inline(always)]
    pub fn prime(&self) -> &Prime {
        &self.prime
    }

    pub fn forward_inplace(&self, a: &mut [u64]) {
        debug_assert!(a.len() == self.n);
        let q: u64 = self.prime.q;
        let log_n: usize = self.n.log2();
        for layer in 0..log_n {
            let m: usize = 1 << layer;
            let size: usize = 1 << (log_n - layer - 1);
            izip!(a.chunks_exact_mut(2 * size), &self.psi_forward_rev[m..]).for_each(
                |(blk, psi)| {
                    let (lo, hi) = blk.split_at_mut(size);
                    izip!(lo, hi).for_each(|(x, y)| {
                        let v: u64 = self.prime.barrett.mul_external(*psi, *y);
                        *y = (*x + q - v).reduce_once(q);
                        *x = (*x + v).reduce_once(q);
                    });
                },
            );
        }
    }

    pub fn backward_inplace(&self, a: &mut [u64]) {
        debug_assert!(a.len() == self.n);
        let q: u64 = self.prime.q;
        let log_n: usize = self.n.log2();
        for layer in (0..log_n).rev() {
            let m: usize = 1 << layer;
            let size: usize = 1 << (log_n - layer - 1);
            if layer == 0 {
                // Fold the 1/n scaling into the last butterfly.
                let psi: Barrett = self.prime.barrett.prepare(
                    self.prime
                        .barrett
                        .mul_external(self.n_inv, self.psi_backward_rev[1].value()),
                );
                let (lo, hi) = a.split_at_mut(size);
                izip!(lo, hi).for_each(|(x, y)| {
                    let u: u64 = *x;
                    let v: u64 = *y;
                    *x = self
                        .prime
                        .barrett
                        .mul_external(self.n_inv, (u + v).reduce_once(q));
                    *y = self.prime.barrett.mul_external(psi, u + q - v);
                });
            } else {
                izip!(a.chunks_exact_mut(2 * size), &self.psi_backward_rev[m..]).for_each(
                    |(blk, psi)| {
                        let (lo, hi) = blk.split_at_mut(size);
                        izip!(lo, hi).for_each(|(x, y)| {
                            let u: u64 = *x;
                            let v: u64 = *y;
                            *x = (u + v).reduce_once(q);
                            *y = self.prime.barrett.mul_external(*psi, u + q - v);
                        });
                    },
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ntt_roundtrip() {
        let q: u64 = 0x800000000004001;
        let n: usize = 32;
        let table: NttTable = NttTable::new(Prime::new(q), n);
        let mut a: Vec<u64> = (0..n as u64).collect();
        let b: Vec<u64> = a.clone();
        table.forward_inplace(&mut a);
        assert_ne!(a, b);
        table.backward_inplace(&mut a);
        assert_eq!(a, b);
    }

    #[test]
    fn test_ntt_negacyclic_product() {
        // (X) * (X) = X^2 and X^(n/2) * X^(n/2) = -1 in Z_q[X]/(X^n+1).
        let q: u64 = 65537;
        let n: usize = 16;
        let table: NttTable = NttTable::new(Prime::new(q), n);

        let mut x: Vec<u64> = vec![0; n];
        x[1] = 1;
        table.forward_inplace(&mut x);
        let mut prod: Vec<u64> = x.iter().map(|&v| table.prime().barrett.mul_mod(v, v)).collect();
        table.backward_inplace(&mut prod);
        let mut expected: Vec<u64> = vec![0; n];
        expected[2] = 1;
        assert_eq!(prod, expected);

        let mut h: Vec<u64> = vec![0; n];
        h[n / 2] = 1;
        table.forward_inplace(&mut h);
        let mut prod: Vec<u64> = h.iter().map(|&v| table.prime().barrett.mul_mod(v, v)).collect();
        table.backward_inplace(&mut prod);
        let mut expected: Vec<u64> = vec![0; n];
        expected[0] = q - 1;
        assert_eq!(prod, expected);
    }
}
