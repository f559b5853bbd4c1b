use itertools::izip;
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{ToPrimitive, Zero};

use crate::modulus::prime::Prime;
use crate::modulus::ReduceOnce;
use crate::ntt::NttTable;
use crate::poly::{Poly, RnsPoly};

/// Arithmetic over Z_Q[X]/(X^n+1) with Q split into distinct NTT-friendly
/// prime factors. Polynomials are held in RNS form; CRT composition to and
/// from multi-precision integers is exact.
pub struct RnsRing {
    n: usize,
    tables: Vec<NttTable>,
    modulus: BigUint,
    half_modulus: BigUint,
    /// crt_lift[i] = (Q/q_i) * ((Q/q_i)^-1 mod q_i) mod Q.
    crt_lift: Vec<BigUint>,
}

impl RnsRing {
    /// Panics if a factor is not prime or does not support a degree-n NTT;
    /// untrusted moduli are validated by the caller.
    pub fn new(n: usize, moduli: &[u64]) -> RnsRing {
        assert!(!moduli.is_empty(), "invalid argument: empty moduli");

        let tables: Vec<NttTable> = moduli
            .iter()
            .map(|&q| NttTable::new(Prime::new(q), n))
            .collect();

        let modulus: BigUint = moduli.iter().map(|&q| BigUint::from(q)).product();
        let half_modulus: BigUint = &modulus >> 1;

        let crt_lift: Vec<BigUint> = izip!(moduli, tables.iter())
            .map(|(&q, table)| {
                let puncture: BigUint = &modulus / q;
                let puncture_mod_q: u64 = (&puncture % q).to_u64().unwrap();
                (&puncture * table.prime().inv(puncture_mod_q)) % &modulus
            })
            .collect();

        Self {
            n,
            tables,
            modulus,
            half_modulus,
            crt_lift,
        }
    }

    #[inline(always)]
    pub fn n(&self) -> usize {
        self.n
    }

    #[inline(always)]
    pub fn factors(&self) -> usize {
        self.tables.len()
    }

    #[inline(always)]
    pub fn table(&self, i: usize) -> &NttTable {
        &self.tables[i]
    }

    #[inline(always)]
    pub fn tables(&self) -> &[NttTable] {
        &self.tables
    }

    #[inline(always)]
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    pub fn moduli(&self) -> Vec<u64> {
        self.tables.iter().map(|t| t.q()).collect()
    }

    pub fn new_poly(&self) -> RnsPoly {
        RnsPoly::new(self.n, self.tables.len())
    }

    fn check(&self, a: &RnsPoly) {
        debug_assert!(a.n() == self.n, "invalid poly: n = {} != {}", a.n(), self.n);
        debug_assert!(
            a.factors() == self.tables.len(),
            "invalid poly: factors = {} != {}",
            a.factors(),
            self.tables.len()
        );
    }

    // Elementwise ops, one pass per factor.

    /// a += b
    pub fn add_assign(&self, a: &mut RnsPoly, b: &RnsPoly) {
        self.check(a);
        self.check(b);
        izip!(self.tables.iter(), a.0.iter_mut(), b.0.iter()).for_each(|(table, a, b)| {
            let q: u64 = table.q();
            izip!(a.iter_mut(), b.iter()).for_each(|(a, b)| *a = (*a + *b).reduce_once(q));
        });
    }

    /// a -= b
    pub fn sub_assign(&self, a: &mut RnsPoly, b: &RnsPoly) {
        self.check(a);
        self.check(b);
        izip!(self.tables.iter(), a.0.iter_mut(), b.0.iter()).for_each(|(table, a, b)| {
            let q: u64 = table.q();
            izip!(a.iter_mut(), b.iter()).for_each(|(a, b)| *a = (*a + q - *b).reduce_once(q));
        });
    }

    /// a = -a
    pub fn neg_assign(&self, a: &mut RnsPoly) {
        self.check(a);
        izip!(self.tables.iter(), a.0.iter_mut()).for_each(|(table, a)| {
            let q: u64 = table.q();
            a.iter_mut().for_each(|a| {
                if *a != 0 {
                    *a = q - *a
                }
            });
        });
    }

    /// a[j] += scalars[i] * m[j] per factor i, for m of degree <= n.
    pub fn mul_scalar_add_assign(&self, scalars: &[u64], m: &[u64], a: &mut RnsPoly) {
        self.check(a);
        debug_assert!(scalars.len() == self.tables.len());
        debug_assert!(m.len() <= self.n);
        izip!(self.tables.iter(), scalars.iter(), a.0.iter_mut()).for_each(|(table, s, a)| {
            let barrett = &table.prime().barrett;
            izip!(a.iter_mut(), m.iter()).for_each(|(a, m)| {
                *a = (*a + barrett.mul_mod(*s, *m % table.q())).reduce_once(table.q());
            });
        });
    }

    /// a[j] += scalars[i] * b[j] per factor i.
    pub fn scalar_mul_add_assign(&self, scalars: &[u64], b: &RnsPoly, a: &mut RnsPoly) {
        self.check(a);
        self.check(b);
        debug_assert!(scalars.len() == self.tables.len());
        izip!(self.tables.iter(), scalars.iter(), a.0.iter_mut(), b.0.iter()).for_each(
            |(table, s, a, b)| {
                let barrett = &table.prime().barrett;
                let q: u64 = table.q();
                izip!(a.iter_mut(), b.iter()).for_each(|(a, b)| {
                    *a = (*a + barrett.mul_mod(*s, *b)).reduce_once(q);
                });
            },
        );
    }

    /// Embeds a signed polynomial, mapping negatives to q_i - |e|.
    pub fn from_signed_into(&self, e: &[i64], a: &mut RnsPoly) {
        self.check(a);
        debug_assert!(e.len() == self.n);
        izip!(self.tables.iter(), a.0.iter_mut()).for_each(|(table, a)| {
            let q: u64 = table.q();
            izip!(a.iter_mut(), e.iter()).for_each(|(a, e)| {
                *a = if *e < 0 {
                    q - ((e.unsigned_abs()) % q)
                } else {
                    (*e as u64) % q
                };
            });
        });
    }

    /// a += e for a signed polynomial e.
    pub fn add_signed_assign(&self, e: &[i64], a: &mut RnsPoly) {
        self.check(a);
        debug_assert!(e.len() == self.n);
        izip!(self.tables.iter(), a.0.iter_mut()).for_each(|(table, a)| {
            let q: u64 = table.q();
            izip!(a.iter_mut(), e.iter()).for_each(|(a, e)| {
                let v: u64 = if *e < 0 {
                    q - (e.unsigned_abs() % q)
                } else {
                    (*e as u64) % q
                };
                *a = (*a + v).reduce_once(q);
            });
        });
    }

    // NTT.

    pub fn ntt_assign(&self, a: &mut RnsPoly) {
        self.check(a);
        izip!(self.tables.iter(), a.0.iter_mut()).for_each(|(table, a)| {
            table.forward_inplace(a);
        });
    }

    pub fn intt_assign(&self, a: &mut RnsPoly) {
        self.check(a);
        izip!(self.tables.iter(), a.0.iter_mut()).for_each(|(table, a)| {
            table.backward_inplace(a);
        });
    }

    /// Forward NTT over a flat buffer of factors() contiguous degree-n rows.
    pub fn ntt_flat(&self, a: &mut [u64]) {
        debug_assert!(a.len() == self.n * self.tables.len());
        izip!(self.tables.iter(), a.chunks_exact_mut(self.n)).for_each(|(table, a)| {
            table.forward_inplace(a);
        });
    }

    pub fn intt_flat(&self, a: &mut [u64]) {
        debug_assert!(a.len() == self.n * self.tables.len());
        izip!(self.tables.iter(), a.chunks_exact_mut(self.n)).for_each(|(table, a)| {
            table.backward_inplace(a);
        });
    }

    // Pointwise products in the evaluation domain.

    /// a = a (.) b
    pub fn dyadic_mul_assign(&self, a: &mut RnsPoly, b: &RnsPoly) {
        self.check(a);
        self.check(b);
        izip!(self.tables.iter(), a.0.iter_mut(), b.0.iter()).for_each(|(table, a, b)| {
            let barrett = &table.prime().barrett;
            izip!(a.iter_mut(), b.iter()).for_each(|(a, b)| *a = barrett.mul_mod(*a, *b));
        });
    }

    /// c += a (.) b
    pub fn dyadic_mul_add_assign(&self, a: &RnsPoly, b: &RnsPoly, c: &mut RnsPoly) {
        self.check(a);
        self.check(b);
        self.check(c);
        izip!(self.tables.iter(), a.0.iter(), b.0.iter(), c.0.iter_mut()).for_each(
            |(table, a, b, c)| {
                let barrett = &table.prime().barrett;
                let q: u64 = table.q();
                izip!(a.iter(), b.iter(), c.iter_mut())
                    .for_each(|(a, b, c)| *c = (*c + barrett.mul_mod(*a, *b)).reduce_once(q));
            },
        );
    }

    /// c += a (.) b over flat buffers of factors() degree-n rows.
    pub fn dyadic_mul_add_flat(&self, a: &[u64], b: &[u64], c: &mut [u64]) {
        debug_assert!(a.len() == self.n * self.tables.len());
        debug_assert!(b.len() == a.len() && c.len() == a.len());
        izip!(
            self.tables.iter(),
            a.chunks_exact(self.n),
            b.chunks_exact(self.n),
            c.chunks_exact_mut(self.n)
        )
        .for_each(|(table, a, b, c)| {
            let barrett = &table.prime().barrett;
            let q: u64 = table.q();
            izip!(a.iter(), b.iter(), c.iter_mut())
                .for_each(|(a, b, c)| *c = (*c + barrett.mul_mod(*a, *b)).reduce_once(q));
        });
    }

    // Galois automorphisms X^i -> X^(i*gal mod 2n), coefficient domain.

    pub fn automorphism_into(&self, gal: u64, src: &RnsPoly, dst: &mut RnsPoly) {
        self.check(src);
        self.check(dst);
        debug_assert!(gal & 1 == 1, "invalid argument: gal = {} is even", gal);
        izip!(self.tables.iter(), src.0.iter(), dst.0.iter_mut()).for_each(|(table, src, dst)| {
            apply_automorphism(src, dst, gal, table.q());
        });
    }

    // CRT composition and decomposition.

    /// out[j] = a(j) recombined in [0, Q).
    pub fn compose_into(&self, a: &RnsPoly, out: &mut [BigUint]) {
        self.check(a);
        debug_assert!(out.len() == self.n);
        for (j, out) in out.iter_mut().enumerate() {
            let mut acc: BigUint = BigUint::zero();
            izip!(a.0.iter(), self.crt_lift.iter()).for_each(|(poly, lift)| {
                acc += lift * poly[j];
            });
            *out = acc % &self.modulus;
        }
    }

    /// out[j] = a(j) recombined and centered in (-Q/2, Q/2].
    pub fn compose_centered_into(&self, a: &RnsPoly, out: &mut [BigInt]) {
        self.check(a);
        debug_assert!(out.len() == self.n);
        for (j, out) in out.iter_mut().enumerate() {
            let mut acc: BigUint = BigUint::zero();
            izip!(a.0.iter(), self.crt_lift.iter()).for_each(|(poly, lift)| {
                acc += lift * poly[j];
            });
            acc %= &self.modulus;
            if acc > self.half_modulus {
                *out = -BigInt::from_biguint(Sign::Plus, &self.modulus - acc);
            } else {
                *out = BigInt::from_biguint(Sign::Plus, acc);
            }
        }
    }

    /// compose_centered_into over a flat buffer of factors() degree-n rows.
    pub fn compose_centered_flat(&self, a: &[u64], out: &mut [BigInt]) {
        debug_assert!(a.len() == self.n * self.tables.len());
        debug_assert!(out.len() == self.n);
        for (j, out) in out.iter_mut().enumerate() {
            let mut acc: BigUint = BigUint::zero();
            izip!(a.chunks_exact(self.n), self.crt_lift.iter()).for_each(|(row, lift)| {
                acc += lift * row[j];
            });
            acc %= &self.modulus;
            if acc > self.half_modulus {
                *out = -BigInt::from_biguint(Sign::Plus, &self.modulus - acc);
            } else {
                *out = BigInt::from_biguint(Sign::Plus, acc);
            }
        }
    }

    /// reduce_signed_into over a flat buffer of factors() degree-n rows.
    pub fn reduce_signed_flat(&self, coeffs: &[BigInt], a: &mut [u64]) {
        debug_assert!(a.len() == self.n * self.tables.len());
        debug_assert!(coeffs.len() <= self.n);
        a.fill(0);
        izip!(self.tables.iter(), a.chunks_exact_mut(self.n)).for_each(|(table, row)| {
            let q: u64 = table.q();
            izip!(coeffs.iter(), row.iter_mut()).for_each(|(c, a)| {
                let (sign, digits) = c.to_u64_digits();
                let mut r: u64 = 0;
                for d in digits.iter().rev() {
                    r = reduce_word(r, *d, table);
                }
                *a = match sign {
                    Sign::Minus => {
                        if r == 0 {
                            0
                        } else {
                            q - r
                        }
                    }
                    _ => r,
                };
            });
        });
    }

    /// Reduces signed multi-precision coefficients into RNS form.
    pub fn reduce_signed_into(&self, coeffs: &[BigInt], a: &mut RnsPoly) {
        self.check(a);
        debug_assert!(coeffs.len() <= self.n);
        a.zero();
        izip!(self.tables.iter(), a.0.iter_mut()).for_each(|(table, a)| {
            let q: u64 = table.q();
            izip!(coeffs.iter(), a.iter_mut()).for_each(|(c, a)| {
                let (sign, digits) = c.to_u64_digits();
                let mut r: u64 = 0;
                for d in digits.iter().rev() {
                    r = reduce_word(r, *d, table);
                }
                *a = match sign {
                    Sign::Minus => {
                        if r == 0 {
                            0
                        } else {
                            q - r
                        }
                    }
                    _ => r,
                };
            });
        });
    }

    /// Reduces unsigned multi-precision coefficients into RNS form.
    pub fn reduce_unsigned_into(&self, coeffs: &[BigUint], a: &mut RnsPoly) {
        self.check(a);
        debug_assert!(coeffs.len() <= self.n);
        a.zero();
        izip!(self.tables.iter(), a.0.iter_mut()).for_each(|(table, a)| {
            izip!(coeffs.iter(), a.iter_mut()).for_each(|(c, a)| {
                let mut r: u64 = 0;
                for d in c.to_u64_digits().iter().rev() {
                    r = reduce_word(r, *d, table);
                }
                *a = r;
            });
        });
    }
}

/// Horner step: (r * 2^64 + d) mod q.
#[inline(always)]
fn reduce_word(r: u64, d: u64, table: &NttTable) -> u64 {
    let barrett = &table.prime().barrett;
    barrett.reduce_u128(((r as u128) << 64) | (d as u128))
}

/// dst = src(X^gal) in Z_q[X]/(X^n+1), coefficient domain.
pub fn apply_automorphism(src: &[u64], dst: &mut [u64], gal: u64, q: u64) {
    let n: usize = src.len();
    debug_assert!(dst.len() == n);
    debug_assert!(n & (n - 1) == 0);
    let mask: u64 = ((n as u64) << 1) - 1;
    for (i, &v) in src.iter().enumerate() {
        let k: u64 = ((i as u64) * gal) & mask;
        if k < n as u64 {
            dst[k as usize] = v;
        } else {
            dst[(k - n as u64) as usize] = if v == 0 { 0 } else { q - v };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::One;

    fn test_ring() -> RnsRing {
        RnsRing::new(16, &[65537, 114689])
    }

    #[test]
    fn test_compose_roundtrip() {
        let ring: RnsRing = test_ring();
        let mut a: RnsPoly = ring.new_poly();
        for (i, table) in ring.tables().iter().enumerate() {
            for j in 0..ring.n() {
                a.at_mut(i)[j] = ((j as u64) * 123457 + i as u64) % table.q();
            }
        }
        let mut composed: Vec<BigUint> = vec![BigUint::zero(); ring.n()];
        ring.compose_into(&a, &mut composed);
        let mut b: RnsPoly = ring.new_poly();
        ring.reduce_unsigned_into(&composed, &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_compose_centered() {
        let ring: RnsRing = test_ring();
        let mut a: RnsPoly = ring.new_poly();
        // Residues of -1 mod Q.
        for (i, table) in ring.tables().iter().enumerate() {
            a.at_mut(i)[0] = table.q() - 1;
        }
        let mut out: Vec<BigInt> = vec![BigInt::zero(); ring.n()];
        ring.compose_centered_into(&a, &mut out);
        assert_eq!(out[0], BigInt::from(-1));
        assert!(out[1..].iter().all(|c| c.is_zero()));

        let mut b: RnsPoly = ring.new_poly();
        ring.reduce_signed_into(&out, &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_negacyclic_convolution_via_ntt() {
        // (1 + X) * (1 + X^(n-1)) = 1 + X + X^(n-1) + X^n = X + X^(n-1).
        let ring: RnsRing = test_ring();
        let mut a: RnsPoly = ring.new_poly();
        let mut b: RnsPoly = ring.new_poly();
        for i in 0..ring.factors() {
            a.at_mut(i)[0] = 1;
            a.at_mut(i)[1] = 1;
            b.at_mut(i)[0] = 1;
            b.at_mut(i)[ring.n() - 1] = 1;
        }
        ring.ntt_assign(&mut a);
        ring.ntt_assign(&mut b);
        ring.dyadic_mul_assign(&mut a, &b);
        ring.intt_assign(&mut a);

        let mut expected: RnsPoly = ring.new_poly();
        for i in 0..ring.factors() {
            expected.at_mut(i)[1] = 1;
            expected.at_mut(i)[ring.n() - 1] = 1;
        }
        assert_eq!(a, expected);
    }

    #[test]
    fn test_automorphism() {
        // With n = 16, X -> X^3 maps X^6 to X^18 = -X^2.
        let ring: RnsRing = test_ring();
        let mut a: RnsPoly = ring.new_poly();
        for i in 0..ring.factors() {
            a.at_mut(i)[6] = 1;
        }
        let mut b: RnsPoly = ring.new_poly();
        ring.automorphism_into(3, &a, &mut b);
        for (i, table) in ring.tables().iter().enumerate() {
            assert_eq!(b.at(i)[2], table.q() - 1);
            assert_eq!(b.at(i).iter().filter(|&&v| v != 0).count(), 1);
        }
    }

    #[test]
    fn test_modulus_product() {
        let ring: RnsRing = test_ring();
        let expected: BigUint = BigUint::one() * 65537u64 * 114689u64;
        assert_eq!(*ring.modulus(), expected);
    }
}
