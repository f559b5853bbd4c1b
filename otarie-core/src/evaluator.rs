use std::sync::Arc;

use itertools::izip;
use num_bigint::{BigInt, BigUint};
use num_traits::{One, ToPrimitive, Zero};

use otarie_math::bigint::DivRound;
use otarie_math::modulus::ReduceOnce;
use otarie_math::poly::RnsPoly;
use otarie_math::ring::RnsRing;

use crate::ciphertext::Ciphertext;
use crate::context::Context;
use crate::error::{HeError, Result};
use crate::keys::{EvaluationKeySet, GaloisKeySet, KswKey};
use crate::plaintext::Plaintext;
use crate::scratch::{global_pool, Scratch};

/// Homomorphic arithmetic over ciphertexts.
///
/// Every operation is exact modular arithmetic; correctness of the
/// decrypted result is governed solely by the remaining invariant noise
/// budget, which the evaluator never inspects. Operands must carry the
/// evaluator's parameter fingerprint.
///
/// The heavy operations come in two flavors: the plain variant draws
/// temporary space from the process-wide pool, the `_scratch` variant
/// works inside a caller-provided arena sized by the matching
/// `*_scratch_words` method.
pub struct Evaluator {
    ctx: Arc<Context>,
}

impl Evaluator {
    pub fn new(ctx: Arc<Context>) -> Evaluator {
        Evaluator { ctx }
    }

    fn check_ct(&self, ct: &Ciphertext) -> Result<()> {
        self.ctx.check_fingerprint(ct.fingerprint(), "ciphertext")
    }

    fn check_plain(&self, plain: &Plaintext) -> Result<()> {
        let n: usize = self.ctx.n();
        if plain.coeff_count() > n {
            return Err(HeError::PlaintextTooLarge {
                degree: plain.coeff_count(),
                limit: n,
            });
        }
        let t: u64 = self.ctx.plain_modulus();
        if plain.coeffs().iter().any(|&c| c >= t) {
            return Err(HeError::InvalidParameters(format!(
                "plaintext coefficient not reduced modulo plain_modulus = {}",
                t
            )));
        }
        Ok(())
    }

    pub fn negate(&self, a: &Ciphertext) -> Result<Ciphertext> {
        self.check_ct(a)?;
        let ring: &RnsRing = self.ctx.ring();
        let mut data: Vec<RnsPoly> = a.data.clone();
        data.iter_mut().for_each(|p| ring.neg_assign(p));
        Ok(Ciphertext::new(data, a.fingerprint()))
    }

    pub fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        self.add_sub_impl(a, b, false)
    }

    pub fn sub(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        self.add_sub_impl(a, b, true)
    }

    /// Componentwise sum; a shorter operand acts as zero on the missing
    /// components.
    fn add_sub_impl(&self, a: &Ciphertext, b: &Ciphertext, negate: bool) -> Result<Ciphertext> {
        self.check_ct(a)?;
        self.check_ct(b)?;
        let ring: &RnsRing = self.ctx.ring();
        let size: usize = a.size().max(b.size());
        let mut data: Vec<RnsPoly> = Vec::with_capacity(size);
        for i in 0..size {
            if i < a.size() && i < b.size() {
                let mut p: RnsPoly = a.at(i).clone();
                if negate {
                    ring.sub_assign(&mut p, b.at(i));
                } else {
                    ring.add_assign(&mut p, b.at(i));
                }
                data.push(p);
            } else if i < a.size() {
                data.push(a.at(i).clone());
            } else {
                let mut p: RnsPoly = b.at(i).clone();
                if negate {
                    ring.neg_assign(&mut p);
                }
                data.push(p);
            }
        }
        Ok(Ciphertext::new(data, a.fingerprint()))
    }

    pub fn add_many(&self, cts: &[Ciphertext]) -> Result<Ciphertext> {
        let (first, rest) = cts.split_first().ok_or_else(|| {
            HeError::InvalidParameters("add_many requires at least one ciphertext".to_string())
        })?;
        let mut acc: Ciphertext = first.clone();
        self.check_ct(&acc)?;
        for ct in rest {
            acc = self.add(&acc, ct)?;
        }
        Ok(acc)
    }

    pub fn add_plain(&self, a: &Ciphertext, plain: &Plaintext) -> Result<Ciphertext> {
        self.check_ct(a)?;
        self.check_plain(plain)?;
        let ring: &RnsRing = self.ctx.ring();
        let mut result: Ciphertext = a.clone();
        ring.mul_scalar_add_assign(self.ctx.delta_mod_q(), plain.coeffs(), result.at_mut(0));
        Ok(result)
    }

    pub fn sub_plain(&self, a: &Ciphertext, plain: &Plaintext) -> Result<Ciphertext> {
        self.check_ct(a)?;
        self.check_plain(plain)?;
        let ring: &RnsRing = self.ctx.ring();
        let neg_delta: Vec<u64> = izip!(ring.moduli(), self.ctx.delta_mod_q())
            .map(|(q, &d)| if d == 0 { 0 } else { q - d })
            .collect();
        let mut result: Ciphertext = a.clone();
        ring.mul_scalar_add_assign(&neg_delta, plain.coeffs(), result.at_mut(0));
        Ok(result)
    }

    /// Multiplies by the centered lift of the plaintext polynomial, so
    /// noise grows with the balanced magnitude of its coefficients.
    pub fn multiply_plain(&self, a: &Ciphertext, plain: &Plaintext) -> Result<Ciphertext> {
        self.check_ct(a)?;
        self.check_plain(plain)?;
        let ring: &RnsRing = self.ctx.ring();
        let t: u64 = self.ctx.plain_modulus();
        let threshold: u64 = self.ctx.plain_upper_half_threshold();

        let mut lift: RnsPoly = ring.new_poly();
        for (fi, table) in ring.tables().iter().enumerate() {
            let q: u64 = table.q();
            for (j, &m) in plain.coeffs().iter().enumerate() {
                lift.at_mut(fi)[j] = if m >= threshold {
                    let mag: u64 = (t - m) % q;
                    if mag == 0 {
                        0
                    } else {
                        q - mag
                    }
                } else {
                    m % q
                };
            }
        }
        ring.ntt_assign(&mut lift);

        let mut data: Vec<RnsPoly> = a.data.clone();
        for p in data.iter_mut() {
            ring.ntt_assign(p);
            ring.dyadic_mul_assign(p, &lift);
            ring.intt_assign(p);
        }
        Ok(Ciphertext::new(data, a.fingerprint()))
    }

    /// Scratch words needed by `multiply_scratch` for the given operand
    /// sizes.
    pub fn multiply_scratch_words(&self, size_a: usize, size_b: usize) -> usize {
        let flat: usize = self.ctx.ext_ring().factors() * self.ctx.n();
        (2 * (size_a + size_b) - 1) * flat
    }

    pub fn multiply(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        let mut owned = global_pool().take(self.multiply_scratch_words(a.size(), b.size()));
        let result: Result<Ciphertext> = self.multiply_scratch(a, b, &mut owned.borrow());
        global_pool().recycle(owned);
        result
    }

    /// Exact tensor product: operands are recombined over the integers,
    /// carried into the extended NTT basis, convolved, scaled by t/q with
    /// rounding, and reduced back into the base ring. The result has size
    /// a.size() + b.size() - 1.
    pub fn multiply_scratch(
        &self,
        a: &Ciphertext,
        b: &Ciphertext,
        scratch: &mut Scratch<'_>,
    ) -> Result<Ciphertext> {
        self.check_ct(a)?;
        self.check_ct(b)?;

        let ring: &RnsRing = self.ctx.ring();
        let ext: &RnsRing = self.ctx.ext_ring();
        let n: usize = self.ctx.n();
        let result_size: usize = a.size() + b.size() - 1;

        let mut composed: Vec<BigInt> = vec![BigInt::zero(); n];
        let a_ext: Vec<&mut [u64]> = self.lift_to_ext(a, &mut composed, scratch);
        let b_ext: Vec<&mut [u64]> = self.lift_to_ext(b, &mut composed, scratch);

        let t_int: BigInt = BigInt::from(self.ctx.plain_modulus());
        let q_int: BigInt = BigInt::from(self.ctx.total_coeff_modulus().clone());

        let mut data: Vec<RnsPoly> = Vec::with_capacity(result_size);
        for r in 0..result_size {
            let out: &mut [u64] = scratch.take_slice(ext.factors() * n);
            for i in 0..a.size() {
                for j in 0..b.size() {
                    if i + j == r {
                        ext.dyadic_mul_add_flat(&a_ext[i], &b_ext[j], out);
                    }
                }
            }
            ext.intt_flat(out);
            ext.compose_centered_flat(out, &mut composed);
            for c in composed.iter_mut() {
                *c = (&*c * &t_int).div_round(&q_int);
            }
            let mut poly: RnsPoly = ring.new_poly();
            ring.reduce_signed_into(&composed, &mut poly);
            data.push(poly);
        }

        Ok(Ciphertext::new(data, a.fingerprint()))
    }

    /// Components of ct recombined over the integers, reduced into the
    /// extended basis and transformed, each in a slice off the scratch.
    fn lift_to_ext<'a>(
        &self,
        ct: &Ciphertext,
        composed: &mut [BigInt],
        scratch: &mut Scratch<'a>,
    ) -> Vec<&'a mut [u64]> {
        let ring: &RnsRing = self.ctx.ring();
        let ext: &RnsRing = self.ctx.ext_ring();
        let mut out: Vec<&'a mut [u64]> = Vec::with_capacity(ct.size());
        for i in 0..ct.size() {
            let buf: &'a mut [u64] = scratch.take_slice(ext.factors() * self.ctx.n());
            ring.compose_centered_into(ct.at(i), composed);
            ext.reduce_signed_flat(composed, buf);
            ext.ntt_flat(buf);
            out.push(buf);
        }
        out
    }

    pub fn square(&self, a: &Ciphertext) -> Result<Ciphertext> {
        self.multiply(a, a)
    }

    pub fn square_scratch(&self, a: &Ciphertext, scratch: &mut Scratch<'_>) -> Result<Ciphertext> {
        self.multiply_scratch(a, a, scratch)
    }

    /// Folds the product of all operands as a balanced tree, relinearizing
    /// every intermediate product back to size 2.
    pub fn multiply_many(
        &self,
        cts: &[Ciphertext],
        keys: &EvaluationKeySet,
    ) -> Result<Ciphertext> {
        if cts.is_empty() {
            return Err(HeError::InvalidParameters(
                "multiply_many requires at least one ciphertext".to_string(),
            ));
        }
        for ct in cts {
            self.check_ct(ct)?;
        }
        let mut layer: Vec<Ciphertext> = cts.to_vec();
        while layer.len() > 1 {
            let mut next: Vec<Ciphertext> = Vec::with_capacity(layer.len().div_ceil(2));
            for pair in layer.chunks(2) {
                if let [a, b] = pair {
                    next.push(self.relinearize(&self.multiply(a, b)?, keys)?);
                } else {
                    next.push(pair[0].clone());
                }
            }
            layer = next;
        }
        Ok(layer.swap_remove(0))
    }

    /// Scratch words needed by one key-switching pass (`relinearize_scratch`,
    /// `rotate_rows_scratch` per decomposed step, `rotate_columns_scratch`).
    pub fn key_switch_scratch_words(&self) -> usize {
        3 * self.ctx.ring().factors() * self.ctx.n()
    }

    pub fn relinearize(&self, a: &Ciphertext, keys: &EvaluationKeySet) -> Result<Ciphertext> {
        let mut owned = global_pool().take(self.key_switch_scratch_words());
        let result: Result<Ciphertext> = self.relinearize_scratch(a, keys, &mut owned.borrow());
        global_pool().recycle(owned);
        result
    }

    /// Switches every component beyond the first two back onto (1, s),
    /// yielding a size-2 ciphertext of the same message.
    pub fn relinearize_scratch(
        &self,
        a: &Ciphertext,
        keys: &EvaluationKeySet,
        scratch: &mut Scratch<'_>,
    ) -> Result<Ciphertext> {
        self.check_ct(a)?;
        self.ctx
            .check_fingerprint(keys.fingerprint(), "evaluation keys")?;
        if a.size() == 2 {
            return Ok(a.clone());
        }
        let needed: usize = a.size() - 2;
        if keys.count() < needed {
            return Err(HeError::InsufficientEvaluationKeys(format!(
                "relinearizing a size-{} ciphertext needs {} keys, set holds {}",
                a.size(),
                needed,
                keys.count()
            )));
        }

        let ring: &RnsRing = self.ctx.ring();
        let flat: usize = ring.factors() * self.ctx.n();
        let acc0: &mut [u64] = scratch.take_slice(flat);
        let acc1: &mut [u64] = scratch.take_slice(flat);
        let digit: &mut [u64] = scratch.take_slice(flat);

        for j in 2..a.size() {
            self.key_switch_accumulate(
                a.at(j),
                &keys.keys[j - 2],
                keys.decomposition_bit_count(),
                acc0,
                acc1,
                digit,
            );
        }
        ring.intt_flat(acc0);
        ring.intt_flat(acc1);

        let mut c0: RnsPoly = a.at(0).clone();
        add_flat(ring, acc0, &mut c0);
        let mut c1: RnsPoly = a.at(1).clone();
        add_flat(ring, acc1, &mut c1);

        Ok(Ciphertext::new(vec![c0, c1], a.fingerprint()))
    }

    /// acc += sum_l digit_l(input) (.) key_l, NTT domain. The digit buffer
    /// is scratch space overwritten per digit.
    fn key_switch_accumulate(
        &self,
        input: &RnsPoly,
        key: &KswKey,
        decomposition_bit_count: usize,
        acc0: &mut [u64],
        acc1: &mut [u64],
        digit: &mut [u64],
    ) {
        let ring: &RnsRing = self.ctx.ring();
        let n: usize = self.ctx.n();

        let mut composed: Vec<BigUint> = vec![BigUint::zero(); n];
        ring.compose_into(input, &mut composed);
        let mask: BigUint = (BigUint::one() << decomposition_bit_count) - 1u32;

        for l in 0..key.digits() {
            let shift: usize = decomposition_bit_count * l;
            for (j, x) in composed.iter().enumerate() {
                let d: u64 = ((x >> shift) & &mask).to_u64().unwrap_or(0);
                for (fi, table) in ring.tables().iter().enumerate() {
                    digit[fi * n + j] = table.prime().barrett.reduce(d);
                }
            }
            ring.ntt_flat(digit);
            izip!(
                ring.tables().iter(),
                digit.chunks_exact(n),
                acc0.chunks_exact_mut(n),
                acc1.chunks_exact_mut(n),
                key.k0[l].0.iter(),
                key.k1[l].0.iter()
            )
            .for_each(|(table, d, a0, a1, k0, k1)| {
                let barrett = &table.prime().barrett;
                let q: u64 = table.q();
                izip!(d.iter(), a0.iter_mut(), k0.iter()).for_each(|(d, a, k)| {
                    *a = (*a + barrett.mul_mod(*d, *k)).reduce_once(q);
                });
                izip!(d.iter(), a1.iter_mut(), k1.iter()).for_each(|(d, a, k)| {
                    *a = (*a + barrett.mul_mod(*d, *k)).reduce_once(q);
                });
            });
        }
    }

    /// Applies the Galois automorphism and switches the rotated c1 back
    /// onto the secret key.
    fn apply_galois(
        &self,
        a: &Ciphertext,
        galois_elt: u64,
        keys: &GaloisKeySet,
        scratch: &mut Scratch<'_>,
    ) -> Result<Ciphertext> {
        if a.size() != 2 {
            return Err(HeError::InvalidParameters(format!(
                "rotation requires a size-2 ciphertext, got size {}; relinearize first",
                a.size()
            )));
        }
        let key: &KswKey = keys.keys.get(&galois_elt).ok_or_else(|| {
            HeError::InsufficientEvaluationKeys(format!(
                "no Galois key for element {}",
                galois_elt
            ))
        })?;

        let ring: &RnsRing = self.ctx.ring();
        let mut c0: RnsPoly = ring.new_poly();
        ring.automorphism_into(galois_elt, a.at(0), &mut c0);
        let mut c1_rot: RnsPoly = ring.new_poly();
        ring.automorphism_into(galois_elt, a.at(1), &mut c1_rot);

        let flat: usize = ring.factors() * self.ctx.n();
        let acc0: &mut [u64] = scratch.take_slice(flat);
        let acc1: &mut [u64] = scratch.take_slice(flat);
        let digit: &mut [u64] = scratch.take_slice(flat);
        self.key_switch_accumulate(
            &c1_rot,
            key,
            keys.decomposition_bit_count(),
            acc0,
            acc1,
            digit,
        );
        ring.intt_flat(acc0);
        ring.intt_flat(acc1);

        add_flat(ring, acc0, &mut c0);
        let mut c1: RnsPoly = ring.new_poly();
        add_flat(ring, acc1, &mut c1);

        Ok(Ciphertext::new(vec![c0, c1], a.fingerprint()))
    }

    fn check_rotation(&self, a: &Ciphertext, keys: &GaloisKeySet) -> Result<()> {
        self.check_ct(a)?;
        self.ctx
            .check_fingerprint(keys.fingerprint(), "Galois keys")?;
        if !self.ctx.qualifiers().using_batching {
            return Err(HeError::BatchingNotSupported(
                "rotations act on batched slots, but the parameters do not support batching"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn rotate_rows_scratch_words(&self, steps: i64) -> usize {
        steps.unsigned_abs().count_ones() as usize * self.key_switch_scratch_words()
    }

    pub fn rotate_rows(&self, a: &Ciphertext, steps: i64, keys: &GaloisKeySet) -> Result<Ciphertext> {
        let mut owned = global_pool().take(self.rotate_rows_scratch_words(steps));
        let result: Result<Ciphertext> = self.rotate_rows_scratch(a, steps, keys, &mut owned.borrow());
        global_pool().recycle(owned);
        result
    }

    /// Cyclically rotates both batching rows by `steps` slots, positive to
    /// the left, decomposed into the power-of-two rotations the key set
    /// carries.
    pub fn rotate_rows_scratch(
        &self,
        a: &Ciphertext,
        steps: i64,
        keys: &GaloisKeySet,
        scratch: &mut Scratch<'_>,
    ) -> Result<Ciphertext> {
        self.check_rotation(a, keys)?;
        let row_size: i64 = (self.ctx.n() as i64) >> 1;
        if steps == 0 || steps.abs() >= row_size {
            return Err(HeError::InvalidParameters(format!(
                "rotation steps = {} must be nonzero and less than {} in magnitude",
                steps, row_size
            )));
        }

        let sign: i64 = steps.signum();
        let mut magnitude: u64 = steps.unsigned_abs();
        let mut current: Ciphertext = a.clone();
        let mut bit: i64 = 1;
        while magnitude != 0 {
            if magnitude & 1 == 1 {
                let elt: u64 = self.ctx.galois_elt_from_step(sign * bit);
                current = self.apply_galois(&current, elt, keys, scratch)?;
            }
            magnitude >>= 1;
            bit <<= 1;
        }
        Ok(current)
    }

    pub fn rotate_columns(&self, a: &Ciphertext, keys: &GaloisKeySet) -> Result<Ciphertext> {
        let mut owned = global_pool().take(self.key_switch_scratch_words());
        let result: Result<Ciphertext> = self.rotate_columns_scratch(a, keys, &mut owned.borrow());
        global_pool().recycle(owned);
        result
    }

    /// Swaps the two batching rows.
    pub fn rotate_columns_scratch(
        &self,
        a: &Ciphertext,
        keys: &GaloisKeySet,
        scratch: &mut Scratch<'_>,
    ) -> Result<Ciphertext> {
        self.check_rotation(a, keys)?;
        self.apply_galois(a, self.ctx.galois_elt_columns(), keys, scratch)
    }

    /// Left-to-right square-and-multiply, relinearizing after every
    /// multiplication so intermediate sizes never exceed 3.
    pub fn exponentiate(
        &self,
        a: &Ciphertext,
        exponent: u64,
        keys: &EvaluationKeySet,
    ) -> Result<Ciphertext> {
        self.check_ct(a)?;
        self.ctx
            .check_fingerprint(keys.fingerprint(), "evaluation keys")?;
        if exponent == 0 {
            return Err(HeError::InvalidParameters(
                "exponent must be positive; encrypt 1 instead".to_string(),
            ));
        }
        if exponent > 1 && keys.count() < 1 {
            return Err(HeError::InsufficientEvaluationKeys(
                "exponentiation relinearizes after every product and needs at least one key"
                    .to_string(),
            ));
        }

        let bits: u32 = 64 - exponent.leading_zeros();
        let mut result: Ciphertext = a.clone();
        for i in (0..bits - 1).rev() {
            result = self.relinearize(&self.square(&result)?, keys)?;
            if (exponent >> i) & 1 == 1 {
                result = self.relinearize(&self.multiply(&result, a)?, keys)?;
            }
        }
        Ok(result)
    }
}

/// a += flat, both over the base ring factors.
fn add_flat(ring: &RnsRing, flat: &[u64], a: &mut RnsPoly) {
    let n: usize = a.n();
    izip!(ring.tables().iter(), flat.chunks_exact(n), a.0.iter_mut()).for_each(
        |(table, f, a)| {
            let q: u64 = table.q();
            izip!(f.iter(), a.iter_mut()).for_each(|(f, a)| *a = (*a + *f).reduce_once(q));
        },
    );
}
