use std::sync::Arc;

use fnv::FnvHashMap;

use otarie_math::poly::RnsPoly;
use otarie_math::ring::RnsRing;
use otarie_sampling::{new_seed, Source};

use crate::context::Context;
use crate::error::{HeError, Result};
use crate::keys::{EvaluationKeySet, GaloisKeySet, KswKey, PublicKey, SecretKey};
use crate::params::{DBC_MAX, DBC_MIN};
use crate::sample::{fill_uniform, gaussian_vec, ternary_vec};

/// Samples a fresh ternary secret and its public key, and mints key
/// material derived from them.
pub struct KeyGenerator {
    ctx: Arc<Context>,
    /// Secret in the coefficient domain, kept for Galois automorphisms.
    secret_coeff: RnsPoly,
    secret_ntt: RnsPoly,
    public_key: PublicKey,
    source: Source,
}

impl KeyGenerator {
    pub fn new(ctx: Arc<Context>) -> KeyGenerator {
        Self::new_with_source(ctx, Source::new(new_seed()))
    }

    /// Deterministic variant; the seed fully determines all generated keys.
    pub fn new_with_source(ctx: Arc<Context>, mut source: Source) -> KeyGenerator {
        let ring: &RnsRing = ctx.ring();
        let n: usize = ctx.n();

        let s: Vec<i64> = ternary_vec(n, &mut source);
        let mut secret_coeff: RnsPoly = ring.new_poly();
        ring.from_signed_into(&s, &mut secret_coeff);
        let mut secret_ntt: RnsPoly = secret_coeff.clone();
        ring.ntt_assign(&mut secret_ntt);

        // pk = (-(a s + e), a), all NTT domain.
        let mut p1: RnsPoly = ring.new_poly();
        fill_uniform(ring, &mut source, &mut p1);
        let mut p0: RnsPoly = p1.clone();
        ring.dyadic_mul_assign(&mut p0, &secret_ntt);
        let e: Vec<i64> = gaussian_vec(
            n,
            ctx.parms().noise_standard_deviation(),
            ctx.parms().noise_max_deviation(),
            &mut source,
        );
        let mut e_poly: RnsPoly = ring.new_poly();
        ring.from_signed_into(&e, &mut e_poly);
        ring.ntt_assign(&mut e_poly);
        ring.add_assign(&mut p0, &e_poly);
        ring.neg_assign(&mut p0);

        let public_key: PublicKey = PublicKey {
            p0,
            p1,
            fingerprint: ctx.fingerprint(),
        };

        KeyGenerator {
            ctx,
            secret_coeff,
            secret_ntt,
            public_key,
            source,
        }
    }

    pub fn secret_key(&self) -> SecretKey {
        SecretKey {
            s_ntt: self.secret_ntt.clone(),
            fingerprint: self.ctx.fingerprint(),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key.clone()
    }

    /// Keys for relinearizing ciphertexts of size up to count + 2.
    pub fn generate_evaluation_keys(
        &mut self,
        decomposition_bit_count: usize,
        count: usize,
    ) -> Result<EvaluationKeySet> {
        check_dbc(decomposition_bit_count)?;

        let mut keys: Vec<KswKey> = Vec::with_capacity(count);
        // Successive powers s^2, s^3, ... in the NTT domain.
        let mut power: RnsPoly = self.secret_ntt.clone();
        for _ in 0..count {
            self.ctx.ring().dyadic_mul_assign(&mut power, &self.secret_ntt);
            let key: KswKey = self.gadget_key(&power, decomposition_bit_count);
            keys.push(key);
        }

        Ok(EvaluationKeySet {
            keys,
            decomposition_bit_count,
            fingerprint: self.ctx.fingerprint(),
        })
    }

    /// Keys for every power-of-two row step in both directions plus the
    /// column swap, enough to compose any rotation.
    pub fn generate_galois_keys(&mut self, decomposition_bit_count: usize) -> Result<GaloisKeySet> {
        check_dbc(decomposition_bit_count)?;

        let mut elements: Vec<u64> = Vec::new();
        let row_size: i64 = (self.ctx.n() as i64) >> 1;
        let mut step: i64 = 1;
        while step < row_size {
            elements.push(self.ctx.galois_elt_from_step(step));
            elements.push(self.ctx.galois_elt_from_step(-step));
            step <<= 1;
        }
        elements.push(self.ctx.galois_elt_columns());

        let mut keys: FnvHashMap<u64, KswKey> = FnvHashMap::default();
        for elt in elements {
            if keys.contains_key(&elt) {
                continue;
            }
            // Encrypts s(X^elt) under s.
            let mut target: RnsPoly = self.ctx.ring().new_poly();
            self.ctx
                .ring()
                .automorphism_into(elt, &self.secret_coeff, &mut target);
            self.ctx.ring().ntt_assign(&mut target);
            let key: KswKey = self.gadget_key(&target, decomposition_bit_count);
            keys.insert(elt, key);
        }

        Ok(GaloisKeySet {
            keys,
            decomposition_bit_count,
            fingerprint: self.ctx.fingerprint(),
        })
    }

    /// Gadget encryption of target: digit l holds
    /// (-(a_l s + e_l) + 2^(dbc l) target, a_l).
    fn gadget_key(&mut self, target_ntt: &RnsPoly, decomposition_bit_count: usize) -> KswKey {
        let ring: &RnsRing = self.ctx.ring();
        let n: usize = self.ctx.n();
        let digits: usize =
            self.ctx.coeff_modulus_bits().div_ceil(decomposition_bit_count);

        let mut k0: Vec<RnsPoly> = Vec::with_capacity(digits);
        let mut k1: Vec<RnsPoly> = Vec::with_capacity(digits);
        for l in 0..digits {
            let mut a: RnsPoly = ring.new_poly();
            fill_uniform(ring, &mut self.source, &mut a);

            let mut b: RnsPoly = a.clone();
            ring.dyadic_mul_assign(&mut b, &self.secret_ntt);
            let e: Vec<i64> = gaussian_vec(
                n,
                self.ctx.parms().noise_standard_deviation(),
                self.ctx.parms().noise_max_deviation(),
                &mut self.source,
            );
            let mut e_poly: RnsPoly = ring.new_poly();
            ring.from_signed_into(&e, &mut e_poly);
            ring.ntt_assign(&mut e_poly);
            ring.add_assign(&mut b, &e_poly);
            ring.neg_assign(&mut b);

            // 2^(dbc l) mod q_i per factor.
            let scalars: Vec<u64> = ring
                .tables()
                .iter()
                .map(|t| t.prime().pow(2, (decomposition_bit_count * l) as u64))
                .collect();
            ring.scalar_mul_add_assign(&scalars, target_ntt, &mut b);

            k0.push(b);
            k1.push(a);
        }

        KswKey { k0, k1 }
    }
}

fn check_dbc(decomposition_bit_count: usize) -> Result<()> {
    if !(DBC_MIN..=DBC_MAX).contains(&decomposition_bit_count) {
        return Err(HeError::KeyGenerationError(format!(
            "decomposition_bit_count = {} not in [{}, {}]",
            decomposition_bit_count, DBC_MIN, DBC_MAX
        )));
    }
    Ok(())
}
