use std::sync::Arc;

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

use otarie_math::poly::RnsPoly;
use otarie_math::ring::RnsRing;

use crate::ciphertext::Ciphertext;
use crate::context::Context;
use crate::error::Result;
use crate::keys::SecretKey;
use crate::plaintext::Plaintext;

/// Secret-key decryptor and noise-budget probe.
pub struct Decryptor {
    ctx: Arc<Context>,
    secret_key: SecretKey,
}

impl Decryptor {
    pub fn new(ctx: Arc<Context>, secret_key: SecretKey) -> Result<Decryptor> {
        ctx.check_fingerprint(secret_key.fingerprint(), "secret key")?;
        Ok(Decryptor { ctx, secret_key })
    }

    /// c(s) = sum c_i s^i, coefficient domain.
    fn dot_product(&self, ct: &Ciphertext) -> RnsPoly {
        let ring: &RnsRing = self.ctx.ring();
        let size: usize = ct.size();

        // Horner over NTT representations.
        let mut acc: RnsPoly = ct.at(size - 1).clone();
        ring.ntt_assign(&mut acc);
        for i in (0..size - 1).rev() {
            ring.dyadic_mul_assign(&mut acc, &self.secret_key.s_ntt);
            let mut c: RnsPoly = ct.at(i).clone();
            ring.ntt_assign(&mut c);
            ring.add_assign(&mut acc, &c);
        }
        ring.intt_assign(&mut acc);
        acc
    }

    /// Rounds t * c(s) / q per coefficient. A ciphertext whose noise
    /// budget has hit zero decrypts without any error to wrong values.
    pub fn decrypt(&self, ct: &Ciphertext) -> Result<Plaintext> {
        self.ctx.check_fingerprint(ct.fingerprint(), "ciphertext")?;

        let ring: &RnsRing = self.ctx.ring();
        let cs: RnsPoly = self.dot_product(ct);

        let mut composed: Vec<BigUint> = vec![BigUint::zero(); self.ctx.n()];
        ring.compose_into(&cs, &mut composed);

        let q: &BigUint = self.ctx.total_coeff_modulus();
        let half_q: BigUint = q >> 1;
        let t: u64 = self.ctx.plain_modulus();
        let mut coeffs: Vec<u64> = composed
            .into_iter()
            .map(|x| {
                let rounded: BigUint = (x * t + &half_q) / q;
                (rounded % t).to_u64().unwrap_or(0)
            })
            .collect();

        let significant: usize = coeffs.iter().rposition(|&c| c != 0).map_or(0, |i| i + 1);
        coeffs.truncate(significant);
        Ok(Plaintext::from_coeffs(coeffs))
    }

    /// Bits of invariant noise budget left: bits(q) - bits(norm) - 1 for
    /// the centered infinity norm of t c(s) mod q, floored at zero. Zero
    /// means decryption is no longer reliable.
    pub fn invariant_noise_budget(&self, ct: &Ciphertext) -> Result<u32> {
        self.ctx.check_fingerprint(ct.fingerprint(), "ciphertext")?;

        let ring: &RnsRing = self.ctx.ring();
        let cs: RnsPoly = self.dot_product(ct);

        let mut composed: Vec<BigUint> = vec![BigUint::zero(); self.ctx.n()];
        ring.compose_into(&cs, &mut composed);

        let q: &BigUint = self.ctx.total_coeff_modulus();
        let threshold: &BigUint = self.ctx.upper_half_threshold();
        let t: u64 = self.ctx.plain_modulus();
        let mut norm: BigUint = BigUint::zero();
        for x in composed {
            let v: BigUint = (x * t) % q;
            let centered: BigUint = if &v >= threshold { q - v } else { v };
            if centered > norm {
                norm = centered;
            }
        }

        let q_bits: u64 = q.bits();
        let norm_bits: u64 = norm.bits();
        Ok((q_bits.saturating_sub(norm_bits).saturating_sub(1)) as u32)
    }
}
