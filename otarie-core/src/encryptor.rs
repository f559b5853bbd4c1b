use std::sync::Arc;

use otarie_math::poly::RnsPoly;
use otarie_math::ring::RnsRing;
use otarie_sampling::{new_seed, Source};

use crate::ciphertext::Ciphertext;
use crate::context::Context;
use crate::error::{HeError, Result};
use crate::keys::PublicKey;
use crate::plaintext::Plaintext;
use crate::sample::{gaussian_vec, ternary_vec};

/// Public-key encryptor.
pub struct Encryptor {
    ctx: Arc<Context>,
    public_key: PublicKey,
    source: Source,
}

impl Encryptor {
    pub fn new(ctx: Arc<Context>, public_key: PublicKey) -> Result<Encryptor> {
        ctx.check_fingerprint(public_key.fingerprint(), "public key")?;
        Ok(Encryptor {
            ctx,
            public_key,
            source: Source::new(new_seed()),
        })
    }

    pub fn with_source(
        ctx: Arc<Context>,
        public_key: PublicKey,
        source: Source,
    ) -> Result<Encryptor> {
        ctx.check_fingerprint(public_key.fingerprint(), "public key")?;
        Ok(Encryptor {
            ctx,
            public_key,
            source,
        })
    }

    /// Encrypts m as (p0 u + e1 + delta m, p1 u + e2) for ternary u.
    pub fn encrypt(&mut self, plain: &Plaintext) -> Result<Ciphertext> {
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

        let ring: &RnsRing = self.ctx.ring();
        let std_dev: f64 = self.ctx.parms().noise_standard_deviation();
        let max_dev: f64 = self.ctx.parms().noise_max_deviation();

        let u: Vec<i64> = ternary_vec(n, &mut self.source);
        let mut u_ntt: RnsPoly = ring.new_poly();
        ring.from_signed_into(&u, &mut u_ntt);
        ring.ntt_assign(&mut u_ntt);

        let mut c0: RnsPoly = self.public_key.p0.clone();
        ring.dyadic_mul_assign(&mut c0, &u_ntt);
        ring.intt_assign(&mut c0);
        let e1: Vec<i64> = gaussian_vec(n, std_dev, max_dev, &mut self.source);
        ring.add_signed_assign(&e1, &mut c0);
        ring.mul_scalar_add_assign(self.ctx.delta_mod_q(), plain.coeffs(), &mut c0);

        let mut c1: RnsPoly = self.public_key.p1.clone();
        ring.dyadic_mul_assign(&mut c1, &u_ntt);
        ring.intt_assign(&mut c1);
        let e2: Vec<i64> = gaussian_vec(n, std_dev, max_dev, &mut self.source);
        ring.add_signed_assign(&e2, &mut c1);

        Ok(Ciphertext::new(vec![c0, c1], self.ctx.fingerprint()))
    }
}
