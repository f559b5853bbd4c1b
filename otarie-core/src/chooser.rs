use num_bigint::BigUint;
use num_traits::Zero;

use crate::encoder::integer;
use crate::error::{HeError, Result};
use crate::params::{
    EncryptionParameters, DBC_MAX, DEFAULT_NOISE_STANDARD_DEVIATION,
};
use crate::simulator::Simulation;
use crate::tables::{standard_parameters, SecurityLevel};

/// Candidate degrees walked by parameter selection, smallest first.
const CANDIDATE_DEGREES: [usize; 6] = [1024, 2048, 4096, 8192, 16384, 32768];

/// Operation history of a symbolic ciphertext, replayed against candidate
/// parameters to predict the noise it would carry.
#[derive(Clone, Debug)]
pub enum Computation {
    Fresh,
    Add(Box<Computation>, Box<Computation>),
    Sub(Box<Computation>, Box<Computation>),
    Negate(Box<Computation>),
    Multiply(Box<Computation>, Box<Computation>),
    MultiplyPlain {
        inner: Box<Computation>,
        plain_max_coeff_count: usize,
        plain_max_abs_value: BigUint,
    },
    AddPlain(Box<Computation>),
    SubPlain(Box<Computation>),
    Relinearize {
        inner: Box<Computation>,
        decomposition_bit_count: usize,
    },
    Exponentiate {
        inner: Box<Computation>,
        exponent: u64,
        decomposition_bit_count: usize,
    },
}

impl Computation {
    /// Replays the history under `parms`; `decomposition_bit_count`
    /// applies to the relinearizations folded into `Multiply` nodes,
    /// while explicit nodes carry their own.
    pub fn simulate(
        &self,
        parms: &EncryptionParameters,
        decomposition_bit_count: usize,
    ) -> Result<Simulation> {
        match self {
            Computation::Fresh => Simulation::fresh(parms, decomposition_bit_count),
            Computation::Add(a, b) => a
                .simulate(parms, decomposition_bit_count)?
                .add(&b.simulate(parms, decomposition_bit_count)?),
            Computation::Sub(a, b) => a
                .simulate(parms, decomposition_bit_count)?
                .sub(&b.simulate(parms, decomposition_bit_count)?),
            Computation::Negate(a) => Ok(a.simulate(parms, decomposition_bit_count)?.negate()),
            Computation::Multiply(a, b) => a
                .simulate(parms, decomposition_bit_count)?
                .multiply(&b.simulate(parms, decomposition_bit_count)?),
            Computation::MultiplyPlain {
                inner,
                plain_max_coeff_count,
                plain_max_abs_value,
            } => inner
                .simulate(parms, decomposition_bit_count)?
                .multiply_plain(*plain_max_coeff_count, plain_max_abs_value),
            Computation::AddPlain(a) => Ok(a.simulate(parms, decomposition_bit_count)?.add_plain()),
            Computation::SubPlain(a) => Ok(a.simulate(parms, decomposition_bit_count)?.sub_plain()),
            Computation::Relinearize {
                inner,
                decomposition_bit_count: dbc,
            } => inner
                .simulate(parms, decomposition_bit_count)?
                .relinearize(*dbc),
            Computation::Exponentiate {
                inner,
                exponent,
                decomposition_bit_count: dbc,
            } => inner
                .simulate(parms, decomposition_bit_count)?
                .exponentiate(*exponent, *dbc),
        }
    }
}

/// Symbolic stand-in for a ciphertext: worst-case bounds on the plaintext
/// polynomial underneath (coefficient count and infinity norm) plus the
/// operation history for noise simulation.
#[derive(Clone, Debug)]
pub struct ChooserPoly {
    max_coeff_count: usize,
    max_abs_value: BigUint,
    comp: Option<Computation>,
}

impl ChooserPoly {
    pub fn new(max_coeff_count: usize, max_abs_value: BigUint) -> Result<ChooserPoly> {
        if max_coeff_count == 0 {
            return Err(HeError::InvalidParameters(
                "max_coeff_count must be positive".to_string(),
            ));
        }
        Ok(ChooserPoly {
            max_coeff_count: if max_abs_value.is_zero() {
                1
            } else {
                max_coeff_count
            },
            max_abs_value,
            comp: Some(Computation::Fresh),
        })
    }

    fn derived(max_coeff_count: usize, max_abs_value: BigUint, comp: Computation) -> ChooserPoly {
        ChooserPoly {
            max_coeff_count: if max_abs_value.is_zero() {
                1
            } else {
                max_coeff_count
            },
            max_abs_value,
            comp: Some(comp),
        }
    }

    #[inline(always)]
    pub fn max_coeff_count(&self) -> usize {
        self.max_coeff_count
    }

    #[inline(always)]
    pub fn max_abs_value(&self) -> &BigUint {
        &self.max_abs_value
    }

    /// Discards the operation history, making this a fresh encryption of
    /// the same bounds.
    pub fn set_fresh(&mut self) {
        self.comp = Some(Computation::Fresh);
    }

    pub fn reset(&mut self) {
        self.comp = None;
        self.max_coeff_count = 0;
        self.max_abs_value = BigUint::zero();
    }

    fn comp(&self) -> Result<&Computation> {
        self.comp.as_ref().ok_or_else(|| {
            HeError::InvalidParameters("chooser operand has been reset".to_string())
        })
    }

    pub fn simulate(
        &self,
        parms: &EncryptionParameters,
        decomposition_bit_count: usize,
    ) -> Result<Simulation> {
        self.comp()?.simulate(parms, decomposition_bit_count)
    }

    /// Smallest standard parameter set keeping this computation's
    /// predicted budget above the floor; see
    /// [`ChooserEvaluator::select_parameters`].
    pub fn select_parameters(
        &self,
        budget_floor: u32,
    ) -> Result<(EncryptionParameters, usize)> {
        ChooserEvaluator.select_parameters(&[self], budget_floor)
    }
}

/// Converts numeric constants into fresh [`ChooserPoly`] bounds the way
/// the matching [`IntegerEncoder`](crate::IntegerEncoder) would encode
/// them: digit count and largest balanced digit magnitude.
pub struct ChooserEncoder {
    base: u64,
}

impl ChooserEncoder {
    pub fn new(base: u64) -> Result<ChooserEncoder> {
        if base < 2 || (base > 2 && base % 2 == 0) {
            return Err(HeError::InvalidParameters(format!(
                "encoding base = {} must be 2 or an odd integer >= 3",
                base
            )));
        }
        Ok(ChooserEncoder { base })
    }

    pub fn encode(&self, value: i64) -> ChooserPoly {
        let digits: Vec<i64> = integer::signed_digits(self.base, value);
        let max_abs: u64 = digits.iter().map(|d| d.unsigned_abs()).max().unwrap_or(0);
        ChooserPoly {
            max_coeff_count: digits.len().max(1),
            max_abs_value: BigUint::from(max_abs),
            comp: Some(Computation::Fresh),
        }
    }
}

/// Mirrors the Evaluator surface over [`ChooserPoly`] bounds, composing
/// worst-case coefficient growth alongside the noise history.
pub struct ChooserEvaluator;

impl ChooserEvaluator {
    pub fn add(&self, a: &ChooserPoly, b: &ChooserPoly) -> Result<ChooserPoly> {
        self.add_sub_impl(a, b, false)
    }

    pub fn sub(&self, a: &ChooserPoly, b: &ChooserPoly) -> Result<ChooserPoly> {
        self.add_sub_impl(a, b, true)
    }

    fn add_sub_impl(&self, a: &ChooserPoly, b: &ChooserPoly, sub: bool) -> Result<ChooserPoly> {
        let comp_a: Computation = a.comp()?.clone();
        let comp_b: Computation = b.comp()?.clone();
        let comp: Computation = if sub {
            Computation::Sub(Box::new(comp_a), Box::new(comp_b))
        } else {
            Computation::Add(Box::new(comp_a), Box::new(comp_b))
        };
        Ok(ChooserPoly::derived(
            a.max_coeff_count.max(b.max_coeff_count),
            &a.max_abs_value + &b.max_abs_value,
            comp,
        ))
    }

    pub fn add_many(&self, operands: &[ChooserPoly]) -> Result<ChooserPoly> {
        let (first, rest) = operands.split_first().ok_or_else(|| {
            HeError::InvalidParameters("add_many requires at least one operand".to_string())
        })?;
        let mut acc: ChooserPoly = first.clone();
        for operand in rest {
            acc = self.add(&acc, operand)?;
        }
        Ok(acc)
    }

    pub fn negate(&self, a: &ChooserPoly) -> Result<ChooserPoly> {
        Ok(ChooserPoly::derived(
            a.max_coeff_count,
            a.max_abs_value.clone(),
            Computation::Negate(Box::new(a.comp()?.clone())),
        ))
    }

    /// Product bound: norms multiply, scaled by the smaller coefficient
    /// count reachable by any output coefficient.
    pub fn multiply(&self, a: &ChooserPoly, b: &ChooserPoly) -> Result<ChooserPoly> {
        let comp: Computation =
            Computation::Multiply(Box::new(a.comp()?.clone()), Box::new(b.comp()?.clone()));
        if a.max_abs_value.is_zero() || b.max_abs_value.is_zero() {
            return Ok(ChooserPoly::derived(1, BigUint::zero(), comp));
        }
        let growth: u64 = a.max_coeff_count.min(b.max_coeff_count) as u64;
        Ok(ChooserPoly::derived(
            a.max_coeff_count + b.max_coeff_count - 1,
            &a.max_abs_value * &b.max_abs_value * growth,
            comp,
        ))
    }

    pub fn square(&self, a: &ChooserPoly) -> Result<ChooserPoly> {
        self.multiply(a, a)
    }

    pub fn multiply_plain(
        &self,
        a: &ChooserPoly,
        plain_max_coeff_count: usize,
        plain_max_abs_value: BigUint,
    ) -> Result<ChooserPoly> {
        if plain_max_coeff_count == 0 {
            return Err(HeError::InvalidParameters(
                "plain_max_coeff_count must be positive".to_string(),
            ));
        }
        let comp: Computation = Computation::MultiplyPlain {
            inner: Box::new(a.comp()?.clone()),
            plain_max_coeff_count,
            plain_max_abs_value: plain_max_abs_value.clone(),
        };
        if a.max_abs_value.is_zero() || plain_max_abs_value.is_zero() {
            return Ok(ChooserPoly::derived(1, BigUint::zero(), comp));
        }
        let growth: u64 = a.max_coeff_count.min(plain_max_coeff_count) as u64;
        Ok(ChooserPoly::derived(
            a.max_coeff_count + plain_max_coeff_count - 1,
            &a.max_abs_value * plain_max_abs_value * growth,
            comp,
        ))
    }

    pub fn add_plain(
        &self,
        a: &ChooserPoly,
        plain_max_coeff_count: usize,
        plain_max_abs_value: BigUint,
    ) -> Result<ChooserPoly> {
        self.add_sub_plain_impl(a, plain_max_coeff_count, plain_max_abs_value, false)
    }

    pub fn sub_plain(
        &self,
        a: &ChooserPoly,
        plain_max_coeff_count: usize,
        plain_max_abs_value: BigUint,
    ) -> Result<ChooserPoly> {
        self.add_sub_plain_impl(a, plain_max_coeff_count, plain_max_abs_value, true)
    }

    fn add_sub_plain_impl(
        &self,
        a: &ChooserPoly,
        plain_max_coeff_count: usize,
        plain_max_abs_value: BigUint,
        sub: bool,
    ) -> Result<ChooserPoly> {
        if plain_max_coeff_count == 0 {
            return Err(HeError::InvalidParameters(
                "plain_max_coeff_count must be positive".to_string(),
            ));
        }
        let inner: Box<Computation> = Box::new(a.comp()?.clone());
        let comp: Computation = if sub {
            Computation::SubPlain(inner)
        } else {
            Computation::AddPlain(inner)
        };
        Ok(ChooserPoly::derived(
            a.max_coeff_count.max(plain_max_coeff_count),
            &a.max_abs_value + plain_max_abs_value,
            comp,
        ))
    }

    pub fn relinearize(
        &self,
        a: &ChooserPoly,
        decomposition_bit_count: usize,
    ) -> Result<ChooserPoly> {
        Ok(ChooserPoly::derived(
            a.max_coeff_count,
            a.max_abs_value.clone(),
            Computation::Relinearize {
                inner: Box::new(a.comp()?.clone()),
                decomposition_bit_count,
            },
        ))
    }

    pub fn exponentiate(
        &self,
        a: &ChooserPoly,
        exponent: u64,
        decomposition_bit_count: usize,
    ) -> Result<ChooserPoly> {
        if exponent == 0 {
            return Err(HeError::InvalidParameters(
                "exponent must be positive".to_string(),
            ));
        }
        let comp: Computation = Computation::Exponentiate {
            inner: Box::new(a.comp()?.clone()),
            exponent,
            decomposition_bit_count,
        };
        if a.max_abs_value.is_zero() {
            return Ok(ChooserPoly::derived(1, BigUint::zero(), comp));
        }
        let k: usize = a.max_coeff_count;
        // Asymptotic growth of an e-fold negacyclic power:
        // k^e * sqrt(6 / ((k-1)(k+1) pi e)); a constant operand grows not
        // at all.
        let growth: u64 = if k == 1 {
            1
        } else {
            let e: f64 = exponent as f64;
            let estimate: f64 = (k as f64).powf(e)
                * (6.0 / (((k - 1) * (k + 1)) as f64 * std::f64::consts::PI * e)).sqrt();
            if estimate.is_finite() {
                (estimate as u64).max(1)
            } else {
                u64::MAX
            }
        };
        let power: BigUint = a
            .max_abs_value
            .pow(u32::try_from(exponent).unwrap_or(u32::MAX));
        Ok(ChooserPoly::derived(
            exponent as usize * (k - 1) + 1,
            power * growth,
            comp,
        ))
    }

    /// Walks the standard table in increasing degree, fixing
    /// t = 2^(bits(max_abs) + 1) so centered decoding of the result is
    /// exact, and searches the decomposition bit count downward from the
    /// widest digit. Returns the parameters and the chosen bit count.
    pub fn select_parameters(
        &self,
        operands: &[&ChooserPoly],
        budget_floor: u32,
    ) -> Result<(EncryptionParameters, usize)> {
        if operands.is_empty() {
            return Err(HeError::InvalidParameters(
                "select_parameters requires at least one computation".to_string(),
            ));
        }
        let max_abs_bits: u64 = operands
            .iter()
            .map(|op| op.max_abs_value.bits())
            .max()
            .unwrap_or(0);
        let max_coeff_count: usize = operands
            .iter()
            .map(|op| op.max_coeff_count)
            .max()
            .unwrap_or(1);
        if max_abs_bits + 1 >= 63 {
            return Err(HeError::NoFeasibleParameters(
                "plaintext coefficient bound exceeds the representable plain modulus".to_string(),
            ));
        }
        let plain_modulus: u64 = 1u64 << (max_abs_bits + 1);

        for degree in CANDIDATE_DEGREES {
            if max_coeff_count > degree {
                continue;
            }
            let factors: Vec<u64> = match standard_parameters(SecurityLevel::Tc128, degree) {
                Ok(factors) => factors,
                Err(_) => continue,
            };
            let parms: EncryptionParameters = EncryptionParameters::new()
                .set_poly_modulus_degree(degree)
                .set_coeff_modulus(factors)
                .set_plain_modulus(plain_modulus)
                .set_noise_standard_deviation(DEFAULT_NOISE_STANDARD_DEVIATION);

            let coeff_bits: usize = parms
                .coeff_modulus()
                .iter()
                .map(|&q| (64 - q.leading_zeros()) as usize)
                .sum();
            let start: usize = DBC_MAX.min(coeff_bits);
            // A small decomposition bit count only slows relinearization
            // down; stop the search at a fifth of the modulus width.
            let stop: usize = (coeff_bits / 5).min(start.saturating_sub(1));
            let mut dbc: usize = start;
            while dbc > stop {
                if self.all_decrypt(operands, &parms, dbc, budget_floor)? {
                    // Even out the digit sizes without changing their
                    // count.
                    let parts: usize = coeff_bits.div_ceil(dbc);
                    let smoothed: usize = coeff_bits.div_ceil(parts);
                    if smoothed != dbc
                        && self.all_decrypt(operands, &parms, smoothed, budget_floor)?
                    {
                        return Ok((parms, smoothed));
                    }
                    return Ok((parms, dbc));
                }
                dbc -= 1;
            }
        }
        Err(HeError::NoFeasibleParameters(format!(
            "no standard parameter set keeps the predicted noise budget above {} bits",
            budget_floor
        )))
    }

    fn all_decrypt(
        &self,
        operands: &[&ChooserPoly],
        parms: &EncryptionParameters,
        decomposition_bit_count: usize,
        budget_floor: u32,
    ) -> Result<bool> {
        for operand in operands {
            if !operand
                .simulate(parms, decomposition_bit_count)?
                .decrypts(budget_floor)
            {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoder_bounds() {
        let encoder: ChooserEncoder = ChooserEncoder::new(3).unwrap();
        let poly: ChooserPoly = encoder.encode(12345);
        // 12345 takes ten balanced base-3 digits, all in {-1, 0, 1}.
        assert_eq!(poly.max_coeff_count(), 10);
        assert_eq!(*poly.max_abs_value(), BigUint::from(1u32));

        let zero: ChooserPoly = encoder.encode(0);
        assert_eq!(zero.max_coeff_count(), 1);
        assert!(zero.max_abs_value().is_zero());
    }

    #[test]
    fn test_multiply_bounds() {
        let evaluator: ChooserEvaluator = ChooserEvaluator;
        let a: ChooserPoly = ChooserPoly::new(10, BigUint::from(2u32)).unwrap();
        let b: ChooserPoly = ChooserPoly::new(6, BigUint::from(3u32)).unwrap();
        let product: ChooserPoly = evaluator.multiply(&a, &b).unwrap();
        assert_eq!(product.max_coeff_count(), 15);
        assert_eq!(*product.max_abs_value(), BigUint::from(36u32));
    }

    #[test]
    fn test_add_bounds() {
        let evaluator: ChooserEvaluator = ChooserEvaluator;
        let a: ChooserPoly = ChooserPoly::new(4, BigUint::from(5u32)).unwrap();
        let b: ChooserPoly = ChooserPoly::new(9, BigUint::from(7u32)).unwrap();
        let sum: ChooserPoly = evaluator.add(&a, &b).unwrap();
        assert_eq!(sum.max_coeff_count(), 9);
        assert_eq!(*sum.max_abs_value(), BigUint::from(12u32));
    }

    #[test]
    fn test_reset_operand_rejected() {
        let evaluator: ChooserEvaluator = ChooserEvaluator;
        let mut a: ChooserPoly = ChooserPoly::new(4, BigUint::from(5u32)).unwrap();
        a.reset();
        assert!(evaluator.negate(&a).is_err());
        a = ChooserPoly::new(4, BigUint::from(5u32)).unwrap();
        assert!(evaluator.negate(&a).is_ok());
    }

    #[test]
    fn test_select_parameters_smallest_feasible() {
        // A single fresh encryption is satisfied by the smallest table
        // entry.
        let encoder: ChooserEncoder = ChooserEncoder::new(2).unwrap();
        let poly: ChooserPoly = encoder.encode(42);
        let (parms, dbc) = poly.select_parameters(10).unwrap();
        assert_eq!(parms.poly_modulus_degree(), 1024);
        assert!(dbc >= 1);
    }

    #[test]
    fn test_select_parameters_infeasible() {
        // An absurdly deep product tower exhausts every candidate.
        let evaluator: ChooserEvaluator = ChooserEvaluator;
        let encoder: ChooserEncoder = ChooserEncoder::new(2).unwrap();
        let mut poly: ChooserPoly = encoder.encode(12345);
        for _ in 0..8 {
            poly = evaluator.multiply(&poly, &poly).unwrap();
        }
        assert!(matches!(
            poly.select_parameters(10),
            Err(HeError::NoFeasibleParameters(_))
        ));
    }
}
