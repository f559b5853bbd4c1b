use crate::encoder::integer::IntegerEncoder;
use crate::error::{HeError, Result};
use crate::plaintext::Plaintext;

/// Fixed-point rational encoder.
///
/// The integer part occupies the low-degree coefficients as in
/// [`IntegerEncoder`]; the fractional part is truncated to
/// `fraction_coeff_count` balanced base-b digits and stored sign-inverted
/// in the top coefficients, where X^(N-i) multiplies against X^i to land
/// on X^N = -1.
pub struct FractionalEncoder {
    plain_modulus: u64,
    poly_modulus_degree: usize,
    integer_coeff_count: usize,
    fraction_coeff_count: usize,
    integer: IntegerEncoder,
}

impl FractionalEncoder {
    pub fn new(
        plain_modulus: u64,
        poly_modulus_degree: usize,
        integer_coeff_count: usize,
        fraction_coeff_count: usize,
        base: u64,
    ) -> Result<FractionalEncoder> {
        let integer: IntegerEncoder = IntegerEncoder::new(plain_modulus, base)?;
        if integer_coeff_count == 0 || fraction_coeff_count == 0 {
            return Err(HeError::InvalidParameters(
                "integer and fraction coefficient counts must be positive".to_string(),
            ));
        }
        if integer_coeff_count + fraction_coeff_count > poly_modulus_degree {
            return Err(HeError::EncodingOverflow(format!(
                "integer_coeff_count + fraction_coeff_count = {} exceeds poly_modulus_degree = {}",
                integer_coeff_count + fraction_coeff_count,
                poly_modulus_degree
            )));
        }
        Ok(FractionalEncoder {
            plain_modulus,
            poly_modulus_degree,
            integer_coeff_count,
            fraction_coeff_count,
            integer,
        })
    }

    pub fn encode(&self, value: f64) -> Result<Plaintext> {
        if !value.is_finite() {
            return Err(HeError::EncodingOverflow(format!(
                "cannot encode non-finite value {}",
                value
            )));
        }
        let int_part: f64 = value.trunc();
        if int_part.abs() >= 9.0e18 {
            return Err(HeError::EncodingOverflow(format!(
                "integer part of {} exceeds the 64-bit signed range",
                value
            )));
        }

        // The fraction scaled by b^F is an integer whose balanced digits
        // are the F fraction digits plus at most one carry into the
        // integer part.
        let f: usize = self.fraction_coeff_count;
        let base: f64 = self.integer.base() as f64;
        let scaled_f: f64 = value.fract() * base.powi(f as i32);
        if scaled_f.abs() >= 9.0e18 {
            return Err(HeError::EncodingOverflow(format!(
                "{} fraction digits of base {} overflow the digit extraction",
                f,
                self.integer.base()
            )));
        }
        let frac_digits: Vec<i64> = self.integer.signed_digits(scaled_f.round() as i64);
        let carry: i64 = frac_digits.get(f).copied().unwrap_or(0);

        let int_digits: Vec<u64> = self.integer.digits(int_part as i64 + carry);
        if int_digits.len() > self.integer_coeff_count {
            return Err(HeError::EncodingOverflow(format!(
                "integer part of {} needs {} coefficients, encoder allows {}",
                value,
                int_digits.len(),
                self.integer_coeff_count
            )));
        }

        let t: u64 = self.plain_modulus;
        let n: usize = self.poly_modulus_degree;
        let mut coeffs: Vec<u64> = vec![0; n];
        coeffs[..int_digits.len()].copy_from_slice(&int_digits);
        for i in 1..=f {
            // Digit of b^-i, stored negated at degree n - i.
            let d: i64 = match f.checked_sub(i) {
                Some(j) if j < frac_digits.len() => frac_digits[j],
                _ => 0,
            };
            coeffs[n - i] = match d.cmp(&0) {
                std::cmp::Ordering::Greater => t - d as u64,
                std::cmp::Ordering::Less => d.unsigned_abs(),
                std::cmp::Ordering::Equal => 0,
            };
        }
        Ok(Plaintext::from_coeffs(coeffs))
    }

    pub fn decode(&self, plain: &Plaintext) -> Result<f64> {
        let n: usize = self.poly_modulus_degree;
        if plain.coeff_count() > n {
            return Err(HeError::PlaintextTooLarge {
                degree: plain.coeff_count(),
                limit: n,
            });
        }
        let t: u64 = self.plain_modulus;
        let threshold: u64 = (t + 1) >> 1;
        let centered = |c: u64| -> Result<f64> {
            if c >= t {
                return Err(HeError::InvalidParameters(format!(
                    "plaintext coefficient {} is not reduced modulo plain_modulus = {}",
                    c, t
                )));
            }
            Ok(if c >= threshold {
                -((t - c) as f64)
            } else {
                c as f64
            })
        };

        let base: f64 = self.integer.base() as f64;
        let mut result: f64 = 0.0;
        let int_count: usize = self.integer_coeff_count.min(plain.coeff_count());
        for &c in plain.coeffs()[..int_count].iter().rev() {
            result = result * base + centered(c)?;
        }
        let mut scale: f64 = 1.0;
        for i in 1..=self.fraction_coeff_count {
            scale /= base;
            if n - i < plain.coeff_count() {
                result -= centered(plain.coeffs()[n - i])? * scale;
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> FractionalEncoder {
        FractionalEncoder::new(1 << 20, 1024, 64, 32, 3).unwrap()
    }

    #[test]
    fn test_roundtrip_exact_integers() {
        let enc: FractionalEncoder = encoder();
        for v in [0.0f64, 1.0, -1.0, 42.0, -12345.0] {
            assert_eq!(enc.decode(&enc.encode(v).unwrap()).unwrap(), v);
        }
    }

    #[test]
    fn test_roundtrip_fractions() {
        let enc: FractionalEncoder = encoder();
        for v in [0.5f64, -0.25, 3.141592653589793, -2.71828] {
            let decoded: f64 = enc.decode(&enc.encode(v).unwrap()).unwrap();
            // 32 base-3 fraction digits carry more precision than f64 itself.
            assert!((decoded - v).abs() < 1e-12, "{} decoded as {}", v, decoded);
        }
    }

    #[test]
    fn test_exact_base_fraction() {
        // 1/3 has a one-digit balanced base-3 expansion.
        let enc: FractionalEncoder = encoder();
        let plain: Plaintext = enc.encode(1.0 / 3.0).unwrap();
        let tail = &plain.coeffs()[1024 - 32..];
        assert_eq!(tail.iter().filter(|&&c| c != 0).count(), 1);
        assert_eq!(enc.decode(&plain).unwrap(), 1.0 / 3.0);
    }

    #[test]
    fn test_counts_must_fit_degree() {
        assert!(matches!(
            FractionalEncoder::new(1 << 20, 64, 48, 32, 3),
            Err(HeError::EncodingOverflow(_))
        ));
    }

    #[test]
    fn test_rejects_non_finite() {
        let enc: FractionalEncoder = encoder();
        assert!(enc.encode(f64::NAN).is_err());
        assert!(enc.encode(f64::INFINITY).is_err());
    }
}
