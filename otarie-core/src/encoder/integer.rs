use crate::error::{HeError, Result};
use crate::plaintext::Plaintext;

/// Signed-integer encoder over balanced base-b digit expansions.
///
/// Base 2 encodes the binary digits of the magnitude, folding a negative
/// sign into t - 1 coefficients. An odd base b >= 3 uses balanced digits
/// in [-(b-1)/2, (b-1)/2]. Even bases above 2 have no balanced digit set
/// and are rejected.
pub struct IntegerEncoder {
    plain_modulus: u64,
    base: u64,
}

impl IntegerEncoder {
    pub fn new(plain_modulus: u64, base: u64) -> Result<IntegerEncoder> {
        if base < 2 || (base > 2 && base % 2 == 0) {
            return Err(HeError::InvalidParameters(format!(
                "encoding base = {} must be 2 or an odd integer >= 3",
                base
            )));
        }
        if plain_modulus <= base {
            return Err(HeError::InvalidParameters(format!(
                "plain_modulus = {} must exceed the encoding base {}",
                plain_modulus, base
            )));
        }
        Ok(IntegerEncoder {
            plain_modulus,
            base,
        })
    }

    #[inline(always)]
    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn encode(&self, value: i64) -> Plaintext {
        Plaintext::from_coeffs(self.digits(value))
    }

    /// Balanced base-b digits of `value`, low to high, each mapped to its
    /// non-negative representative mod t.
    pub(crate) fn digits(&self, value: i64) -> Vec<u64> {
        let t: u64 = self.plain_modulus;
        self.signed_digits(value)
            .into_iter()
            .map(|d| if d < 0 { t - d.unsigned_abs() } else { d as u64 })
            .collect()
    }

    #[inline(always)]
    pub(crate) fn signed_digits(&self, value: i64) -> Vec<i64> {
        signed_digits(self.base, value)
    }

    /// Evaluates the polynomial at x = base over centered coefficient
    /// representatives.
    pub fn decode(&self, plain: &Plaintext) -> Result<i64> {
        let acc: i128 = self.decode_value(plain)?;
        i64::try_from(acc).map_err(|_| {
            HeError::DecodingOverflow("decoded value exceeds the 64-bit signed range".to_string())
        })
    }

    /// Like [`Self::decode`], narrowed to the 32-bit signed range.
    pub fn decode_int32(&self, plain: &Plaintext) -> Result<i32> {
        let acc: i128 = self.decode_value(plain)?;
        i32::try_from(acc).map_err(|_| {
            HeError::DecodingOverflow("decoded value exceeds the 32-bit signed range".to_string())
        })
    }

    fn decode_value(&self, plain: &Plaintext) -> Result<i128> {
        let t: u64 = self.plain_modulus;
        let threshold: u64 = (t + 1) >> 1;
        let mut acc: i128 = 0;
        for &c in plain.coeffs().iter().rev() {
            if c >= t {
                return Err(HeError::InvalidParameters(format!(
                    "plaintext coefficient {} is not reduced modulo plain_modulus = {}",
                    c, t
                )));
            }
            let digit: i128 = if c >= threshold {
                -((t - c) as i128)
            } else {
                c as i128
            };
            acc = acc
                .checked_mul(self.base as i128)
                .and_then(|a| a.checked_add(digit))
                .ok_or_else(|| {
                    HeError::DecodingOverflow(
                        "decoded value exceeds the 64-bit signed range".to_string(),
                    )
                })?;
        }
        Ok(acc)
    }
}

/// Signed digits of `value` in the given base, low to high: binary with
/// the sign folded into every digit for base 2, balanced in
/// [-(b-1)/2, (b-1)/2] for odd bases.
pub(crate) fn signed_digits(base: u64, value: i64) -> Vec<i64> {
    let mut digits: Vec<i64> = Vec::new();
    if base == 2 {
        let sign: i64 = value.signum();
        let mut magnitude: u64 = value.unsigned_abs();
        while magnitude != 0 {
            digits.push((magnitude & 1) as i64 * sign);
            magnitude >>= 1;
        }
    } else {
        let b: i128 = base as i128;
        let half: i128 = b >> 1;
        let mut v: i128 = value as i128;
        while v != 0 {
            let mut r: i128 = v.rem_euclid(b);
            if r > half {
                r -= b;
            }
            digits.push(r as i64);
            v = (v - r) / b;
        }
    }
    digits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_roundtrip() {
        let encoder: IntegerEncoder = IntegerEncoder::new(257, 2).unwrap();
        for v in [0i64, 1, -1, 5, -7, 84, 1023, -4096, i32::MAX as i64] {
            assert_eq!(encoder.decode(&encoder.encode(v)).unwrap(), v);
        }
    }

    #[test]
    fn test_binary_negative_digits() {
        let encoder: IntegerEncoder = IntegerEncoder::new(257, 2).unwrap();
        // -5 = -(101)_2.
        assert_eq!(encoder.encode(-5).coeffs(), &[256, 0, 256]);
    }

    #[test]
    fn test_balanced_base_three_roundtrip() {
        let encoder: IntegerEncoder = IntegerEncoder::new(8192, 3).unwrap();
        for v in [0i64, 2, -2, 12345, -12345, 1 << 40] {
            assert_eq!(encoder.decode(&encoder.encode(v)).unwrap(), v);
        }
    }

    #[test]
    fn test_balanced_digits_are_small() {
        let encoder: IntegerEncoder = IntegerEncoder::new(8192, 3).unwrap();
        let plain: Plaintext = encoder.encode(12345);
        // Balanced base 3: every digit is 0, 1 or -1 (= t - 1).
        assert!(plain
            .coeffs()
            .iter()
            .all(|&c| c == 0 || c == 1 || c == 8191));
    }

    #[test]
    fn test_even_base_rejected() {
        assert!(matches!(
            IntegerEncoder::new(257, 4),
            Err(HeError::InvalidParameters(_))
        ));
        assert!(IntegerEncoder::new(257, 3).is_ok());
    }

    #[test]
    fn test_extreme_values() {
        let encoder: IntegerEncoder = IntegerEncoder::new(257, 2).unwrap();
        for v in [i64::MAX, i64::MIN, i64::MIN + 1] {
            assert_eq!(encoder.decode(&encoder.encode(v)).unwrap(), v);
        }
    }

    #[test]
    fn test_decode_int32_width_check() {
        let encoder: IntegerEncoder = IntegerEncoder::new(257, 2).unwrap();
        for v in [0i32, 1, -1, 12345, i32::MAX, i32::MIN] {
            let plain: Plaintext = encoder.encode(v as i64);
            assert_eq!(encoder.decode_int32(&plain).unwrap(), v);
        }
        // 2^40 fits the 64-bit decode but not the 32-bit one.
        let wide: Plaintext = encoder.encode(1 << 40);
        assert_eq!(encoder.decode(&wide).unwrap(), 1 << 40);
        assert!(matches!(
            encoder.decode_int32(&wide),
            Err(HeError::DecodingOverflow(_))
        ));
        let negative_wide: Plaintext = encoder.encode(i32::MIN as i64 - 1);
        assert!(matches!(
            encoder.decode_int32(&negative_wide),
            Err(HeError::DecodingOverflow(_))
        ));
    }

    #[test]
    fn test_decode_overflow() {
        let encoder: IntegerEncoder = IntegerEncoder::new(257, 2).unwrap();
        // 2^64 = a single 1 coefficient at degree 64.
        let mut coeffs: Vec<u64> = vec![0; 65];
        coeffs[64] = 1;
        let err = encoder.decode(&Plaintext::from_coeffs(coeffs));
        assert!(matches!(err, Err(HeError::DecodingOverflow(_))));
    }
}
