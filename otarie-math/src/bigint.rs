use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};

/// Signed division rounding to the nearest integer, used when rescaling
/// composed coefficients.
pub trait DivRound {
    /// Rounds to the nearest integer, half away from zero.
    fn div_round(&self, other: &Self) -> Self;
}

impl DivRound for BigInt {
    fn div_round(&self, other: &Self) -> Self {
        let (quo, mut rem) = self.div_rem(other);
        rem <<= 1;
        if rem != BigInt::zero() && rem.abs() >= other.abs() {
            if (self.sign() == Sign::Minus) == (other.sign() == Sign::Minus) {
                return quo + BigInt::one();
            }
            return quo - BigInt::one();
        }
        quo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_div_round() {
        let q: BigInt = BigInt::from(10);
        assert_eq!(BigInt::from(14).div_round(&q), BigInt::from(1));
        assert_eq!(BigInt::from(15).div_round(&q), BigInt::from(2));
        assert_eq!(BigInt::from(-14).div_round(&q), BigInt::from(-1));
        assert_eq!(BigInt::from(-15).div_round(&q), BigInt::from(-2));
        assert_eq!(BigInt::from(20).div_round(&q), BigInt::from(2));
    }
}
