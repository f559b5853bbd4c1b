use otarie_math::primes::NttPrimeGenerator;

use crate::error::{HeError, Result};

/// Classical security targets for the standard coefficient modulus
/// profiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecurityLevel {
    Tc128,
    Tc192,
    Tc256,
}

/// Factor bit lengths whose totals match the homomorphic encryption
/// standard's modulus budget for each (security, degree) pair.
fn bit_profile(level: SecurityLevel, degree: usize) -> Option<&'static [usize]> {
    let profile: &'static [usize] = match (level, degree) {
        (SecurityLevel::Tc128, 1024) => &[27],
        (SecurityLevel::Tc128, 2048) => &[54],
        (SecurityLevel::Tc128, 4096) => &[36, 36, 37],
        (SecurityLevel::Tc128, 8192) => &[43, 43, 44, 44, 44],
        (SecurityLevel::Tc128, 16384) => &[48, 48, 48, 49, 49, 49, 49, 49, 49],
        (SecurityLevel::Tc128, 32768) => &[
            55, 55, 55, 55, 55, 55, 55, 55, 55, 55, 55, 55, 55, 55, 55, 56,
        ],
        (SecurityLevel::Tc192, 1024) => &[19],
        (SecurityLevel::Tc192, 2048) => &[37],
        (SecurityLevel::Tc192, 4096) => &[37, 38],
        (SecurityLevel::Tc192, 8192) => &[50, 51, 51],
        (SecurityLevel::Tc192, 16384) => &[60, 60, 60, 60, 60],
        (SecurityLevel::Tc192, 32768) => &[51, 56, 56, 56, 56, 56, 56, 56, 56, 56, 56],
        (SecurityLevel::Tc256, 1024) => &[14],
        (SecurityLevel::Tc256, 2048) => &[29],
        (SecurityLevel::Tc256, 4096) => &[58],
        (SecurityLevel::Tc256, 8192) => &[59, 59],
        (SecurityLevel::Tc256, 16384) => &[47, 47, 47, 48, 48],
        (SecurityLevel::Tc256, 32768) => &[47, 47, 47, 47, 48, 48, 48, 48, 48, 48],
        _ => return None,
    };
    Some(profile)
}

/// Standard coefficient modulus for the given security level and degree,
/// largest factor first. The factors are NTT primes for the degree, so the
/// returned vector drops straight into
/// [`EncryptionParameters::set_coeff_modulus`](crate::EncryptionParameters::set_coeff_modulus).
pub fn standard_parameters(level: SecurityLevel, degree: usize) -> Result<Vec<u64>> {
    let profile: &[usize] = bit_profile(level, degree).ok_or_else(|| {
        HeError::ParametersNotAvailable(format!(
            "no standard coefficient modulus for security level {:?} at degree {}",
            level, degree
        ))
    })?;

    let mut sizes: Vec<usize> = profile.to_vec();
    sizes.dedup();
    let mut factors: Vec<u64> = Vec::with_capacity(profile.len());
    for &bits in sizes.iter() {
        let count: usize = profile.iter().filter(|&&b| b == bits).count();
        factors.extend(primes_of_size(bits, degree, count)?);
    }
    factors.sort_unstable_by(|a, b| b.cmp(a));
    Ok(factors)
}

/// The `count` largest primes of exactly `bit_length` bits supporting a
/// degree-`degree` NTT, largest first.
pub fn primes_of_size(bit_length: usize, degree: usize, count: usize) -> Result<Vec<u64>> {
    if !(2..=60).contains(&bit_length) {
        return Err(HeError::ParametersNotAvailable(format!(
            "prime bit length {} is outside [2, 60]",
            bit_length
        )));
    }
    if degree < 2 || degree & (degree - 1) != 0 {
        return Err(HeError::ParametersNotAvailable(format!(
            "degree {} is not a power of two",
            degree
        )));
    }
    let mut generator: NttPrimeGenerator = NttPrimeGenerator::new(bit_length, degree);
    let mut primes: Vec<u64> = Vec::with_capacity(count);
    while primes.len() < count {
        match generator.next_downstream() {
            Some(p) => primes.push(p),
            None => {
                return Err(HeError::ParametersNotAvailable(format!(
                    "only {} primes of {} bits support a degree-{} transform, {} requested",
                    primes.len(),
                    bit_length,
                    degree,
                    count
                )))
            }
        }
    }
    Ok(primes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use otarie_math::modulus::prime::is_prime;

    #[test]
    fn test_standard_parameters_are_ntt_primes() {
        for degree in [1024usize, 2048, 4096, 8192] {
            let factors: Vec<u64> = standard_parameters(SecurityLevel::Tc128, degree).unwrap();
            assert!(!factors.is_empty());
            for &q in factors.iter() {
                assert!(is_prime(q));
                assert_eq!(q % (2 * degree as u64), 1);
            }
            // Largest first, all distinct.
            assert!(factors.windows(2).all(|w| w[0] > w[1]));
        }
    }

    #[test]
    fn test_standard_parameters_total_bits() {
        let factors: Vec<u64> = standard_parameters(SecurityLevel::Tc128, 4096).unwrap();
        let total: u32 = factors.iter().map(|q| 64 - q.leading_zeros()).sum();
        assert_eq!(total, 109);
    }

    #[test]
    fn test_unsupported_degree() {
        assert!(matches!(
            standard_parameters(SecurityLevel::Tc128, 512),
            Err(HeError::ParametersNotAvailable(_))
        ));
    }

    #[test]
    fn test_primes_of_size() {
        let primes: Vec<u64> = primes_of_size(30, 4096, 3).unwrap();
        assert_eq!(primes.len(), 3);
        assert!(primes.windows(2).all(|w| w[0] > w[1]));
        for &p in primes.iter() {
            assert_eq!(64 - p.leading_zeros(), 30);
            assert_eq!(p % 8192, 1);
        }
    }

    #[test]
    fn test_primes_of_size_rejects_width() {
        assert!(primes_of_size(61, 4096, 1).is_err());
        assert!(primes_of_size(1, 4096, 1).is_err());
    }
}
