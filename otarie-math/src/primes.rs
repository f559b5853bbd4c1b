use crate::modulus::prime::is_prime;

/// Streams primes of a fixed bit length congruent to 1 modulo 2n, so each
/// one supports a negacyclic NTT of degree n. Candidates are walked
/// deterministically, largest first downstream and smallest first upstream.
pub struct NttPrimeGenerator {
    bit_length: usize,
    modulo: u64,
    low: u64,
    high: u64,
    next_prime: u64,
    prev_prime: u64,
}

impl NttPrimeGenerator {
    pub fn new(bit_length: usize, n: usize) -> NttPrimeGenerator {
        assert!(
            (2..=61).contains(&bit_length),
            "invalid argument: bit_length = {} not in [2, 61]",
            bit_length
        );
        assert!(
            n >= 2 && n & (n - 1) == 0,
            "invalid argument: n = {} is not a power of two",
            n
        );
        let modulo: u64 = (n as u64) << 1;
        let low: u64 = 1 << (bit_length - 1);
        let high: u64 = (1 << bit_length) - 1;
        // Largest and smallest candidates = 1 mod 2n within the bit range.
        let prev_prime: u64 = (high - 1) / modulo * modulo + 1;
        let next_prime: u64 = (low + modulo - 2) / modulo * modulo + 1;
        Self {
            bit_length,
            modulo,
            low,
            high,
            next_prime,
            prev_prime,
        }
    }

    #[inline(always)]
    pub fn bit_length(&self) -> usize {
        self.bit_length
    }

    /// Next prime walking down from 2^bit_length.
    pub fn next_downstream(&mut self) -> Option<u64> {
        while self.prev_prime >= self.low {
            let candidate: u64 = self.prev_prime;
            if candidate < self.modulo {
                break;
            }
            self.prev_prime -= self.modulo;
            if is_prime(candidate) {
                return Some(candidate);
            }
        }
        None
    }

    /// Next prime walking up from 2^(bit_length-1).
    pub fn next_upstream(&mut self) -> Option<u64> {
        while self.next_prime <= self.high {
            let candidate: u64 = self.next_prime;
            self.next_prime += self.modulo;
            if is_prime(candidate) {
                return Some(candidate);
            }
        }
        None
    }
}

/// The largest `count` NTT-friendly primes of the given bit length, in
/// decreasing order. Returns None when the bit range is exhausted.
pub fn primes_of_size(bit_length: usize, n: usize, count: usize) -> Option<Vec<u64>> {
    let mut generator: NttPrimeGenerator = NttPrimeGenerator::new(bit_length, n);
    let mut primes: Vec<u64> = Vec::with_capacity(count);
    for _ in 0..count {
        primes.push(generator.next_downstream()?);
    }
    Some(primes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primes_of_size() {
        let n: usize = 2048;
        let primes: Vec<u64> = primes_of_size(54, n, 3).unwrap();
        assert_eq!(primes.len(), 3);
        for window in primes.windows(2) {
            assert!(window[0] > window[1]);
        }
        for p in primes {
            assert!(is_prime(p));
            assert_eq!(p % ((n as u64) << 1), 1);
            assert_eq!(64 - p.leading_zeros(), 54);
        }
    }

    #[test]
    fn test_upstream_downstream_disjoint_walk() {
        let mut generator: NttPrimeGenerator = NttPrimeGenerator::new(20, 16);
        let up: u64 = generator.next_upstream().unwrap();
        let down: u64 = generator.next_downstream().unwrap();
        assert!(up < down);
        assert_eq!(up % 32, 1);
        assert_eq!(down % 32, 1);
    }
}
