use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_core::{OsRng, RngCore, TryRngCore};
use rand_distr::{Distribution, Normal};

/// Fresh seed from OS entropy. Panics if the OS entropy source fails.
pub fn new_seed() -> [u8; 32] {
    let mut seed = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut seed)
        .expect("OS entropy source failed");
    seed
}

/// Deterministic cryptographic randomness, seedable and branchable so key
/// generation and encryption derive independent streams from one seed.
pub struct Source {
    source: ChaCha8Rng,
}

impl Source {
    pub fn new(seed: [u8; 32]) -> Source {
        Source {
            source: ChaCha8Rng::from_seed(seed),
        }
    }

    pub fn new_seed(&mut self) -> [u8; 32] {
        let mut seed: [u8; 32] = [0u8; 32];
        self.source.fill_bytes(&mut seed);
        seed
    }

    pub fn branch(&mut self) -> Self {
        Source::new(self.new_seed())
    }

    /// Uniform draw in [0, max) by rejection under the given bit mask.
    #[inline(always)]
    pub fn next_u64n(&mut self, max: u64, mask: u64) -> u64 {
        let mut x: u64 = self.next_u64() & mask;
        while x >= max {
            x = self.next_u64() & mask;
        }
        x
    }

    /// Uniform ternary coefficients in {-1, 0, 1}.
    pub fn fill_ternary(&mut self, out: &mut [i64]) {
        out.iter_mut()
            .for_each(|x| *x = (self.next_u64n(3, 3) as i64) - 1);
    }

    /// Zero-centered discrete Gaussian by rounding, rejecting draws beyond
    /// the clipping bound.
    pub fn fill_gaussian(&mut self, std_dev: f64, bound: f64, out: &mut [i64]) {
        let normal: Normal<f64> =
            Normal::new(0.0, std_dev).expect("std_dev must be finite and positive");
        out.iter_mut().for_each(|x| {
            *x = loop {
                let v: f64 = normal.sample(&mut self.source).round();
                if v.abs() <= bound {
                    break v as i64;
                }
            };
        });
    }
}

impl RngCore for Source {
    #[inline(always)]
    fn next_u32(&mut self) -> u32 {
        self.source.next_u32()
    }

    #[inline(always)]
    fn next_u64(&mut self) -> u64 {
        self.source.next_u64()
    }

    #[inline(always)]
    fn fill_bytes(&mut self, bytes: &mut [u8]) {
        self.source.fill_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let seed: [u8; 32] = [7u8; 32];
        let mut a: Source = Source::new(seed);
        let mut b: Source = Source::new(seed);
        assert_eq!(a.next_u64(), b.next_u64());
        assert_eq!(a.branch().next_u64(), b.branch().next_u64());
    }

    #[test]
    fn test_branch_diverges() {
        let mut a: Source = Source::new([1u8; 32]);
        let mut b: Source = a.branch();
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn test_next_u64n() {
        let mut s: Source = Source::new(new_seed());
        for _ in 0..1000 {
            assert!(s.next_u64n(97, 127) < 97);
        }
    }

    #[test]
    fn test_ternary_range() {
        let mut s: Source = Source::new([3u8; 32]);
        let mut out: Vec<i64> = vec![0; 4096];
        s.fill_ternary(&mut out);
        assert!(out.iter().all(|&x| (-1..=1).contains(&x)));
        assert!(out.iter().any(|&x| x == -1));
        assert!(out.iter().any(|&x| x == 1));
    }

    #[test]
    fn test_gaussian_bound() {
        let mut s: Source = Source::new([5u8; 32]);
        let mut out: Vec<i64> = vec![0; 4096];
        s.fill_gaussian(3.19, 19.14, &mut out);
        assert!(out.iter().all(|&x| (x as f64).abs() <= 19.14));
        assert!(out.iter().any(|&x| x != 0));
    }
}
