use fnv::FnvHashMap;
use otarie_math::poly::RnsPoly;

/// Ternary secret key, stored per factor in the NTT domain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretKey {
    pub(crate) s_ntt: RnsPoly,
    pub(crate) fingerprint: u64,
}

impl SecretKey {
    #[inline(always)]
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

/// Encryption of zero under the secret key, NTT domain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    pub(crate) p0: RnsPoly,
    pub(crate) p1: RnsPoly,
    pub(crate) fingerprint: u64,
}

impl PublicKey {
    #[inline(always)]
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

/// Key-switching key: for each base-2^dbc digit position l, a pair
/// (-(a_l s + e_l) + 2^(dbc l) s', a_l) in the NTT domain, taking terms
/// acting on s' to terms acting on s.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KswKey {
    pub(crate) k0: Vec<RnsPoly>,
    pub(crate) k1: Vec<RnsPoly>,
}

impl KswKey {
    #[inline(always)]
    pub(crate) fn digits(&self) -> usize {
        self.k0.len()
    }
}

/// Relinearization keys: entry j switches a term acting on s^(j+2) back
/// to the canonical size-2 form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvaluationKeySet {
    pub(crate) keys: Vec<KswKey>,
    pub(crate) decomposition_bit_count: usize,
    pub(crate) fingerprint: u64,
}

impl EvaluationKeySet {
    /// Number of keys held; relinearizing a size-M ciphertext needs M - 2.
    #[inline(always)]
    pub fn count(&self) -> usize {
        self.keys.len()
    }

    #[inline(always)]
    pub fn decomposition_bit_count(&self) -> usize {
        self.decomposition_bit_count
    }

    #[inline(always)]
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

/// Key-switching keys for the Galois automorphisms backing slot rotations,
/// keyed by Galois element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GaloisKeySet {
    pub(crate) keys: FnvHashMap<u64, KswKey>,
    pub(crate) decomposition_bit_count: usize,
    pub(crate) fingerprint: u64,
}

impl GaloisKeySet {
    #[inline(always)]
    pub fn contains(&self, galois_elt: u64) -> bool {
        self.keys.contains_key(&galois_elt)
    }

    #[inline(always)]
    pub fn decomposition_bit_count(&self) -> usize {
        self.decomposition_bit_count
    }

    #[inline(always)]
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn elements(&self) -> Vec<u64> {
        let mut elements: Vec<u64> = self.keys.keys().copied().collect();
        elements.sort_unstable();
        elements
    }
}
