use itertools::izip;

use otarie_math::poly::RnsPoly;
use otarie_math::ring::RnsRing;
use otarie_sampling::Source;

/// Fills a with residues drawn uniformly per factor.
pub(crate) fn fill_uniform(ring: &RnsRing, source: &mut Source, a: &mut RnsPoly) {
    izip!(ring.tables().iter(), a.0.iter_mut()).for_each(|(table, poly)| {
        let q: u64 = table.q();
        let mask: u64 = u64::MAX >> q.leading_zeros();
        poly.iter_mut().for_each(|x| *x = source.next_u64n(q, mask));
    });
}

/// Clipped Gaussian noise polynomial in signed form.
pub(crate) fn gaussian_vec(
    n: usize,
    std_dev: f64,
    max_deviation: f64,
    source: &mut Source,
) -> Vec<i64> {
    let mut e: Vec<i64> = vec![0; n];
    source.fill_gaussian(std_dev, max_deviation, &mut e);
    e
}

/// Uniform ternary polynomial in signed form.
pub(crate) fn ternary_vec(n: usize, source: &mut Source) -> Vec<i64> {
    let mut u: Vec<i64> = vec![0; n];
    source.fill_ternary(&mut u);
    u
}
