use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use otarie_math::modulus::prime::Prime;
use otarie_math::ntt::NttTable;

fn ntt(c: &mut Criterion) {
    let q: u64 = 0x1fffffffffe00001u64;

    let mut group = c.benchmark_group("ntt");

    for log_n in 10..15 {
        let n: usize = 1 << log_n;
        let table: NttTable = NttTable::new(Prime::new(q), n);
        let mut a: Vec<u64> = (0..n as u64).collect();

        group.bench_with_input(
            BenchmarkId::new("forward_inplace", format!("n={}", n)),
            &(),
            |b, _| b.iter(|| table.forward_inplace(&mut a)),
        );
        group.bench_with_input(
            BenchmarkId::new("backward_inplace", format!("n={}", n)),
            &(),
            |b, _| b.iter(|| table.backward_inplace(&mut a)),
        );
    }
}

criterion_group!(benches, ntt);
criterion_main!(benches);
