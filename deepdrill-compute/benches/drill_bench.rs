use criterion::{criterion_group, criterion_main, Criterion};

use deepdrill_compute::{DrillMap, Driller, Options};
use deepdrill_core::ExtendedComplex;

fn options(pairs: &[(&str, &str)]) -> Options {
    let mut opt = Options::new();
    for (key, value) in pairs {
        opt.parse_key(key, value).unwrap();
    }
    opt.derive().unwrap();
    opt
}

fn bench_delta_recurrence(c: &mut Criterion) {
    // The inner loop of the driller: multiply-add-reduce on extended
    // complex values.
    let zref2 = ExtendedComplex::new(-1.2, 0.3).reduced();
    let d0 = ExtendedComplex::new(1e-30, -2e-30).reduced();

    c.bench_function("delta_recurrence_1000", |b| {
        b.iter(|| {
            let mut dn = d0;
            for _ in 0..1000 {
                dn *= zref2 + dn;
                dn += d0;
                dn.reduce();
            }
            dn
        });
    });
}

fn bench_shallow_frame(c: &mut Criterion) {
    let opt = options(&[
        ("image.width", "64"),
        ("image.height", "64"),
        ("location.depth", "500"),
    ]);

    c.bench_function("drill_64x64_depth500", |b| {
        b.iter(|| {
            let mut map = DrillMap::new(&opt);
            Driller::with_seed(&opt, &mut map, 1).drill().unwrap();
            map
        });
    });
}

fn bench_deep_frame(c: &mut Criterion) {
    let opt = options(&[
        ("image.width", "32"),
        ("image.height", "32"),
        ("location.real", "-1.769110"),
        ("location.imag", "0.003757"),
        ("location.zoom", "1e6"),
        ("location.depth", "2000"),
    ]);

    c.bench_function("drill_32x32_zoom1e6", |b| {
        b.iter(|| {
            let mut map = DrillMap::new(&opt);
            Driller::with_seed(&opt, &mut map, 1).drill().unwrap();
            map
        });
    });
}

criterion_group!(
    benches,
    bench_delta_recurrence,
    bench_shallow_frame,
    bench_deep_frame
);
criterion_main!(benches);
