//! Flag codec benchmarks.
//!
//! Measures pack/unpack cost for the mapping-table codec; both sit on the
//! hot path of every resolution call.

use criterion::{Criterion, criterion_group, criterion_main};
use riptide_core::flags::{AddrInfoFlag, FlagMapping};

const TABLE: FlagMapping<AddrInfoFlag> = FlagMapping::new(&[
    (AddrInfoFlag::Passive, 0x0001),
    (AddrInfoFlag::CanonName, 0x0002),
    (AddrInfoFlag::NumericHost, 0x0004),
    (AddrInfoFlag::V4Mapped, 0x0008),
    (AddrInfoFlag::All, 0x0010),
    (AddrInfoFlag::AddrConfig, 0x0020),
    (AddrInfoFlag::NumericServ, 0x0400),
]);

fn bench_pack(c: &mut Criterion) {
    let flags = [
        AddrInfoFlag::NumericHost,
        AddrInfoFlag::NumericServ,
        AddrInfoFlag::CanonName,
    ];
    c.bench_function("pack_three_flags", |b| {
        b.iter(|| criterion::black_box(TABLE.pack(&flags)));
    });
}

fn bench_unpack(c: &mut Criterion) {
    let mask = TABLE.pack(&[
        AddrInfoFlag::NumericHost,
        AddrInfoFlag::NumericServ,
        AddrInfoFlag::CanonName,
    ]);
    c.bench_function("unpack_three_flags", |b| {
        b.iter(|| criterion::black_box(TABLE.unpack(mask)));
    });
}

criterion_group!(benches, bench_pack, bench_unpack);
criterion_main!(benches);
