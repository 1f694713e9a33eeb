//! Benchmarks for the advertisement ingestion pipeline.
//!
//! Covers the pure decode path and the full admit -> decode -> registry path
//! that the scan loop runs for every advertisement.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use mopeka_listener::{Advertisement, Registry, decode, ingest};
use std::time::SystemTime;

const TEST_ADDRESS: &str = "AA:BB:CC:DD:EE:FF";

/// Standard propane sensor, 20 °C, raw level 500
fn payload() -> Vec<u8> {
    vec![
        0x59, 0x00, 0x03, 0x5C, 0x3C, 0xF4, 0xC1, 0xDD, 0xEE, 0xFF, 0x0A, 0xF6,
    ]
}

/// iBeacon-style payload from an unrelated vendor
fn foreign_payload() -> Vec<u8> {
    vec![
        0x4C, 0x00, 0x02, 0x15, 0xE2, 0xC5, 0x6D, 0xB5, 0xDF, 0xFB, 0x48, 0xD2, 0xB0, 0x60,
    ]
}

fn advertisement(address: String, manufacturer_data: Vec<u8>) -> Advertisement {
    Advertisement {
        address,
        name: "M1017".to_string(),
        rssi: -60,
        manufacturer_data,
    }
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    let data = payload();
    let now = SystemTime::now();

    group.throughput(Throughput::Elements(1));
    group.bench_function("decode_and_derive", |b| {
        b.iter(|| {
            let reading = decode(TEST_ADDRESS, now, "M1017", -60, black_box(&data)).unwrap();
            black_box((
                reading.tank_level_mm(),
                reading.level_percent("500g_h"),
                reading.temperature_celsius(),
                reading.battery_percent(),
            ))
        })
    });

    let foreign = foreign_payload();
    group.bench_function("reject_foreign", |b| {
        b.iter(|| black_box(decode(TEST_ADDRESS, now, "", -80, black_box(&foreign))))
    });

    group.finish();
}

/// Mixed traffic: every sensor advertisement is followed by a foreign one.
fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");

    for sensors in [1usize, 10, 100] {
        let advertisements: Vec<Advertisement> = (0..sensors)
            .flat_map(|i| {
                let address = format!("AA:BB:CC:DD:{:02X}:{:02X}", i / 256, i % 256);
                [
                    advertisement(address.clone(), payload()),
                    advertisement(address, foreign_payload()),
                ]
            })
            .collect();

        group.throughput(Throughput::Elements(advertisements.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(sensors),
            &advertisements,
            |b, advertisements| {
                let registry = Registry::new();
                b.iter(|| {
                    for adv in advertisements {
                        ingest(&registry, black_box(adv));
                    }
                    black_box(registry.list())
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_decode, bench_ingest);
criterion_main!(benches);
