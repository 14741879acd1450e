// Copyright 2026 the MetaFFI CDTS Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use cdts::memory::system;
use cdts::{Cdts, CdtsPool, MetaffiType, PoolConfig, Serializer};

/// Entry point for `cdts` wind-tunnel benchmarks.
///
/// Scenarios cover the shapes a call boundary sees most: flat scalar parameter lists, nested
/// numeric arrays, deep nesting, strings, and per-call buffer churn through the pool.
fn bench_cdts(c: &mut Criterion) {
    bench_flat_scalars(c);
    bench_matrix_write(c);
    bench_matrix_read(c);
    bench_deep_nesting(c);
    bench_strings(c);
    bench_pool_call_buffers(c);
}

/// Writes then reads `len` root-level `int64` values.
fn bench_flat_scalars(c: &mut Criterion) {
    let mut group = c.benchmark_group("flat_scalars");
    for &len in &[4_usize, 64, 1_024] {
        let mut data = Cdts::new(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            b.iter(|| {
                let mut ser = Serializer::new(&mut data);
                for i in 0..len {
                    ser.add_int64(black_box(i64::try_from(i).unwrap_or(i64::MAX)))
                        .unwrap();
                }
                ser.reset();
                let mut sum = 0_i64;
                while ser.has_more() {
                    sum = sum.wrapping_add(ser.get_int64().unwrap());
                }
                black_box(sum)
            });
        });
    }
    group.finish();
}

fn write_matrix(data: &mut Cdts, rows: usize, cols: usize) {
    let mut ser = Serializer::new(data);
    ser.add_array_begin(rows, MetaffiType::FLOAT64).unwrap();
    for r in 0..rows {
        ser.add_array_begin(cols, MetaffiType::FLOAT64).unwrap();
        for c in 0..cols {
            let v = f64::from(u32::try_from(r * cols + c).unwrap_or(u32::MAX));
            ser.add_float64(black_box(v)).unwrap();
        }
        ser.add_array_end().unwrap();
    }
    ser.add_array_end().unwrap();
}

/// Writes a square `float64` matrix as an array of row arrays.
fn bench_matrix_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("matrix_write");
    for &n in &[8_usize, 64, 256] {
        let mut data = Cdts::new(1);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| write_matrix(&mut data, n, n));
        });
    }
    group.finish();
}

/// Reads back a square matrix element by element.
fn bench_matrix_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("matrix_read");
    for &n in &[8_usize, 64, 256] {
        let mut data = Cdts::new(1);
        write_matrix(&mut data, n, n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let mut ser = Serializer::new(&mut data);
                let (rows, _) = ser.get_array_begin().unwrap();
                let mut sum = 0.0_f64;
                for _ in 0..rows {
                    let (cols, _) = ser.get_array_begin().unwrap();
                    for _ in 0..cols {
                        sum += ser.get_float64().unwrap();
                    }
                    ser.get_array_end().unwrap();
                }
                ser.get_array_end().unwrap();
                black_box(sum)
            });
        });
    }
    group.finish();
}

/// Opens and closes a chain of single-element arrays. Cost should grow linearly with depth.
fn bench_deep_nesting(c: &mut Criterion) {
    let mut group = c.benchmark_group("deep_nesting");
    for &depth in &[16_usize, 1_024, 16_384] {
        let mut data = Cdts::new(1);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter(|| {
                let mut ser = Serializer::new(&mut data);
                for _ in 0..depth {
                    ser.add_array_begin(1, MetaffiType::INT8).unwrap();
                }
                ser.add_int8(black_box(1)).unwrap();
                for _ in 0..depth {
                    ser.add_array_end().unwrap();
                }
            });
        });
    }
    group.finish();
}

/// Copies UTF-8 strings of growing size in and out.
fn bench_strings(c: &mut Criterion) {
    let mut group = c.benchmark_group("string8_round_trip");
    for &size in &[16_usize, 1_024, 65_536] {
        let payload = vec![b'x'; size];
        let mut data = Cdts::new(1);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut ser = Serializer::new(&mut data);
                ser.add_string8(Some(black_box(payload.as_slice()))).unwrap();
                ser.reset();
                black_box(ser.get_string8().unwrap())
            });
        });
    }
    group.finish();
}

/// Acquires, fills, and releases the buffers of one call, pooled and unpooled.
fn bench_pool_call_buffers(c: &mut Criterion) {
    let mut group = c.benchmark_group("call_buffers");
    for (label, config) in [
        ("pooled", PoolConfig::default()),
        (
            "unpooled",
            PoolConfig {
                max_cached: 0,
                ..PoolConfig::default()
            },
        ),
    ] {
        let mut pool = CdtsPool::new(config);
        group.bench_function(label, |b| {
            b.iter(|| {
                let mut bufs = pool.alloc_call_buffers(system(), 3, 1).unwrap();
                let mut ser = Serializer::new(&mut bufs.params);
                ser.add_int32(black_box(7)).unwrap();
                ser.add_string8(Some(b"name")).unwrap();
                ser.add_null().unwrap();
                drop(ser);
                Serializer::new(&mut bufs.rets).add_bool(true).unwrap();
                pool.release_call_buffers(bufs);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_cdts);
criterion_main!(benches);
