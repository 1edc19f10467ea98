// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for the reference kernels.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tensor_core::{gelu, inner_product, softmax, Shape};

fn bench_inner_product(c: &mut Criterion) {
    let mut group = c.benchmark_group("inner_product");
    for &k in &[64usize, 256, 1024] {
        let input = vec![0.5f32; k];
        let weight = vec![0.01f32; k * k];
        let bias = vec![0.1f32; k];
        let mut out = vec![0.0f32; k];
        group.bench_with_input(BenchmarkId::from_parameter(k), &k, |b, _| {
            b.iter(|| {
                inner_product(black_box(&input), &weight, Some(&bias), &mut out).unwrap();
            })
        });
    }
    group.finish();
}

fn bench_softmax(c: &mut Criterion) {
    let shape = Shape::matrix(64, 1024);
    let input: Vec<f32> = (0..shape.num_elements()).map(|i| (i % 17) as f32).collect();
    let mut out = vec![0.0f32; input.len()];
    c.bench_function("softmax_64x1024", |b| {
        b.iter(|| softmax(black_box(&input), &shape, 1, &mut out).unwrap())
    });
}

fn bench_gelu(c: &mut Criterion) {
    let input: Vec<f32> = (0..65536).map(|i| (i as f32 / 65536.0) * 8.0 - 4.0).collect();
    let mut out = vec![0.0f32; input.len()];
    c.bench_function("gelu_64k", |b| b.iter(|| gelu(black_box(&input), &mut out).unwrap()));
}

criterion_group!(benches, bench_inner_product, bench_softmax, bench_gelu);
criterion_main!(benches);
