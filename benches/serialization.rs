use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndserial::{
    binary, json, yaml, DType, DecodeOptions, EncodeOptions, NdArray, SparseFormat, SparseMatrix,
    Value,
};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone)]
struct Frame {
    id: u32,
    label: String,
    pixels: NdArray,
    mask: SparseMatrix,
}

fn grid(side: usize) -> NdArray {
    let values: Vec<f64> = (0..side * side).map(|i| i as f64 * 0.5).collect();
    NdArray::from_shape_vec(&[side, side], values).unwrap()
}

fn banded(n: usize, format: SparseFormat) -> SparseMatrix {
    let mut row = Vec::new();
    let mut col = Vec::new();
    let mut data = Vec::new();
    for i in 0..n {
        for j in i.saturating_sub(1)..(i + 2).min(n) {
            row.push(i);
            col.push(j);
            data.push((i * n + j) as f64);
        }
    }
    SparseMatrix::from_triplets((n, n), row, col, NdArray::from_vec(data), format).unwrap()
}

fn frame(side: usize) -> Frame {
    Frame {
        id: 7,
        label: "calibration".to_string(),
        pixels: grid(side),
        mask: SparseMatrix::identity(side, DType::Bool, SparseFormat::Coo),
    }
}

fn unsafe_encode() -> EncodeOptions {
    EncodeOptions::new().with_safe_mode(false)
}

fn unsafe_decode() -> DecodeOptions {
    DecodeOptions::new().with_safe_mode(false)
}

fn benchmark_dense_arrays(c: &mut Criterion) {
    let mut group = c.benchmark_group("dense_arrays");

    for side in [8usize, 32, 128].iter() {
        let doc = Value::NdArray(grid(*side));
        let options = EncodeOptions::new();

        group.bench_with_input(BenchmarkId::new("json_dumps", side), &doc, |b, doc| {
            b.iter(|| json::dumps(black_box(doc), &options))
        });

        let text = json::dumps(&doc, &options).unwrap();
        group.bench_with_input(BenchmarkId::new("json_loads", side), &text, |b, text| {
            b.iter(|| json::loads(black_box(text), &DecodeOptions::new()))
        });

        group.bench_with_input(BenchmarkId::new("binary_dumps", side), &doc, |b, doc| {
            b.iter(|| binary::dumps(black_box(doc), &options))
        });

        let bytes = binary::dumps(&doc, &options).unwrap();
        group.bench_with_input(BenchmarkId::new("binary_loads", side), &bytes, |b, bytes| {
            b.iter(|| binary::loads(black_box(bytes), &DecodeOptions::new()))
        });
    }
    group.finish();
}

fn benchmark_sparse_formats(c: &mut Criterion) {
    let mut group = c.benchmark_group("sparse_formats");

    for format in SparseFormat::ALL.iter() {
        let doc = Value::Sparse(banded(200, *format));
        let text = json::dumps(&doc, &EncodeOptions::new()).unwrap();

        group.bench_with_input(BenchmarkId::new("json_dumps", format), &doc, |b, doc| {
            b.iter(|| json::dumps(black_box(doc), &EncodeOptions::new()))
        });

        group.bench_with_input(BenchmarkId::new("json_loads", format), &text, |b, text| {
            b.iter(|| json::loads(black_box(text), &DecodeOptions::new()))
        });
    }
    group.finish();
}

fn benchmark_format_change(c: &mut Criterion) {
    let m = banded(500, SparseFormat::Coo);

    c.bench_function("asformat_coo_to_csr", |b| {
        b.iter(|| black_box(&m).asformat(SparseFormat::Csr))
    });

    c.bench_function("asformat_coo_to_dia", |b| {
        b.iter(|| black_box(&m).asformat(SparseFormat::Dia))
    });
}

fn benchmark_primitive_mode(c: &mut Criterion) {
    let doc = Value::NdArray(grid(64));
    let tagged = EncodeOptions::new();
    let primitive = EncodeOptions::new().primitive();

    let mut group = c.benchmark_group("primitive_mode");
    group.bench_function("tagged", |b| b.iter(|| json::dumps(black_box(&doc), &tagged)));
    group.bench_function("nested_lists", |b| {
        b.iter(|| json::dumps(black_box(&doc), &primitive))
    });
    group.finish();
}

fn benchmark_typed_frame(c: &mut Criterion) {
    let data = frame(32);

    let mut group = c.benchmark_group("typed_frame");

    group.bench_function("json_to_string", |b| {
        b.iter(|| json::to_string(black_box(&data), &EncodeOptions::new()))
    });

    group.bench_function("yaml_to_string", |b| {
        b.iter(|| yaml::to_string(black_box(&data), &unsafe_encode()))
    });

    let json_text = json::to_string(&data, &EncodeOptions::new()).unwrap();
    let yaml_text = yaml::to_string(&data, &unsafe_encode()).unwrap();

    group.bench_function("json_from_str", |b| {
        b.iter(|| json::from_str::<Frame>(black_box(&json_text), &DecodeOptions::new()))
    });

    group.bench_function("yaml_from_str", |b| {
        b.iter(|| yaml::from_str::<Frame>(black_box(&yaml_text), &unsafe_decode()))
    });

    group.finish();
}

fn benchmark_roundtrip(c: &mut Criterion) {
    let doc = Value::Sparse(banded(100, SparseFormat::Csr));

    c.bench_function("yaml_roundtrip_sparse", |b| {
        b.iter(|| {
            let text = yaml::dumps(black_box(&doc), &unsafe_encode()).unwrap();
            yaml::loads(&text, &unsafe_decode()).unwrap()
        })
    });
}

criterion_group!(
    benches,
    benchmark_dense_arrays,
    benchmark_sparse_formats,
    benchmark_format_change,
    benchmark_primitive_mode,
    benchmark_typed_frame,
    benchmark_roundtrip
);
criterion_main!(benches);
