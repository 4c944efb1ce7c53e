//! Property-based round-trip tests for the tagged array and sparse forms.

use ndserial::{
    binary, json, yaml, DType, DecodeOptions, EncodeOptions, NdArray, SparseFormat, SparseMatrix,
    Value,
};
use proptest::prelude::*;

fn dims() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0usize..4, 1..4)
}

/// Small enough to be exact after a cast to `float32`.
fn int_array() -> impl Strategy<Value = NdArray> {
    dims().prop_flat_map(|shape| {
        let len: usize = shape.iter().product();
        prop::collection::vec(-100_000i32..100_000, len)
            .prop_map(move |values| NdArray::from_shape_vec(&shape, values).unwrap())
    })
}

/// Quarter steps are exact in every float width.
fn float_array() -> impl Strategy<Value = NdArray> {
    dims().prop_flat_map(|shape| {
        let len: usize = shape.iter().product();
        prop::collection::vec(any::<i16>().prop_map(|q| f32::from(q) / 4.0), len)
            .prop_map(move |values| NdArray::from_shape_vec(&shape, values).unwrap())
    })
}

fn sparse_format() -> impl Strategy<Value = SparseFormat> {
    prop::sample::select(SparseFormat::ALL.to_vec())
}

fn sparse_matrix() -> impl Strategy<Value = SparseMatrix> {
    (1usize..6, 1usize..6, sparse_format()).prop_flat_map(|(nrows, ncols, format)| {
        prop::collection::vec((0..nrows, 0..ncols, -50i64..50), 0..12).prop_map(move |entries| {
            let row = entries.iter().map(|e| e.0).collect();
            let col = entries.iter().map(|e| e.1).collect();
            let data = NdArray::from_vec(entries.iter().map(|e| e.2).collect::<Vec<_>>());
            SparseMatrix::from_triplets((nrows, ncols), row, col, data, format).unwrap()
        })
    })
}

fn unsafe_encode() -> EncodeOptions {
    EncodeOptions::new().with_safe_mode(false)
}

fn unsafe_decode() -> DecodeOptions {
    DecodeOptions::new().with_safe_mode(false)
}

proptest! {
    #[test]
    fn prop_int_array_json(arr in int_array()) {
        let doc = Value::NdArray(arr);
        let text = json::dumps(&doc, &EncodeOptions::new()).unwrap();
        prop_assert_eq!(json::loads(&text, &DecodeOptions::new()).unwrap(), doc);
    }

    #[test]
    fn prop_float32_array_yaml(arr in float_array()) {
        let doc = Value::NdArray(arr);
        let text = yaml::dumps(&doc, &unsafe_encode()).unwrap();
        prop_assert_eq!(yaml::loads(&text, &unsafe_decode()).unwrap(), doc);
    }

    #[test]
    fn prop_cast_then_roundtrip(arr in int_array(), dtype in prop::sample::select(DType::ALL.to_vec())) {
        let doc = Value::NdArray(arr.cast(dtype));
        let text = json::dumps(&doc, &EncodeOptions::new()).unwrap();
        prop_assert_eq!(json::loads(&text, &DecodeOptions::new()).unwrap(), doc);
    }

    #[test]
    fn prop_sparse_json(m in sparse_matrix()) {
        let doc = Value::Sparse(m);
        let text = json::dumps(&doc, &EncodeOptions::new()).unwrap();
        prop_assert_eq!(json::loads(&text, &DecodeOptions::new()).unwrap(), doc);
    }

    #[test]
    fn prop_sparse_json_with_element_override(
        m in sparse_matrix(),
        dtype in prop::sample::select(DType::ALL.to_vec()),
    ) {
        let text = json::dumps(&Value::Sparse(m.clone()), &EncodeOptions::new()).unwrap();
        let back = json::loads(&text, &DecodeOptions::new().with_element_type(dtype)).unwrap();
        let out = back.as_sparse().unwrap();
        let expected = m.astype(dtype);
        prop_assert_eq!(out.dtype(), dtype);
        prop_assert_eq!(out.format(), m.format());
        prop_assert_eq!(out.row(), expected.row());
        prop_assert_eq!(out.col(), expected.col());
        prop_assert_eq!(out.to_dense(), expected.to_dense());
    }

    #[test]
    fn prop_wide_sparse_indices_survive_narrow_override(col in 256usize..1000, value in 1i64..100) {
        let m = SparseMatrix::from_triplets(
            (1000, 1000),
            vec![col - 1],
            vec![col],
            NdArray::from_vec(vec![value]),
            SparseFormat::Coo,
        )
        .unwrap();
        let text = json::dumps(&Value::Sparse(m), &EncodeOptions::new()).unwrap();
        for dtype in [DType::UInt8, DType::Int8, DType::Bool] {
            let back = json::loads(&text, &DecodeOptions::new().with_element_type(dtype)).unwrap();
            let out = back.as_sparse().unwrap();
            prop_assert_eq!(out.row(), &[col - 1][..]);
            prop_assert_eq!(out.col(), &[col][..]);
        }
    }

    #[test]
    fn prop_sparse_yaml(m in sparse_matrix()) {
        let doc = Value::Sparse(m);
        let text = yaml::dumps(&doc, &unsafe_encode()).unwrap();
        prop_assert_eq!(yaml::loads(&text, &unsafe_decode()).unwrap(), doc);
    }

    #[test]
    fn prop_sparse_binary(m in sparse_matrix()) {
        let doc = Value::Sparse(m);
        let bytes = binary::dumps(&doc, &EncodeOptions::new()).unwrap();
        prop_assert_eq!(binary::loads(&bytes, &DecodeOptions::new()).unwrap(), doc);
    }

    #[test]
    fn prop_layout_change_keeps_dense_form(m in sparse_matrix(), target in sparse_format()) {
        prop_assert_eq!(m.asformat(target).to_dense(), m.to_dense());
    }

    #[test]
    fn prop_compressed_views_rebuild(m in sparse_matrix()) {
        let csr = SparseMatrix::from_csr(m.shape(), &m.to_csr()).unwrap();
        let csc = SparseMatrix::from_csc(m.shape(), &m.to_csc()).unwrap();
        let dia = SparseMatrix::from_dia(m.shape(), &m.to_dia()).unwrap();
        prop_assert_eq!(csr.to_dense(), m.to_dense());
        prop_assert_eq!(csc.to_dense(), m.to_dense());
        prop_assert_eq!(dia.to_dense(), m.to_dense());
    }

    #[test]
    fn prop_primitive_mode_yields_nested_lists(arr in int_array()) {
        let text = json::dumps(&Value::NdArray(arr.clone()), &EncodeOptions::new().primitive()).unwrap();
        prop_assert_eq!(json::loads(&text, &DecodeOptions::new()).unwrap(), arr.to_nested());
    }
}
