//! Writing numeric arrays and sparse matrices to JSON and back.
//!
//! Run with: cargo run --example arrays

use ndserial::{json, value, DType, DecodeOptions, EncodeOptions, NdArray, SparseFormat, SparseMatrix};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let weights = NdArray::from_shape_vec(&[2, 3], vec![0.25f32, 0.5, 0.75, 1.0, 1.25, 1.5])?;
    let adjacency = SparseMatrix::identity(4, DType::Int8, SparseFormat::Csr);

    let doc = value!({
        "layer": "dense_1",
        "weights": (weights),
        "adjacency": (adjacency)
    });

    // Tagged form keeps dtype, shape and sparse layout
    let text = json::dumps(&doc, &EncodeOptions::new().with_indent(2))?;
    println!("Tagged:\n{}\n", text);

    let back = json::loads(&text, &DecodeOptions::new())?;
    assert_eq!(doc, back);
    println!("✓ Round-trip successful\n");

    // Primitive form writes arrays as nested lists
    let plain = json::dumps(&doc, &EncodeOptions::new().primitive())?;
    println!("Primitive:\n{}", plain);

    Ok(())
}
