//! Sparse matrices.
//!
//! A [`SparseMatrix`] stores its entries as coordinate triplets
//! (`row`, `col`, `data`) together with the storage layout it was declared in.
//! The triplets are kept in a canonical order for that layout, so two matrices
//! built from the same entries compare equal regardless of how they were
//! assembled:
//!
//! | layout              | canonical triplets                                  |
//! |---------------------|-----------------------------------------------------|
//! | `coo`               | insertion order, duplicates kept                    |
//! | `csr`, `lil`, `dok` | duplicates summed, sorted by (row, col)             |
//! | `csc`               | duplicates summed, sorted by (col, row)             |
//! | `dia`               | duplicates summed, zeros dropped, sorted by (offset, col) |
//!
//! Compressed and diagonal views are available through [`SparseMatrix::to_csr`],
//! [`SparseMatrix::to_csc`] and [`SparseMatrix::to_dia`].
//!
//! ```rust
//! use ndserial::{DType, SparseFormat, SparseMatrix};
//!
//! let eye = SparseMatrix::identity(3, DType::Float64, SparseFormat::Dia);
//! assert_eq!(eye.nnz(), 3);
//! assert_eq!(eye.row(), &[0, 1, 2]);
//! assert_eq!(eye.col(), &[0, 1, 2]);
//! ```

use crate::array::{dispatch, Element};
use crate::{DType, Error, NdArray, Result};
use ndarray::ArrayD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Storage layout of a sparse matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SparseFormat {
    Coo,
    Csr,
    Csc,
    Dia,
    Lil,
    Dok,
}

impl SparseFormat {
    pub const ALL: [SparseFormat; 6] = [
        SparseFormat::Coo,
        SparseFormat::Csr,
        SparseFormat::Csc,
        SparseFormat::Dia,
        SparseFormat::Lil,
        SparseFormat::Dok,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SparseFormat::Coo => "coo",
            SparseFormat::Csr => "csr",
            SparseFormat::Csc => "csc",
            SparseFormat::Dia => "dia",
            SparseFormat::Lil => "lil",
            SparseFormat::Dok => "dok",
        }
    }

    /// Sort key of an entry in this layout, `None` for insertion order.
    fn key(&self, row: usize, col: usize) -> Option<(i64, usize)> {
        match self {
            SparseFormat::Coo => None,
            SparseFormat::Csr | SparseFormat::Lil | SparseFormat::Dok => Some((row as i64, col)),
            SparseFormat::Csc => Some((col as i64, row)),
            SparseFormat::Dia => Some((col as i64 - row as i64, col)),
        }
    }
}

impl fmt::Display for SparseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SparseFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SparseFormat::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| Error::malformed(format!("unsupported sparse format `{}`", s)))
    }
}

/// A two-dimensional sparse matrix in coordinate form.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseMatrix {
    format: SparseFormat,
    shape: (usize, usize),
    row: Vec<usize>,
    col: Vec<usize>,
    data: NdArray,
}

/// Compressed row or column storage: `indptr` has one entry per major index
/// plus one, `indices` holds the minor index of each stored value.
#[derive(Clone, Debug, PartialEq)]
pub struct Compressed {
    pub indptr: Vec<usize>,
    pub indices: Vec<usize>,
    pub data: NdArray,
}

/// Diagonal storage: `data[k, j]` holds `A[j - offsets[k], j]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagonals {
    pub offsets: Vec<i64>,
    pub data: NdArray,
}

impl SparseMatrix {
    /// Builds a matrix from coordinate triplets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if `data` is not one-dimensional, if `row`,
    /// `col` and `data` differ in length, or if an index falls outside `shape`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndserial::{NdArray, SparseFormat, SparseMatrix};
    ///
    /// let m = SparseMatrix::from_triplets(
    ///     (2, 3),
    ///     vec![1, 0, 1],
    ///     vec![2, 1, 2],
    ///     NdArray::from_vec(vec![1.0f64, 2.0, 3.0]),
    ///     SparseFormat::Csr,
    /// )
    /// .unwrap();
    /// // Duplicates at (1, 2) are summed and entries sorted by row.
    /// assert_eq!(m.row(), &[0, 1]);
    /// assert_eq!(m.col(), &[1, 2]);
    /// ```
    pub fn from_triplets(
        shape: (usize, usize),
        row: Vec<usize>,
        col: Vec<usize>,
        data: NdArray,
        format: SparseFormat,
    ) -> Result<Self> {
        if data.ndim() != 1 {
            return Err(Error::malformed(format!(
                "triplet values must be one-dimensional, got shape {:?}",
                data.shape()
            )));
        }
        if row.len() != col.len() || row.len() != data.len() {
            return Err(Error::malformed(format!(
                "triplet lengths differ: {} rows, {} cols, {} values",
                row.len(),
                col.len(),
                data.len()
            )));
        }
        if let Some(r) = row.iter().find(|&&r| r >= shape.0) {
            return Err(Error::malformed(format!(
                "row index {} out of bounds for {} rows",
                r, shape.0
            )));
        }
        if let Some(c) = col.iter().find(|&&c| c >= shape.1) {
            return Err(Error::malformed(format!(
                "column index {} out of bounds for {} columns",
                c, shape.1
            )));
        }
        Ok(Self::assemble(format, shape, row, col, data))
    }

    /// Collects the non-zero entries of a rank-2 array.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if `dense` is not two-dimensional.
    pub fn from_dense(dense: &NdArray, format: SparseFormat) -> Result<Self> {
        let (nrows, ncols) = match dense.shape() {
            [r, c] => (*r, *c),
            other => {
                return Err(Error::malformed(format!(
                    "sparse matrices are two-dimensional, got shape {:?}",
                    other
                )))
            }
        };
        let (row, col, data) = dispatch!(dense, a => {
            let mut row = Vec::new();
            let mut col = Vec::new();
            let mut values = Vec::new();
            for (flat, v) in a.iter().enumerate() {
                if !v.is_zero() {
                    row.push(flat / ncols);
                    col.push(flat % ncols);
                    values.push(*v);
                }
            }
            (row, col, NdArray::from_vec(values))
        });
        Ok(Self::assemble(format, (nrows, ncols), row, col, data))
    }

    /// The `n`-by-`n` identity matrix.
    #[must_use]
    pub fn identity(n: usize, dtype: DType, format: SparseFormat) -> Self {
        let diag: Vec<usize> = (0..n).collect();
        let ones = NdArray::from_vec(vec![1i64; n]).cast(dtype);
        Self::assemble(format, (n, n), diag.clone(), diag, ones)
    }

    /// Builds a `csr` matrix from compressed row storage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if `indptr` is inconsistent with `shape`
    /// or with the number of stored values.
    pub fn from_csr(shape: (usize, usize), storage: &Compressed) -> Result<Self> {
        let (major, minor) = expand_compressed(shape.0, storage)?;
        Self::from_triplets(shape, major, minor, storage.data.clone(), SparseFormat::Csr)
    }

    /// Builds a `csc` matrix from compressed column storage.
    ///
    /// # Errors
    ///
    /// Same conditions as [`SparseMatrix::from_csr`].
    pub fn from_csc(shape: (usize, usize), storage: &Compressed) -> Result<Self> {
        let (major, minor) = expand_compressed(shape.1, storage)?;
        Self::from_triplets(shape, minor, major, storage.data.clone(), SparseFormat::Csc)
    }

    /// Builds a `dia` matrix from diagonal storage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if `data` is not `offsets.len()` by `shape.1`.
    pub fn from_dia(shape: (usize, usize), storage: &Diagonals) -> Result<Self> {
        let (nrows, ncols) = shape;
        if storage.data.shape() != [storage.offsets.len(), ncols] {
            return Err(Error::malformed(format!(
                "diagonal data has shape {:?}, expected [{}, {}]",
                storage.data.shape(),
                storage.offsets.len(),
                ncols
            )));
        }
        let (row, col, data) = dispatch!(&storage.data, a => {
            let flat: Vec<_> = a.iter().copied().collect();
            let mut row = Vec::new();
            let mut col = Vec::new();
            let mut values = Vec::new();
            for (k, &offset) in storage.offsets.iter().enumerate() {
                for j in 0..ncols {
                    let i = j as i64 - offset;
                    if i < 0 || i >= nrows as i64 {
                        continue;
                    }
                    let v = flat[k * ncols + j];
                    if !v.is_zero() {
                        row.push(i as usize);
                        col.push(j);
                        values.push(v);
                    }
                }
            }
            (row, col, NdArray::from_vec(values))
        });
        Ok(Self::assemble(SparseFormat::Dia, shape, row, col, data))
    }

    fn assemble(
        format: SparseFormat,
        shape: (usize, usize),
        row: Vec<usize>,
        col: Vec<usize>,
        data: NdArray,
    ) -> Self {
        let (row, col, data) = dispatch!(&data, a => canonicalize(format, row, col, a));
        SparseMatrix {
            format,
            shape,
            row,
            col,
            data,
        }
    }

    #[must_use]
    pub fn format(&self) -> SparseFormat {
        self.format
    }

    /// `(rows, columns)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.row.len()
    }

    #[must_use]
    pub fn row(&self) -> &[usize] {
        &self.row
    }

    #[must_use]
    pub fn col(&self) -> &[usize] {
        &self.col
    }

    /// Stored values, one-dimensional, aligned with [`row`](Self::row) and [`col`](Self::col).
    #[must_use]
    pub fn data(&self) -> &NdArray {
        &self.data
    }

    /// Re-stores the same entries in another layout.
    #[must_use]
    pub fn asformat(&self, format: SparseFormat) -> SparseMatrix {
        if format == self.format {
            return self.clone();
        }
        Self::assemble(
            format,
            self.shape,
            self.row.clone(),
            self.col.clone(),
            self.data.clone(),
        )
    }

    /// Casts the stored values to another element type.
    #[must_use]
    pub fn astype(&self, dtype: DType) -> SparseMatrix {
        if dtype == self.dtype() {
            return self.clone();
        }
        Self::assemble(
            self.format,
            self.shape,
            self.row.clone(),
            self.col.clone(),
            self.data.cast(dtype),
        )
    }

    /// Densifies into a rank-2 array; duplicate coordinates are summed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndserial::{value, DType, SparseFormat, SparseMatrix};
    ///
    /// let eye = SparseMatrix::identity(2, DType::Int32, SparseFormat::Coo);
    /// assert_eq!(eye.to_dense().to_nested(), value!([[1, 0], [0, 1]]));
    /// ```
    #[must_use]
    pub fn to_dense(&self) -> NdArray {
        let (nrows, ncols) = self.shape;
        dispatch!(&self.data, a => {
            let mut cells = vec![Default::default(); nrows * ncols];
            for ((&i, &j), &v) in self.row.iter().zip(&self.col).zip(a.iter()) {
                let cell = &mut cells[i * ncols + j];
                *cell = Element::accumulate(*cell, v);
            }
            NdArray::from(
                ArrayD::from_shape_vec(ndarray::IxDyn(&[nrows, ncols]), cells)
                    .unwrap_or_else(|_| ArrayD::default(ndarray::IxDyn(&[nrows, ncols]))),
            )
        })
    }

    /// Compressed sparse row storage of this matrix.
    #[must_use]
    pub fn to_csr(&self) -> Compressed {
        let csr = self.asformat(SparseFormat::Csr);
        compress(self.shape.0, &csr.row, &csr.col, csr.data)
    }

    /// Compressed sparse column storage of this matrix.
    #[must_use]
    pub fn to_csc(&self) -> Compressed {
        let csc = self.asformat(SparseFormat::Csc);
        compress(self.shape.1, &csc.col, &csc.row, csc.data)
    }

    /// Diagonal storage of this matrix, one row of `data` per occupied diagonal.
    #[must_use]
    pub fn to_dia(&self) -> Diagonals {
        let dia = self.asformat(SparseFormat::Dia);
        let ncols = self.shape.1;
        let mut offsets: Vec<i64> = dia
            .row
            .iter()
            .zip(&dia.col)
            .map(|(&i, &j)| j as i64 - i as i64)
            .collect();
        offsets.dedup();
        let data = dispatch!(&dia.data, a => {
            let mut cells = vec![Default::default(); offsets.len() * ncols];
            for ((&i, &j), &v) in dia.row.iter().zip(&dia.col).zip(a.iter()) {
                let offset = j as i64 - i as i64;
                if let Ok(k) = offsets.binary_search(&offset) {
                    cells[k * ncols + j] = v;
                }
            }
            NdArray::from(
                ArrayD::from_shape_vec(ndarray::IxDyn(&[offsets.len(), ncols]), cells)
                    .unwrap_or_else(|_| ArrayD::default(ndarray::IxDyn(&[offsets.len(), ncols]))),
            )
        });
        Diagonals { offsets, data }
    }
}

fn canonicalize<T: Element>(
    format: SparseFormat,
    row: Vec<usize>,
    col: Vec<usize>,
    values: &ArrayD<T>,
) -> (Vec<usize>, Vec<usize>, NdArray) {
    let values: Vec<T> = values.iter().copied().collect();
    if format == SparseFormat::Coo {
        return (row, col, NdArray::from_vec(values));
    }
    let mut merged: BTreeMap<(i64, usize), (usize, usize, T)> = BTreeMap::new();
    for ((r, c), v) in row.iter().zip(&col).zip(&values) {
        let Some(key) = format.key(*r, *c) else {
            continue;
        };
        merged
            .entry(key)
            .and_modify(|entry| entry.2 = entry.2.accumulate(*v))
            .or_insert((*r, *c, *v));
    }
    let drop_zeros = format == SparseFormat::Dia;
    let mut out_row = Vec::with_capacity(merged.len());
    let mut out_col = Vec::with_capacity(merged.len());
    let mut out_values = Vec::with_capacity(merged.len());
    for (r, c, v) in merged.into_values() {
        if drop_zeros && v.is_zero() {
            continue;
        }
        out_row.push(r);
        out_col.push(c);
        out_values.push(v);
    }
    (out_row, out_col, NdArray::from_vec(out_values))
}

fn compress(n_major: usize, major: &[usize], minor: &[usize], data: NdArray) -> Compressed {
    let mut indptr = vec![0usize; n_major + 1];
    for &m in major {
        indptr[m + 1] += 1;
    }
    for i in 0..n_major {
        indptr[i + 1] += indptr[i];
    }
    Compressed {
        indptr,
        indices: minor.to_vec(),
        data,
    }
}

fn expand_compressed(n_major: usize, storage: &Compressed) -> Result<(Vec<usize>, Vec<usize>)> {
    let indptr = &storage.indptr;
    if indptr.len() != n_major + 1 {
        return Err(Error::malformed(format!(
            "indptr has {} entries, expected {}",
            indptr.len(),
            n_major + 1
        )));
    }
    if indptr.windows(2).any(|w| w[0] > w[1]) || indptr.last() != Some(&storage.indices.len()) {
        return Err(Error::malformed("indptr is not a valid cumulative count"));
    }
    let mut major = Vec::with_capacity(storage.indices.len());
    for (m, w) in indptr.windows(2).enumerate() {
        major.extend(std::iter::repeat(m).take(w[1] - w[0]));
    }
    Ok((major, storage.indices.clone()))
}

impl Serialize for SparseMatrix {
    /// Serializes as the tagged mapping the sparse codec writes.
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        crate::codec::sparse::tag(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SparseMatrix {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match crate::Value::deserialize(deserializer)? {
            crate::Value::Sparse(m) => Ok(m),
            crate::Value::Object(map) => {
                crate::codec::sparse::untag(&map, &crate::DecodeOptions::default())
                    .map_err(serde::de::Error::custom)?
                    .into_option()
                    .ok_or_else(|| serde::de::Error::custom("expected a tagged sparse mapping"))
            }
            other => Err(serde::de::Error::custom(format!(
                "expected a tagged sparse mapping, found {}",
                other.kind()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value;

    fn sample(format: SparseFormat) -> SparseMatrix {
        SparseMatrix::from_triplets(
            (3, 4),
            vec![2, 0, 1, 0],
            vec![1, 3, 1, 3],
            NdArray::from_vec(vec![5i32, 1, 7, 2]),
            format,
        )
        .unwrap()
    }

    #[test]
    fn test_two_dimensional_values_are_rejected() {
        let data = NdArray::from_shape_vec(&[1, 2], vec![1i32, 2]).unwrap();
        let err = SparseMatrix::from_triplets((2, 2), vec![0, 1], vec![0, 1], data, SparseFormat::Coo)
            .unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn test_coo_keeps_duplicates_in_order() {
        let m = sample(SparseFormat::Coo);
        assert_eq!(m.nnz(), 4);
        assert_eq!(m.row(), &[2, 0, 1, 0]);
    }

    #[test]
    fn test_csr_sums_and_sorts() {
        let m = sample(SparseFormat::Csr);
        assert_eq!(m.row(), &[0, 1, 2]);
        assert_eq!(m.col(), &[3, 1, 1]);
        assert_eq!(m.data(), &NdArray::from_vec(vec![3i32, 7, 5]));
    }

    #[test]
    fn test_csc_sorts_by_column() {
        let m = sample(SparseFormat::Csc);
        assert_eq!(m.col(), &[1, 1, 3]);
        assert_eq!(m.row(), &[1, 2, 0]);
    }

    #[test]
    fn test_every_layout_densifies_the_same() {
        let dense = sample(SparseFormat::Coo).to_dense();
        for format in SparseFormat::ALL {
            assert_eq!(sample(format).to_dense(), dense, "{}", format);
        }
        assert_eq!(
            dense.to_nested(),
            value!([[0, 0, 0, 3], [0, 7, 0, 0], [0, 5, 0, 0]])
        );
    }

    #[test]
    fn test_mismatched_triplets() {
        let err = SparseMatrix::from_triplets(
            (2, 2),
            vec![0, 1],
            vec![0],
            NdArray::from_vec(vec![1.0f64, 2.0]),
            SparseFormat::Coo,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn test_out_of_bounds_index() {
        let err = SparseMatrix::from_triplets(
            (2, 2),
            vec![0, 2],
            vec![0, 0],
            NdArray::from_vec(vec![1.0f64, 2.0]),
            SparseFormat::Coo,
        )
        .unwrap_err();
        assert!(err.to_string().contains("out of bounds"));
    }

    #[test]
    fn test_csr_roundtrip() {
        let m = sample(SparseFormat::Csr);
        let storage = m.to_csr();
        assert_eq!(storage.indptr, vec![0, 1, 2, 3]);
        assert_eq!(SparseMatrix::from_csr((3, 4), &storage).unwrap(), m);
    }

    #[test]
    fn test_csc_roundtrip() {
        let m = sample(SparseFormat::Csc);
        let storage = m.to_csc();
        assert_eq!(storage.indptr, vec![0, 0, 2, 2, 3]);
        assert_eq!(SparseMatrix::from_csc((3, 4), &storage).unwrap(), m);
    }

    #[test]
    fn test_dia_roundtrip() {
        let m = sample(SparseFormat::Dia);
        let storage = m.to_dia();
        assert_eq!(storage.offsets, vec![-1, 0, 3]);
        assert_eq!(storage.data.shape(), &[3, 4]);
        assert_eq!(SparseMatrix::from_dia((3, 4), &storage).unwrap(), m);
    }

    #[test]
    fn test_identity_dia() {
        let eye = SparseMatrix::identity(3, DType::Float64, SparseFormat::Dia);
        let storage = eye.to_dia();
        assert_eq!(storage.offsets, vec![0]);
        assert_eq!(storage.data.to_nested(), value!([[1.0, 1.0, 1.0]]));
    }

    #[test]
    fn test_from_dense_skips_zeros() {
        let dense = NdArray::from_shape_vec(&[2, 2], vec![0.0f32, 1.5, 0.0, 0.0]).unwrap();
        let m = SparseMatrix::from_dense(&dense, SparseFormat::Lil).unwrap();
        assert_eq!(m.nnz(), 1);
        assert_eq!(m.to_dense(), dense);
        assert!(SparseMatrix::from_dense(&NdArray::from_vec(vec![1.0f64]), SparseFormat::Coo).is_err());
    }

    #[test]
    fn test_astype() {
        let m = sample(SparseFormat::Csr).astype(DType::Float32);
        assert_eq!(m.dtype(), DType::Float32);
        assert_eq!(m.format(), SparseFormat::Csr);
    }

    #[test]
    fn test_unknown_format_label() {
        assert!("bsr".parse::<SparseFormat>().is_err());
        assert_eq!("dok".parse::<SparseFormat>().unwrap(), SparseFormat::Dok);
    }
}
