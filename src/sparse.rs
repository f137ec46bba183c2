//! Sparse matrix utilities.
//!
//! Helper functions for working with nalgebra-sparse matrices.

#[cfg(test)]
use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CscMatrix};

/// Create a CSC matrix from triplets (row, col, value).
///
/// Duplicates are summed together.
pub fn csc_from_triplets(
    nrows: usize,
    ncols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    vals: Vec<f64>,
) -> CscMatrix<f64> {
    if rows.is_empty() {
        return CscMatrix::zeros(nrows, ncols);
    }

    let mut coo = CooMatrix::new(nrows, ncols);
    for ((row, col), val) in rows.into_iter().zip(cols).zip(vals) {
        if row < nrows && col < ncols {
            coo.push(row, col, val);
        }
    }

    CscMatrix::from(&coo)
}

/// Convert CSC to dense matrix.
#[cfg(test)]
pub(crate) fn csc_to_dense(sparse: &CscMatrix<f64>) -> DMatrix<f64> {
    let mut dense = DMatrix::zeros(sparse.nrows(), sparse.ncols());
    for (row, col, val) in sparse.triplet_iter() {
        dense[(row, col)] += *val;
    }
    dense
}

/// Check that no entry lies below the diagonal.
pub fn is_upper_triangular(m: &CscMatrix<f64>) -> bool {
    m.triplet_iter().all(|(row, col, _)| row <= col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csc_from_triplets_sums_duplicates() {
        let m = csc_from_triplets(2, 2, vec![0, 0, 1], vec![1, 1, 1], vec![1.0, 2.0, 4.0]);
        let dense = csc_to_dense(&m);
        assert_eq!(dense[(0, 1)], 3.0);
        assert_eq!(dense[(1, 1)], 4.0);
        assert_eq!(dense[(1, 0)], 0.0);
        assert!(is_upper_triangular(&m));
    }

    #[test]
    fn test_empty_triplets() {
        let m = csc_from_triplets(3, 2, vec![], vec![], vec![]);
        assert_eq!(m.nrows(), 3);
        assert_eq!(m.ncols(), 2);
        assert_eq!(m.nnz(), 0);
    }

    #[test]
    fn test_lower_entry_detected() {
        let m = csc_from_triplets(2, 2, vec![1], vec![0], vec![1.0]);
        assert!(!is_upper_triangular(&m));
    }
}
