//! Dense matrices and Gauss-Jordan reduction.

use std::fmt;
use tracing::trace;

/// Entries with a magnitude below this are snapped to exactly zero after
/// every row operation.
pub const DEFAULT_TOLERANCE: f64 = 1e-12;

/// Zero out `value` if it is within `tolerance` of zero.
pub fn snap(value: f64, tolerance: f64) -> f64 {
    if value.abs() < tolerance { 0.0 } else { value }
}

/// Errors constructing a matrix.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatrixError {
    #[error("row {row} has {len} columns, expected {expected}")]
    RaggedRow {
        row: usize,
        len: usize,
        expected: usize,
    },
}

/// A row-major dense matrix of `f64`.
///
/// Row swaps performed during reduction are tracked so callers can map a
/// reduced row back to the row it started as.
#[derive(Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
    origin: Vec<usize>,
}

/// Pivot positions found by [`Matrix::reduce`], as `(row, column)` pairs in
/// increasing row order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reduction {
    pub pivots: Vec<(usize, usize)>,
}

impl Reduction {
    pub fn rank(&self) -> usize {
        self.pivots.len()
    }

    /// The pivot row for `col`, if that column holds a pivot.
    pub fn pivot_row(&self, col: usize) -> Option<usize> {
        self.pivots.iter().find(|(_, c)| *c == col).map(|(r, _)| *r)
    }
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
            origin: (0..rows).collect(),
        }
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, MatrixError> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut m = Matrix::zeros(rows.len(), cols);
        for (r, row) in rows.into_iter().enumerate() {
            if row.len() != cols {
                return Err(MatrixError::RaggedRow {
                    row: r,
                    len: row.len(),
                    expected: cols,
                });
            }
            m.data[r * cols..(r + 1) * cols].copy_from_slice(&row);
        }
        Ok(m)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// The index `row` had before any swaps.
    pub fn origin(&self, row: usize) -> usize {
        self.origin[row]
    }

    pub fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for c in 0..self.cols {
            self.data.swap(a * self.cols + c, b * self.cols + c);
        }
        self.origin.swap(a, b);
    }

    /// Reduce in place to reduced row-echelon form.
    ///
    /// When `augmented` is set the last column is the right-hand side and is
    /// never searched for a pivot. In each column the remaining row with the
    /// largest magnitude is chosen as pivot; columns whose best candidate is
    /// within `tolerance` of zero hold no pivot. After every row operation,
    /// entries within `tolerance` of zero are snapped to zero, and pivot and
    /// eliminated entries are set exactly.
    pub fn reduce(&mut self, augmented: bool, tolerance: f64) -> Reduction {
        let search_cols = if augmented {
            self.cols.saturating_sub(1)
        } else {
            self.cols
        };
        let mut reduction = Reduction::default();
        let mut lead = 0usize;

        for col in 0..search_cols {
            if lead >= self.rows {
                break;
            }

            let mut best = lead;
            let mut best_mag = self.get(lead, col).abs();
            for r in lead + 1..self.rows {
                let mag = self.get(r, col).abs();
                if mag > best_mag {
                    best = r;
                    best_mag = mag;
                }
            }
            if best_mag <= tolerance {
                trace!(target: "ratechain::matrix", col, "no pivot in column");
                continue;
            }

            self.swap_rows(lead, best);
            let pivot = self.get(lead, col);
            for c in 0..self.cols {
                let v = self.get(lead, c) / pivot;
                self.set(lead, c, snap(v, tolerance));
            }
            self.set(lead, col, 1.0);

            for r in 0..self.rows {
                if r == lead {
                    continue;
                }
                let factor = self.get(r, col);
                if factor == 0.0 {
                    continue;
                }
                for c in 0..self.cols {
                    let v = self.get(r, c) - factor * self.get(lead, c);
                    self.set(r, c, snap(v, tolerance));
                }
                self.set(r, col, 0.0);
            }

            reduction.pivots.push((lead, col));
            lead += 1;
        }

        reduction
    }

    /// Rows of an augmented, reduced matrix that read `0 = b` with `b != 0`.
    pub fn inconsistent_rows(&self, tolerance: f64) -> Vec<usize> {
        if self.cols == 0 {
            return Vec::new();
        }
        let last = self.cols - 1;
        (0..self.rows)
            .filter(|&r| {
                let row = self.row(r);
                row[..last].iter().all(|v| v.abs() <= tolerance) && row[last].abs() > tolerance
            })
            .collect()
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrix {}x{}", self.rows, self.cols)?;
        for r in 0..self.rows {
            writeln!(f, "  {:?}", self.row(r))?;
        }
        Ok(())
    }
}
