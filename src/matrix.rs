//! Dense two-dimensional `f64` storage in either memory order.
//!
//! Numeric hosts disagree on memory order, so a [`Matrix`] carries its
//! [`Layout`] explicitly and every element access goes through
//! [`Layout::index`]. Column-major is the default because the column is the
//! unit the transform works on: in that order each column is one contiguous
//! slice.

use crate::error::{Result, WhtError};

/// Memory layout for matrices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Layout {
    /// Fortran-style: elements in a column are contiguous.
    #[default]
    ColumnMajor,
    /// C-style: elements in a row are contiguous.
    RowMajor,
}

impl Layout {
    /// Leading dimension stride for a `rows x cols` matrix.
    #[inline(always)]
    pub fn leading_dim(self, rows: usize, cols: usize) -> usize {
        match self {
            Layout::ColumnMajor => rows,
            Layout::RowMajor => cols,
        }
    }

    /// Linear index of element `(row, col)` given the leading dimension.
    #[inline(always)]
    pub fn index(self, row: usize, col: usize, ld: usize) -> usize {
        match self {
            Layout::ColumnMajor => col * ld + row,
            Layout::RowMajor => row * ld + col,
        }
    }
}

/// A `rows x cols` matrix of `f64` values.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
    layout: Layout,
}

impl Matrix {
    /// Wraps `data` as a `rows x cols` matrix stored in `layout`.
    ///
    /// Fails with [`WhtError::InvalidDimension`] when `data.len()` is not
    /// `rows * cols`.
    pub fn new(rows: usize, cols: usize, layout: Layout, data: Vec<f64>) -> Result<Self> {
        let expected = rows.checked_mul(cols).ok_or(WhtError::InvalidDimension {
            expected: usize::MAX,
            got: data.len(),
        })?;
        if data.len() != expected {
            return Err(WhtError::InvalidDimension {
                expected,
                got: data.len(),
            });
        }

        Ok(Self {
            data,
            rows,
            cols,
            layout,
        })
    }

    /// Column-major matrix from a flat buffer.
    pub fn from_column_major(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        Self::new(rows, cols, Layout::ColumnMajor, data)
    }

    /// Row-major matrix from a flat buffer.
    pub fn from_row_major(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        Self::new(rows, cols, Layout::RowMajor, data)
    }

    /// Builds a column-major matrix whose columns are `columns`.
    ///
    /// All columns must have the same length.
    pub fn from_columns<C: AsRef<[f64]>>(columns: &[C]) -> Result<Self> {
        let rows = columns.first().map_or(0, |c| c.as_ref().len());
        let mut data = Vec::with_capacity(rows * columns.len());
        for column in columns {
            let column = column.as_ref();
            if column.len() != rows {
                return Err(WhtError::InvalidDimension {
                    expected: rows,
                    got: column.len(),
                });
            }
            data.extend_from_slice(column);
        }
        Self::from_column_major(rows, columns.len(), data)
    }

    /// `n x 1` matrix.
    pub fn column_vector(values: Vec<f64>) -> Self {
        let rows = values.len();
        Self {
            data: values,
            rows,
            cols: 1,
            layout: Layout::ColumnMajor,
        }
    }

    /// `1 x n` matrix.
    pub fn row_vector(values: Vec<f64>) -> Self {
        let cols = values.len();
        Self {
            data: values,
            rows: 1,
            cols,
            layout: Layout::RowMajor,
        }
    }

    /// All-zero matrix.
    pub fn zeros(rows: usize, cols: usize, layout: Layout) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
            layout,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Leading dimension of the underlying storage.
    #[inline]
    pub fn leading_dim(&self) -> usize {
        self.layout.leading_dim(self.rows, self.cols)
    }

    /// Raw storage in this matrix's layout.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Element at `(row, col)`, or `None` when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.data[self.layout.index(row, col, self.leading_dim())])
    }

    /// Copies column `col` into `dst`, which must hold exactly `rows` values.
    pub fn read_column(&self, col: usize, dst: &mut [f64]) -> Result<()> {
        if dst.len() != self.rows {
            return Err(WhtError::InvalidDimension {
                expected: self.rows,
                got: dst.len(),
            });
        }
        if col >= self.cols {
            return Err(WhtError::InvalidDimension {
                expected: self.cols,
                got: col + 1,
            });
        }

        match self.layout {
            Layout::ColumnMajor => {
                let start = col * self.rows;
                dst.copy_from_slice(&self.data[start..start + self.rows]);
            }
            Layout::RowMajor => {
                let ld = self.cols;
                for (row, value) in dst.iter_mut().enumerate() {
                    *value = self.data[row * ld + col];
                }
            }
        }
        Ok(())
    }

    /// Overwrites column `col` with `src`, which must hold exactly `rows` values.
    pub fn write_column(&mut self, col: usize, src: &[f64]) -> Result<()> {
        if src.len() != self.rows {
            return Err(WhtError::InvalidDimension {
                expected: self.rows,
                got: src.len(),
            });
        }
        if col >= self.cols {
            return Err(WhtError::InvalidDimension {
                expected: self.cols,
                got: col + 1,
            });
        }

        match self.layout {
            Layout::ColumnMajor => {
                let start = col * self.rows;
                self.data[start..start + self.rows].copy_from_slice(src);
            }
            Layout::RowMajor => {
                let ld = self.cols;
                for (row, &value) in src.iter().enumerate() {
                    self.data[row * ld + col] = value;
                }
            }
        }
        Ok(())
    }

    /// Returns column `col` as an owned vector.
    pub fn column(&self, col: usize) -> Result<Vec<f64>> {
        let mut out = vec![0.0; self.rows];
        self.read_column(col, &mut out)?;
        Ok(out)
    }

    /// Re-lays the same logical matrix out in `layout`.
    pub fn into_layout(self, layout: Layout) -> Self {
        if self.layout == layout {
            return self;
        }

        let src_ld = self.leading_dim();
        let dst_ld = layout.leading_dim(self.rows, self.cols);
        let mut data = vec![0.0; self.data.len()];
        for col in 0..self.cols {
            for row in 0..self.rows {
                data[layout.index(row, col, dst_ld)] = self.data[self.layout.index(row, col, src_ld)];
            }
        }

        Self {
            data,
            rows: self.rows,
            cols: self.cols,
            layout,
        }
    }
}
