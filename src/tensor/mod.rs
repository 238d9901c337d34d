//! Row-major tensor views for raw network output.
//!
//! `TensorView` is a borrowed 2D view into a 1D buffer with an explicit
//! stride, one row per candidate. The stride counts elements between the
//! starts of consecutive rows, so a stride larger than the column count
//! represents padded rows (as some inference runtimes emit). A tensor may have
//! zero rows, since a network with built-in filtering can return no
//! candidates, but it must have at least one column.

use crate::util::{ArLabelError, ArLabelResult};

/// Borrowed 2D tensor view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct TensorView<'a, T> {
    data: &'a [T],
    rows: usize,
    cols: usize,
    stride: usize,
}

impl<'a, T> TensorView<'a, T> {
    /// Creates a contiguous view with `stride == cols`.
    pub fn from_slice(data: &'a [T], rows: usize, cols: usize) -> ArLabelResult<Self> {
        Self::new(data, rows, cols, cols)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [T], rows: usize, cols: usize, stride: usize) -> ArLabelResult<Self> {
        let needed = required_len(rows, cols, stride)?;
        if data.len() < needed {
            return Err(ArLabelError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            rows,
            cols,
            stride,
        })
    }

    /// Returns the number of rows (candidates).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns per row.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the element at `(row, col)` if it is within bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<&'a T> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let idx = row.checked_mul(self.stride)?.checked_add(col)?;
        self.data.get(idx)
    }

    /// Returns a contiguous slice for `row` with length `cols`.
    pub fn row(&self, row: usize) -> Option<&'a [T]> {
        if row >= self.rows {
            return None;
        }
        let start = row.checked_mul(self.stride)?;
        let end = start.checked_add(self.cols)?;
        self.data.get(start..end)
    }

    /// Iterates over all rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &'a [T]> + '_ {
        (0..self.rows).filter_map(move |row| self.row(row))
    }
}

/// Owned contiguous tensor.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedTensor {
    data: Vec<f32>,
    rows: usize,
    cols: usize,
}

impl OwnedTensor {
    /// Wraps a contiguous row-major buffer.
    pub fn new(data: Vec<f32>, rows: usize, cols: usize) -> ArLabelResult<Self> {
        let needed = required_len(rows, cols, cols)?;
        if data.len() != needed {
            return Err(ArLabelError::LengthMismatch {
                expected: needed,
                got: data.len(),
            });
        }
        Ok(Self { data, rows, cols })
    }

    /// Builds a tensor from nested rows, which must all have the same length.
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R], cols: usize) -> ArLabelResult<Self> {
        let mut data = Vec::with_capacity(rows.len().saturating_mul(cols));
        for row in rows {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(ArLabelError::InvalidDimensions {
                    rows: rows.len(),
                    cols: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Self::new(data, rows.len(), cols)
    }

    /// Returns a borrowed view of the tensor.
    pub fn view(&self) -> TensorView<'_, f32> {
        TensorView {
            data: &self.data,
            rows: self.rows,
            cols: self.cols,
            stride: self.cols,
        }
    }

    /// Returns the number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns the backing buffer.
    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

fn required_len(rows: usize, cols: usize, stride: usize) -> ArLabelResult<usize> {
    if cols == 0 {
        return Err(ArLabelError::InvalidDimensions { rows, cols });
    }
    if stride < cols {
        return Err(ArLabelError::InvalidStride { cols, stride });
    }
    if rows == 0 {
        return Ok(0);
    }
    (rows - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(cols))
        .ok_or(ArLabelError::InvalidDimensions { rows, cols })
}
