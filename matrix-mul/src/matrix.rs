//! Dense integer matrices and the row blocks they are split into.

use std::fmt;

use matrix_mpi_types::matrix::MatrixData;

use crate::Error;

/// A dense `rows × cols` matrix of `i64`, stored row-major.
///
/// The shape is fixed at construction; only element values can change.
#[derive(Clone, PartialEq, Eq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<i64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0; rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut matrix = Self::zeros(n, n);
        for i in 0..n {
            matrix.set(i, i, 1);
        }
        matrix
    }

    /// Builds a matrix from nested rows, rejecting rows of unequal length.
    pub fn from_rows(rows: Vec<Vec<i64>>) -> Result<Self, Error> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (row, values) in rows.iter().enumerate() {
            if values.len() != cols {
                return Err(Error::RaggedRows {
                    row,
                    len: values.len(),
                    expected: cols,
                });
            }
            data.extend_from_slice(values);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Builds a matrix from row-major values.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<i64>) -> Result<Self, Error> {
        if data.len() != rows * cols {
            return Err(Error::MalformedMessage(format!(
                "{} values cannot fill a {}x{} matrix",
                data.len(),
                rows,
                cols
            )));
        }
        Ok(Self { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> i64 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: i64) {
        self.data[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[i64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.data
    }

    pub fn to_rows(&self) -> Vec<Vec<i64>> {
        (0..self.rows).map(|row| self.row(row).to_vec()).collect()
    }

    /// Copies rows `offset..offset + count` into a new matrix.
    pub fn row_block(&self, offset: usize, count: usize) -> Result<Matrix, Error> {
        let end = offset + count;
        if end > self.rows {
            return Err(Error::RowsOutOfRange {
                offset,
                end,
                rows: self.rows,
            });
        }
        Ok(Self {
            rows: count,
            cols: self.cols,
            data: self.data[offset * self.cols..end * self.cols].to_vec(),
        })
    }

    /// Overwrites the rows starting at `offset` with the rows of `block`.
    pub fn write_rows(&mut self, offset: usize, block: &Matrix) -> Result<(), Error> {
        let end = offset + block.rows;
        if end > self.rows {
            return Err(Error::RowsOutOfRange {
                offset,
                end,
                rows: self.rows,
            });
        }
        if block.cols != self.cols {
            return Err(Error::DimensionMismatch(
                self.rows, self.cols, block.rows, block.cols,
            ));
        }
        self.data[offset * self.cols..end * self.cols].copy_from_slice(&block.data);
        Ok(())
    }

    /// Stacks blocks vertically, in iteration order.
    pub fn concat_rows<I>(blocks: I) -> Result<Matrix, Error>
    where
        I: IntoIterator<Item = Matrix>,
    {
        let mut blocks = blocks.into_iter();
        let Some(mut stacked) = blocks.next() else {
            return Ok(Matrix::zeros(0, 0));
        };
        for block in blocks {
            if block.cols != stacked.cols {
                return Err(Error::DimensionMismatch(
                    stacked.rows,
                    stacked.cols,
                    block.rows,
                    block.cols,
                ));
            }
            stacked.rows += block.rows;
            stacked.data.extend(block.data);
        }
        Ok(stacked)
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matrix {}x{} ", self.rows, self.cols)?;
        f.debug_list().entries((0..self.rows).map(|row| self.row(row))).finish()
    }
}

impl From<&Matrix> for MatrixData {
    fn from(matrix: &Matrix) -> Self {
        MatrixData {
            rows: matrix.rows as u32,
            cols: matrix.cols as u32,
            values: matrix.data.clone(),
        }
    }
}

impl TryFrom<MatrixData> for Matrix {
    type Error = Error;

    fn try_from(data: MatrixData) -> Result<Self, Error> {
        Matrix::from_vec(data.rows as usize, data.cols as usize, data.values)
    }
}

/// A contiguous run of rows taken from a larger matrix, remembering where in
/// that matrix it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowBlock {
    offset: usize,
    rows: Matrix,
}

impl RowBlock {
    pub fn new(offset: usize, rows: Matrix) -> Self {
        Self { offset, rows }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn row_count(&self) -> usize {
        self.rows.rows()
    }

    pub fn matrix(&self) -> &Matrix {
        &self.rows
    }

    pub fn into_matrix(self) -> Matrix {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Matrix {
        Matrix::from_rows(vec![vec![1, 2], vec![3, 4], vec![5, 6]]).unwrap()
    }

    #[test]
    fn from_rows_rejects_ragged_input() {
        let err = Matrix::from_rows(vec![vec![1, 2], vec![3]]).unwrap_err();
        assert!(matches!(
            err,
            Error::RaggedRows {
                row: 1,
                len: 1,
                expected: 2
            }
        ));
    }

    #[test]
    fn row_block_and_write_rows_address_the_same_rows() {
        let source = sample();
        let block = source.row_block(1, 2).unwrap();
        assert_eq!(block.to_rows(), vec![vec![3, 4], vec![5, 6]]);

        let mut target = Matrix::zeros(3, 2);
        target.write_rows(1, &block).unwrap();
        assert_eq!(target.to_rows(), vec![vec![0, 0], vec![3, 4], vec![5, 6]]);
    }

    #[test]
    fn out_of_range_rows_are_rejected() {
        let mut target = sample();
        assert!(matches!(
            target.row_block(2, 2),
            Err(Error::RowsOutOfRange { end: 4, .. })
        ));
        assert!(target.write_rows(2, &sample()).is_err());
        assert_eq!(target, sample());
    }

    #[test]
    fn concat_rows_restacks_blocks() {
        let source = sample();
        let blocks = vec![
            source.row_block(0, 1).unwrap(),
            source.row_block(1, 2).unwrap(),
        ];
        assert_eq!(Matrix::concat_rows(blocks).unwrap(), source);
    }

    #[test]
    fn malformed_wire_matrix_is_rejected() {
        let data = MatrixData {
            rows: 2,
            cols: 2,
            values: vec![1, 2, 3],
        };
        assert!(matches!(
            Matrix::try_from(data),
            Err(Error::MalformedMessage(_))
        ));
    }
}
