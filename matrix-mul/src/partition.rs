//! Splitting matrices into contiguous row blocks.
//!
//! Every block of one split has the same height. A row count that does not
//! divide evenly by the number of parts is rejected with
//! [`Error::PartitionMismatch`] rather than dropping or padding rows.

use std::ops::Range;

use crate::Error;
use crate::matrix::{Matrix, RowBlock};

/// Height of each block when `rows` rows are split into `parts` blocks.
pub fn rows_per_part(rows: usize, parts: usize) -> Result<usize, Error> {
    if parts == 0 || rows % parts != 0 {
        return Err(Error::PartitionMismatch { rows, parts });
    }
    Ok(rows / parts)
}

/// Rows covered by block `index` of a split of `rows` rows into `parts` blocks.
///
/// This is what a participant that builds its own block uses in place of a
/// central split.
pub fn block_range(rows: usize, parts: usize, index: usize) -> Result<Range<usize>, Error> {
    let height = rows_per_part(rows, parts)?;
    if index >= parts {
        return Err(Error::RowsOutOfRange {
            offset: index * height,
            end: (index + 1) * height,
            rows,
        });
    }
    Ok(index * height..(index + 1) * height)
}

/// Splits `matrix` into `parts` blocks of equal height, in offset order.
pub fn split_rows(matrix: &Matrix, parts: usize) -> Result<Vec<RowBlock>, Error> {
    let height = rows_per_part(matrix.rows(), parts)?;
    (0..parts)
        .map(|index| {
            let offset = index * height;
            Ok(RowBlock::new(offset, matrix.row_block(offset, height)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(rows: usize, cols: usize) -> Matrix {
        let values = (0..(rows * cols) as i64).collect();
        Matrix::from_vec(rows, cols, values).unwrap()
    }

    #[test]
    fn blocks_are_disjoint_ordered_and_reassemble() {
        for (rows, parts) in [(12, 1), (12, 2), (12, 3), (12, 4), (12, 6), (12, 12)] {
            let matrix = numbered(rows, 3);
            let blocks = split_rows(&matrix, parts).unwrap();

            assert_eq!(blocks.len(), parts);
            for pair in blocks.windows(2) {
                assert_eq!(pair[0].offset() + pair[0].row_count(), pair[1].offset());
            }
            assert_eq!(blocks[0].offset(), 0);

            let rebuilt =
                Matrix::concat_rows(blocks.into_iter().map(RowBlock::into_matrix)).unwrap();
            assert_eq!(rebuilt, matrix);
        }
    }

    #[test]
    fn block_range_matches_split() {
        let matrix = numbered(8, 2);
        let blocks = split_rows(&matrix, 4).unwrap();
        for (index, block) in blocks.iter().enumerate() {
            let range = block_range(8, 4, index).unwrap();
            assert_eq!(range.start, block.offset());
            assert_eq!(range.len(), block.row_count());
        }
    }

    #[test]
    fn uneven_split_is_rejected() {
        assert!(matches!(
            split_rows(&numbered(5, 2), 2),
            Err(Error::PartitionMismatch { rows: 5, parts: 2 })
        ));
        assert!(matches!(
            rows_per_part(4, 0),
            Err(Error::PartitionMismatch { rows: 4, parts: 0 })
        ));
    }

    #[test]
    fn block_index_past_the_end_is_rejected() {
        assert!(block_range(6, 3, 3).is_err());
    }
}
