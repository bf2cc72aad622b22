//! Where operand matrices come from.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::Error;
use crate::matrix::Matrix;

/// Which side of the product a block belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    First,
    Second,
}

/// Produces row blocks of the two operands.
///
/// The same source asked for the same block always returns the same rows, so
/// every rank can build its own share and rank 0 can rebuild the whole
/// operands afterwards.
#[derive(Debug, Clone)]
pub enum MatrixSource {
    /// Uniform values in `0..bound`. Each block gets its own generator,
    /// seeded from `seed`, the operand and the block offset.
    Random { seed: u64, bound: i64 },
    /// Blocks are slices of the given square matrices.
    Explicit { first: Matrix, second: Matrix },
}

impl MatrixSource {
    pub fn random(seed: u64, bound: i64) -> Self {
        Self::Random { seed, bound }
    }

    pub fn explicit(first: Matrix, second: Matrix) -> Self {
        Self::Explicit { first, second }
    }

    /// Checks that this source can serve `dimension × dimension` operands
    /// whose product is guaranteed to fit in `i64`.
    ///
    /// The range check is by magnitude, `dimension · max|a| · max|b|`, so it
    /// may reject explicit operands whose signed terms would cancel out.
    pub fn validate(&self, dimension: usize) -> Result<(), Error> {
        match self {
            Self::Random { bound, .. } if *bound <= 0 => Err(Error::Settings(format!(
                "random bound must be positive, got {bound}"
            ))),
            Self::Random { bound, .. } => {
                let largest = (*bound - 1).unsigned_abs();
                check_product_range(dimension, largest, largest)
            }
            Self::Explicit { first, second } => {
                for m in [first, second] {
                    if m.rows() != dimension || m.cols() != dimension {
                        return Err(Error::DimensionMismatch(
                            dimension,
                            dimension,
                            m.rows(),
                            m.cols(),
                        ));
                    }
                }
                check_product_range(dimension, largest_magnitude(first), largest_magnitude(second))
            }
        }
    }

    /// Rows `offset..offset + rows` of `operand`, `cols` wide.
    pub fn block(&self, operand: Operand, offset: usize, rows: usize, cols: usize) -> Result<Matrix, Error> {
        match self {
            Self::Random { seed, bound } => {
                let mut rng = StdRng::seed_from_u64(block_seed(*seed, operand, offset));
                let values = (0..rows * cols).map(|_| rng.gen_range(0..*bound)).collect();
                Matrix::from_vec(rows, cols, values)
            }
            Self::Explicit { first, second } => {
                let matrix = match operand {
                    Operand::First => first,
                    Operand::Second => second,
                };
                if matrix.cols() != cols {
                    return Err(Error::DimensionMismatch(matrix.rows(), matrix.cols(), rows, cols));
                }
                matrix.row_block(offset, rows)
            }
        }
    }

    /// The full `dimension × dimension` operand as the stack of `parts`
    /// equally tall blocks.
    pub fn assemble(&self, operand: Operand, dimension: usize, parts: usize) -> Result<Matrix, Error> {
        let height = crate::partition::rows_per_part(dimension, parts)?;
        let blocks = (0..parts)
            .map(|index| self.block(operand, index * height, height, dimension))
            .collect::<Result<Vec<_>, _>>()?;
        Matrix::concat_rows(blocks)
    }
}

fn largest_magnitude(matrix: &Matrix) -> u64 {
    matrix
        .as_slice()
        .iter()
        .map(|value| value.unsigned_abs())
        .max()
        .unwrap_or(0)
}

fn check_product_range(dimension: usize, first: u64, second: u64) -> Result<(), Error> {
    let worst = u128::from(first)
        .checked_mul(u128::from(second))
        .and_then(|square| square.checked_mul(dimension as u128));
    if worst.is_none_or(|worst| worst > i64::MAX as u128) {
        return Err(Error::Settings(format!(
            "entries up to {first} and {second} over {dimension} terms can overflow a 64-bit product"
        )));
    }
    Ok(())
}

fn block_seed(seed: u64, operand: Operand, offset: usize) -> u64 {
    let side = match operand {
        Operand::First => 0x9E37_79B9_7F4A_7C15,
        Operand::Second => 0xC2B2_AE3D_27D4_EB4F,
    };
    seed ^ side ^ (offset as u64).wrapping_mul(0x1656_67B1_9E37_79F9)
}
