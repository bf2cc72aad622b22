//! Collective one-to-all distribution.
//!
//! 1. Rank 0 builds both operands and splits the first into one row block
//!    per rank.
//! 2. The blocks are scattered: rank `i` receives block `i`.
//! 3. The second operand is broadcast whole; nobody multiplies before their
//!    copy has arrived.
//! 4. Every rank, rank 0 included, multiplies its block.
//! 5. The partial products are gathered at rank 0 in rank order and written
//!    back at `rank * rows_per_rank`.

use comm::Communicator;
use matrix_mpi_types::matrix::MatrixData;
use tracing::{debug, info};

use super::ROOT;
use crate::Error;
use crate::kernel;
use crate::matrix::Matrix;
use crate::partition;
use crate::source::{MatrixSource, Operand};

pub async fn multiply(
    world: &Communicator,
    source: &MatrixSource,
    dimension: usize,
) -> Result<Option<Matrix>, Error> {
    let rows_per_rank = partition::rows_per_part(dimension, world.size())?;

    let (blocks, mut second) = if world.rank() == ROOT {
        let first = source.block(Operand::First, 0, dimension, dimension)?;
        let second = source.block(Operand::Second, 0, dimension, dimension)?;
        let blocks = partition::split_rows(&first, world.size())?
            .iter()
            .map(|block| MatrixData::from(block.matrix()))
            .collect::<Vec<_>>();
        info!(ranks = world.size(), rows_per_rank, "scattering first operand");
        (Some(blocks), MatrixData::from(&second))
    } else {
        (None, MatrixData::default())
    };

    let block = Matrix::try_from(world.scatter(blocks, ROOT).await?)?;
    world.broadcast(&mut second, ROOT).await?;
    let second = Matrix::try_from(second)?;

    let partial = kernel::multiply(&block, &second)?;
    debug!(rank = world.rank(), rows = partial.rows(), "block multiplied");

    let Some(parts) = world.gather(&MatrixData::from(&partial), ROOT).await? else {
        return Ok(None);
    };

    let mut product = Matrix::zeros(dimension, dimension);
    for (rank, part) in parts.into_iter().enumerate() {
        product.write_rows(rank * rows_per_rank, &Matrix::try_from(part)?)?;
    }
    info!("one-to-all product assembled");
    Ok(Some(product))
}
