//! Collective all-to-all distribution.
//!
//! No rank hands out work. Every rank builds its own row block of both
//! operands, the second operand is reassembled everywhere with an all-gather,
//! each rank multiplies its first-operand block by it, and a gather at rank 0
//! stacks the partial products in rank order.

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
    let rows = partition::block_range(dimension, world.size(), world.rank())?;
    let first = source.block(Operand::First, rows.start, rows.len(), dimension)?;
    let own_second = source.block(Operand::Second, rows.start, rows.len(), dimension)?;

    let second = share_second_operand(world, &own_second).await?;
    let partial = kernel::multiply(&first, &second)?;
    debug!(rank = world.rank(), offset = rows.start, "block multiplied");

    let Some(parts) = world.gather(&MatrixData::from(&partial), ROOT).await? else {
        return Ok(None);
    };

    let product = Matrix::concat_rows(
        parts
            .into_iter()
            .map(Matrix::try_from)
            .collect::<Result<Vec<_>, _>>()?,
    )?;
    info!("all-to-all product assembled");
    Ok(Some(product))
}

/// All-gathers every rank's block of the second operand and stacks them in
/// rank order, so every rank ends up with the same full operand.
pub async fn share_second_operand(world: &Communicator, own: &Matrix) -> Result<Matrix, Error> {
    let parts = world.all_gather(&MatrixData::from(own)).await?;
    let blocks = parts
        .into_iter()
        .map(Matrix::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Matrix::concat_rows(blocks)
}
