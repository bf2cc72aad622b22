//! Non-blocking point-to-point distribution.
//!
//! Same roles and split as the blocking strategy, but the coordinator issues
//! every job send up front and joins them as one set, then posts every reply
//! receive up front and joins that set. Each reply is written into the product
//! by the join's completion callback, as soon as that particular receive has
//! completed and never before.

use comm::{Communicator, RequestList};
use matrix_mpi_types::matrix as wire;
use tracing::{debug, info};

use super::{JOB_TAG, RESULT_TAG, ROOT};
use crate::Error;
use crate::job::{Job, PartialResult};
use crate::matrix::Matrix;
use crate::partition;
use crate::source::{MatrixSource, Operand};

pub async fn multiply(
    world: &Communicator,
    source: &MatrixSource,
    dimension: usize,
) -> Result<Option<Matrix>, Error> {
    if world.rank() == ROOT {
        coordinate(world, source, dimension).await.map(Some)
    } else {
        work(world).await?;
        Ok(None)
    }
}

async fn coordinate(
    world: &Communicator,
    source: &MatrixSource,
    dimension: usize,
) -> Result<Matrix, Error> {
    let workers = world.size() - 1;
    let first = source.block(Operand::First, 0, dimension, dimension)?;
    let second = source.block(Operand::Second, 0, dimension, dimension)?;

    let mut sends = RequestList::new();
    for (index, block) in partition::split_rows(&first, workers)?.into_iter().enumerate() {
        let job = Job::new(block, second.clone());
        sends.add(world.isend(&wire::Job::from(&job), index + 1, JOB_TAG)?);
    }
    info!(pending = sends.len(), "jobs issued");
    sends.wait_all().await?;

    let mut receives = RequestList::new();
    for worker in 1..world.size() {
        receives.add(world.irecv::<wire::PartialResult>(worker, RESULT_TAG)?);
    }
    info!(pending = receives.len(), "receives posted");

    let mut product = Matrix::zeros(dimension, dimension);
    receives
        .wait_all_with(|reply| {
            let result = PartialResult::try_from(reply)?;
            debug!(offset = result.offset(), "reply completed");
            result.write_into(&mut product)
        })
        .await?;
    info!("non-blocking product assembled");
    Ok(product)
}

async fn work(world: &Communicator) -> Result<(), Error> {
    let job = world.irecv::<wire::Job>(ROOT, JOB_TAG)?.wait().await?;
    let job = Job::try_from(job)?;
    debug!(rank = world.rank(), offset = job.offset(), "job received");

    let result = job.execute()?;
    world
        .isend(&wire::PartialResult::from(&result), ROOT, RESULT_TAG)?
        .wait()
        .await?;
    Ok(())
}
