//! Blocking point-to-point distribution.
//!
//! Rank 0 only coordinates. It sends worker `i` (rank `i + 1`) the `i`-th row
//! block together with the whole second operand, then waits for the replies
//! one worker at a time in rank order. Each worker receives exactly one job
//! and sends exactly one reply.

use comm::Communicator;
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

    info!(workers, "sending jobs");
    for (index, block) in partition::split_rows(&first, workers)?.into_iter().enumerate() {
        let job = Job::new(block, second.clone());
        world.send(&wire::Job::from(&job), index + 1, JOB_TAG).await?;
    }

    let mut product = Matrix::zeros(dimension, dimension);
    for worker in 1..world.size() {
        let reply: wire::PartialResult = world.recv(worker, RESULT_TAG).await?;
        let result = PartialResult::try_from(reply)?;
        debug!(worker, offset = result.offset(), "reply received");
        result.write_into(&mut product)?;
    }
    info!("blocking product assembled");
    Ok(product)
}

async fn work(world: &Communicator) -> Result<(), Error> {
    let job = Job::try_from(world.recv::<wire::Job>(ROOT, JOB_TAG).await?)?;
    debug!(rank = world.rank(), offset = job.offset(), "job received");

    let result = job.execute()?;
    world
        .send(&wire::PartialResult::from(&result), ROOT, RESULT_TAG)
        .await?;
    Ok(())
}
