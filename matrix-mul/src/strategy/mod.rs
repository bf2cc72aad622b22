//! The four ways of spreading one product across a group of ranks.
//!
//! Every strategy is an async function run by every rank of the group with
//! the same arguments. Rank 0 coordinates and is the only rank that ends up
//! holding the assembled product.

pub mod all_to_all;
pub mod blocking;
pub mod non_blocking;
pub mod one_to_all;

use std::fmt;

use clap::ValueEnum;
use comm::{Communicator, Tag};
use serde::Deserialize;

use crate::Error;
use crate::matrix::Matrix;
use crate::partition;
use crate::source::MatrixSource;

/// The coordinating rank.
pub const ROOT: usize = 0;

/// Tag of job messages sent by the coordinator.
pub const JOB_TAG: Tag = 1;
/// Tag of partial results sent back by workers.
pub const RESULT_TAG: Tag = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Scatter row blocks, broadcast the second operand, gather the results.
    OneToAll,
    /// Every rank builds its own blocks; all-gather the second operand.
    AllToAll,
    /// Coordinator sends one job per worker and blocks on every reply in turn.
    Blocking,
    /// Coordinator issues every send and receive up front, then joins them.
    NonBlocking,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::OneToAll,
        Strategy::AllToAll,
        Strategy::Blocking,
        Strategy::NonBlocking,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::OneToAll => "one-to-all",
            Strategy::AllToAll => "all-to-all",
            Strategy::Blocking => "blocking",
            Strategy::NonBlocking => "non-blocking",
        }
    }

    /// Smallest group this strategy can run on.
    pub fn min_ranks(self) -> usize {
        match self {
            Strategy::AllToAll => 1,
            Strategy::OneToAll | Strategy::Blocking | Strategy::NonBlocking => 2,
        }
    }

    /// How many ranks multiply a share of the rows.
    ///
    /// The point-to-point coordinator only distributes and collects.
    pub fn worker_count(self, size: usize) -> usize {
        match self {
            Strategy::OneToAll | Strategy::AllToAll => size,
            Strategy::Blocking | Strategy::NonBlocking => size.saturating_sub(1),
        }
    }

    /// Rejects groups and dimensions this strategy cannot handle. Runs on
    /// every rank before any message is sent.
    pub fn validate(self, size: usize, dimension: usize) -> Result<(), Error> {
        if size < self.min_ranks() {
            return Err(Error::Configuration {
                strategy: self.name(),
                min: self.min_ranks(),
                size,
            });
        }
        partition::rows_per_part(dimension, self.worker_count(size))?;
        Ok(())
    }

    /// Runs this strategy's protocol for this rank. Returns the product at
    /// [`ROOT`] and `None` on every other rank.
    pub async fn execute(
        self,
        world: &Communicator,
        source: &MatrixSource,
        dimension: usize,
    ) -> Result<Option<Matrix>, Error> {
        self.validate(world.size(), dimension)?;
        match self {
            Strategy::OneToAll => one_to_all::multiply(world, source, dimension).await,
            Strategy::AllToAll => all_to_all::multiply(world, source, dimension).await,
            Strategy::Blocking => blocking::multiply(world, source, dimension).await,
            Strategy::NonBlocking => non_blocking::multiply(world, source, dimension).await,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
