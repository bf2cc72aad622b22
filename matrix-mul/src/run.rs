//! Running one strategy end to end on one rank, timing it against the
//! single-process kernel, and running a whole group in-process.

use std::fmt;
use std::time::{Duration, Instant};

use comm::{Communicator, LocalUniverse};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::Error;
use crate::kernel;
use crate::matrix::Matrix;
use crate::source::{MatrixSource, Operand};
use crate::strategy::Strategy;

/// Everything a rank needs to take part in one run. Every rank of a group
/// must be given the same configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub strategy: Strategy,
    pub dimension: usize,
    pub source: MatrixSource,
    /// Compare the distributed product with the single-process one at rank 0.
    pub verify: bool,
}

impl RunConfig {
    pub fn new(strategy: Strategy, dimension: usize, source: MatrixSource) -> Self {
        Self {
            strategy,
            dimension,
            source,
            verify: true,
        }
    }

    /// Checks everything that can be checked without talking to other ranks.
    pub fn validate(&self, size: usize) -> Result<(), Error> {
        self.source.validate(self.dimension)?;
        self.strategy.validate(size, self.dimension)
    }
}

/// Timing of a distributed run against the undistributed baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub strategy: Strategy,
    pub baseline: Duration,
    pub distributed: Duration,
    /// `None` when verification was turned off.
    pub verified: Option<bool>,
}

impl Report {
    /// How many times faster the distributed run was than the baseline.
    pub fn speedup(&self) -> f64 {
        let distributed = self.distributed.as_secs_f64();
        if distributed == 0.0 {
            return f64::INFINITY;
        }
        self.baseline.as_secs_f64() / distributed
    }

    /// Fails when verification found the distributed product wrong.
    pub fn check(&self) -> Result<(), Error> {
        match self.verified {
            Some(false) => Err(Error::ResultMismatch {
                strategy: self.strategy.name(),
            }),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Simple multiply : {:?}", self.baseline)?;
        writeln!(f, "{} multiply : {:?}", self.strategy, self.distributed)?;
        write!(f, "SpeedUp: {:.3}", self.speedup())?;
        match self.verified {
            Some(true) => write!(f, " (result verified)"),
            Some(false) => write!(f, " (RESULT MISMATCH)"),
            None => Ok(()),
        }
    }
}

/// What one rank came away with.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub rank: usize,
    pub strategy: Strategy,
    pub elapsed: Duration,
    /// The assembled product; only present at rank 0.
    pub product: Option<Matrix>,
    /// Only present at rank 0.
    pub report: Option<Report>,
}

/// Runs `config.strategy` as rank `world.rank()`.
///
/// Configuration problems are reported before any message is sent. At rank 0
/// the product is also computed by the single-process kernel for timing and,
/// when `config.verify` is set, compared with the distributed product.
pub async fn run_strategy(config: &RunConfig, world: &Communicator) -> Result<Outcome, Error> {
    config.validate(world.size())?;

    let started = Instant::now();
    let product = config
        .strategy
        .execute(world, &config.source, config.dimension)
        .await?;
    let elapsed = started.elapsed();

    let report = match &product {
        Some(product) => Some(compare_with_baseline(config, world.size(), product, elapsed)?),
        None => None,
    };

    Ok(Outcome {
        rank: world.rank(),
        strategy: config.strategy,
        elapsed,
        product,
        report,
    })
}

fn compare_with_baseline(
    config: &RunConfig,
    size: usize,
    product: &Matrix,
    distributed: Duration,
) -> Result<Report, Error> {
    // All-to-all ranks each generate their own block, so the operands are
    // rebuilt block by block.
    let parts = match config.strategy {
        Strategy::AllToAll => size,
        _ => 1,
    };
    let first = config.source.assemble(Operand::First, config.dimension, parts)?;
    let second = config.source.assemble(Operand::Second, config.dimension, parts)?;

    let started = Instant::now();
    let expected = kernel::multiply(&first, &second)?;
    let baseline = started.elapsed();

    let verified = config.verify.then(|| expected == *product);
    if verified == Some(false) {
        warn!(strategy = %config.strategy, "distributed product differs from baseline");
    }

    let report = Report {
        strategy: config.strategy,
        baseline,
        distributed,
        verified,
    };
    info!(
        strategy = %config.strategy,
        baseline_ms = baseline.as_millis() as u64,
        distributed_ms = distributed.as_millis() as u64,
        speedup = report.speedup(),
        "run finished"
    );
    Ok(report)
}

/// Runs every rank of `universe` as a task of this process and returns the
/// outcomes in rank order.
///
/// The configuration is checked against the group before any task starts,
/// so an empty group is an error rather than an empty run. The first rank to
/// fail aborts the others.
pub async fn run_local(config: &RunConfig, universe: &LocalUniverse) -> Result<Vec<Outcome>, Error> {
    config.validate(universe.size())?;

    let mut tasks = JoinSet::new();
    for world in universe.communicators() {
        let config = config.clone();
        tasks.spawn(async move { run_strategy(&config, &world).await });
    }

    let mut outcomes = Vec::with_capacity(universe.size());
    while let Some(joined) = tasks.join_next().await {
        match joined.map_err(comm::Error::from)? {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                tasks.abort_all();
                return Err(e);
            }
        }
    }

    outcomes.sort_by_key(|outcome| outcome.rank);
    Ok(outcomes)
}
