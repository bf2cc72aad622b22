//! `matrix-mul` command-line interface.
//!
//! ```sh
//! # every rank as a task of this process
//! matrix-mul local --ranks 4 --strategy one-to-all --dimension 480
//!
//! # every strategy in turn on the same group
//! matrix-mul compare --ranks 5 --dimension 240
//!
//! # one process per rank, talking through a relay-server
//! matrix-mul rank --rank 0 --size 3 --strategy blocking --relay 127.0.0.1:50051 --session run-7
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use comm::{LocalUniverse, RelayTransport};
use matrix_mul::config::{Settings, load_settings};
use matrix_mul::{Error, Outcome, Strategy, run_local, run_strategy};

#[derive(Parser)]
#[command(name = "matrix-mul")]
#[command(about = "Distributed matrix multiplication over message passing")]
#[command(version)]
struct Cli {
    /// TOML settings file; command-line flags override its values.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RunArgs {
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,
    /// Side length of the square operands.
    #[arg(long)]
    dimension: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    /// Random values are drawn from 0..bound.
    #[arg(long)]
    bound: Option<i64>,
    /// Skip comparing the distributed product with the baseline.
    #[arg(long)]
    no_verify: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every rank as a task of this process.
    Local {
        #[command(flatten)]
        run: RunArgs,
        #[arg(long)]
        ranks: Option<usize>,
        /// Random delivery delay of up to this many milliseconds per message.
        #[arg(long)]
        latency_ms: Option<u64>,
    },
    /// Run every strategy in turn, in-process.
    Compare {
        #[command(flatten)]
        run: RunArgs,
        #[arg(long)]
        ranks: Option<usize>,
    },
    /// Run one rank of a group spread over several processes.
    Rank {
        #[command(flatten)]
        run: RunArgs,
        #[arg(long)]
        rank: usize,
        #[arg(long)]
        size: usize,
        /// Relay server address.
        #[arg(long)]
        relay: Option<String>,
        /// Run identifier shared by every rank of the group. The relay
        /// refuses a session that an earlier run already used.
        #[arg(long)]
        session: Option<String>,
    },
}

impl RunArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(strategy) = self.strategy {
            settings.strategy = strategy;
        }
        if let Some(dimension) = self.dimension {
            settings.dimension = dimension;
        }
        if let Some(seed) = self.seed {
            settings.seed = seed;
        }
        if let Some(bound) = self.bound {
            settings.bound = bound;
        }
        if self.no_verify {
            settings.verify = false;
        }
    }
}

/// Prints rank 0's report and fails if its product was wrong.
fn print_report(outcomes: &[Outcome]) -> Result<(), Error> {
    for outcome in outcomes {
        if let Some(report) = &outcome.report {
            println!("{}", report);
            report.check()?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => load_settings(path)?,
        None => Settings::default(),
    };

    match cli.command {
        Commands::Local {
            run,
            ranks,
            latency_ms,
        } => {
            run.apply(&mut settings);
            settings.ranks = ranks.unwrap_or(settings.ranks);
            settings.latency_ms = latency_ms.unwrap_or(settings.latency_ms);

            let config = settings.run_config()?;
            let mut universe = LocalUniverse::new(settings.ranks);
            if let Some(latency) = settings.latency() {
                universe = universe.with_latency(latency);
            }

            println!(
                "Running {} on {} ranks, {}x{} operands",
                config.strategy, settings.ranks, config.dimension, config.dimension
            );
            let outcomes = run_local(&config, &universe).await?;
            print_report(&outcomes)?;
        }
        Commands::Compare { run, ranks } => {
            run.apply(&mut settings);
            settings.ranks = ranks.unwrap_or(settings.ranks);

            for strategy in Strategy::ALL {
                settings.strategy = strategy;
                let config = settings.run_config()?;
                if let Err(e) = config.validate(settings.ranks) {
                    println!("Skipping {}: {}", strategy, e);
                    continue;
                }

                let outcomes = run_local(&config, &LocalUniverse::new(settings.ranks)).await?;
                print_report(&outcomes)?;
                println!();
            }
        }
        Commands::Rank {
            run,
            rank,
            size,
            relay,
            session,
        } => {
            run.apply(&mut settings);
            let addr = relay.unwrap_or_else(|| settings.relay.addr.clone());
            let session = session
                .or_else(|| settings.relay.session.clone())
                .ok_or_else(|| {
                    Error::Settings("rank runs need --session or [relay] session".to_string())
                })?;

            let config = settings.run_config()?;
            config.validate(size)?;

            let world = RelayTransport::communicator(addr.clone(), rank, size, session).await?;
            println!("Rank {} of {} connected to {}", rank, size, addr);

            let outcome = run_strategy(&config, &world).await?;
            print_report(std::slice::from_ref(&outcome))?;
            println!("Rank {} done in {:?}", rank, outcome.elapsed);
        }
    }

    Ok(())
}
