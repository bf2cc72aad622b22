//! Distributed matrix multiplication over rank-addressed message passing.
//!
//! `matrix-mul` computes `C = A × B` for square integer matrices across a
//! group of ranks connected by a [`comm::Communicator`], using one of four
//! strategies:
//!
//! - **one-to-all**: scatter row blocks of A, broadcast B, gather the results.
//! - **all-to-all**: every rank builds its own blocks, all-gathers B, and the
//!   results are gathered at rank 0.
//! - **blocking**: rank 0 sends one job per worker and waits for each reply in
//!   turn.
//! - **non-blocking**: rank 0 issues all sends and receives as pending
//!   operations and joins them as sets.
//!
//! Rank 0 also times the single-process kernel on the same operands and
//! reports the speed-up.
//!
//! # Example
//!
//! ```
//! use comm::LocalUniverse;
//! use matrix_mul::{Matrix, MatrixSource, RunConfig, Strategy, run_local};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), matrix_mul::Error> {
//!     let a = Matrix::from_rows(vec![vec![1, 2], vec![3, 4]])?;
//!     let b = Matrix::from_rows(vec![vec![5, 6], vec![7, 8]])?;
//!     let config = RunConfig::new(Strategy::NonBlocking, 2, MatrixSource::explicit(a, b));
//!
//!     let outcomes = run_local(&config, &LocalUniverse::new(3)).await?;
//!     let product = outcomes[0].product.as_ref().unwrap();
//!     assert_eq!(product.to_rows(), vec![vec![19, 22], vec![43, 50]]);
//!     Ok(())
//! }
//! ```

pub mod config;
mod error;
pub mod job;
pub mod kernel;
mod matrix;
pub mod partition;
pub mod run;
mod source;
pub mod strategy;

pub use error::Error;
pub use matrix::{Matrix, RowBlock};
pub use run::{Outcome, Report, RunConfig, run_local, run_strategy};
pub use source::{MatrixSource, Operand};
pub use strategy::Strategy;
