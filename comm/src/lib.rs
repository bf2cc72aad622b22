//! Message passing between a fixed group of ranks.
//!
//! `comm` gives every participant of a run a [`Communicator`]: its rank, the
//! group size, blocking and non-blocking point-to-point messaging, and the
//! collective operations (broadcast, scatter, gather, all-gather, barrier).
//! Messages are any `prost::Message`.
//!
//! Two transports are provided:
//!
//! - [`LocalUniverse`]: all ranks in one process, connected by in-memory
//!   mailboxes. Optional random latency makes delivery order unpredictable.
//! - [`RelayTransport`]: each rank in its own process, exchanging envelopes
//!   through a `relay-server`.
//!
//! # Example
//!
//! ```
//! use comm::LocalUniverse;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), comm::Error> {
//!     let universe = LocalUniverse::new(3);
//!     let mut tasks = Vec::new();
//!
//!     for world in universe.communicators() {
//!         tasks.push(tokio::spawn(async move {
//!             let mut greeting = String::new();
//!             if world.rank() == 0 {
//!                 greeting = "hello".to_string();
//!             }
//!             world.broadcast(&mut greeting, 0).await?;
//!             Ok::<_, comm::Error>(greeting)
//!         }));
//!     }
//!
//!     for task in tasks {
//!         assert_eq!(task.await??, "hello");
//!     }
//!     Ok(())
//! }
//! ```

mod communicator;
mod error;
mod local;
mod mailbox;
mod relay;
mod request;
mod sync;
mod transport;

/// Message tag. Values at or above [`COLLECTIVE_TAG_BASE`] are reserved.
pub type Tag = u32;

pub use communicator::{COLLECTIVE_TAG_BASE, Communicator};
pub use error::{Error, Result};
pub use local::LocalUniverse;
pub use relay::{RelayTransport, ServerAddr};
pub use request::{Request, RequestList};
pub use transport::{Envelope, Transport};
