//! In-process transport: every rank is a task and every mailbox lives in
//! shared memory.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::trace;

use crate::communicator::Communicator;
use crate::mailbox::{Mailbox, Slot};
use crate::transport::{Envelope, Transport};
use crate::{Error, Result, Tag};

/// A group of ranks connected by in-memory mailboxes.
///
/// # Example
///
/// ```
/// use comm::LocalUniverse;
///
/// #[tokio::main]
/// async fn main() -> Result<(), comm::Error> {
///     let universe = LocalUniverse::new(2);
///     let mut ranks = universe.communicators().into_iter();
///     let (zero, one) = (ranks.next().unwrap(), ranks.next().unwrap());
///
///     zero.send(&42u64, 1, 0).await?;
///     let value: u64 = one.recv(0, 0).await?;
///     assert_eq!(value, 42);
///     Ok(())
/// }
/// ```
pub struct LocalUniverse {
    mailboxes: Arc<Vec<Arc<Mailbox>>>,
    latency: Option<Duration>,
    delivered: Arc<AtomicU64>,
}

impl LocalUniverse {
    pub fn new(size: usize) -> Self {
        Self {
            mailboxes: Arc::new((0..size).map(|_| Arc::new(Mailbox::new())).collect()),
            latency: None,
            delivered: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Delays every delivery by a random duration up to `max`.
    pub fn with_latency(mut self, max: Duration) -> Self {
        self.latency = Some(max);
        self
    }

    pub fn size(&self) -> usize {
        self.mailboxes.len()
    }

    /// Number of envelopes delivered so far across all ranks.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::SeqCst)
    }

    /// Builds one communicator per rank, in rank order.
    pub fn communicators(&self) -> Vec<Communicator> {
        (0..self.size())
            .map(|rank| {
                let transport = LocalTransport {
                    rank,
                    mailboxes: Arc::clone(&self.mailboxes),
                    latency: self.latency,
                    delivered: Arc::clone(&self.delivered),
                };
                Communicator::from_parts(rank, self.size(), Arc::new(transport))
            })
            .collect()
    }
}

struct LocalTransport {
    rank: usize,
    mailboxes: Arc<Vec<Arc<Mailbox>>>,
    latency: Option<Duration>,
    delivered: Arc<AtomicU64>,
}

impl LocalTransport {
    fn mailbox(&self, rank: usize) -> Result<&Mailbox> {
        self.mailboxes
            .get(rank)
            .map(Arc::as_ref)
            .ok_or(Error::InvalidRank {
                rank,
                size: self.mailboxes.len(),
            })
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn deliver(&self, envelope: Envelope) -> Result<()> {
        if let Some(max) = self.latency {
            let delay = rand::thread_rng().gen_range(Duration::ZERO..=max);
            tokio::time::sleep(delay).await;
        }

        trace!(
            source = envelope.source,
            dest = envelope.dest,
            tag = envelope.tag,
            seq = envelope.seq,
            "local delivery"
        );
        let slot = envelope.slot();
        self.mailbox(envelope.dest)?.deposit(slot, envelope.payload)?;
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn receive(&self, source: usize, tag: Tag, seq: u64) -> Result<Vec<u8>> {
        self.mailbox(self.rank)?
            .take(Slot { source, tag, seq })
            .await
    }
}
