//! Rank-addressed point-to-point and collective operations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use prost::Message;
use tracing::debug;

use crate::request::Request;
use crate::transport::{Envelope, Transport};
use crate::{Error, Result, Tag};

/// Tags at or above this value belong to collective operations.
pub const COLLECTIVE_TAG_BASE: Tag = 1 << 31;

const BARRIER_TAG: Tag = COLLECTIVE_TAG_BASE;
const BROADCAST_TAG: Tag = COLLECTIVE_TAG_BASE + 1;
const SCATTER_TAG: Tag = COLLECTIVE_TAG_BASE + 2;
const GATHER_TAG: Tag = COLLECTIVE_TAG_BASE + 3;
const ALL_GATHER_TAG: Tag = COLLECTIVE_TAG_BASE + 4;

/// One rank's view of a fixed group of cooperating ranks.
///
/// Messages between a given sender, receiver and tag are matched in the order
/// the operations were issued: the n-th send from A to B under tag T always
/// satisfies the n-th receive B posts for (A, T), whatever order the
/// transport completes deliveries in. There is no ordering across different
/// pairs or tags.
///
/// Collective operations must be called by every rank of the group in the
/// same order. None of them returns before every rank has entered it.
#[derive(Clone)]
pub struct Communicator {
    inner: Arc<Inner>,
}

struct Inner {
    rank: usize,
    size: usize,
    transport: Arc<dyn Transport>,
    sent: Mutex<HashMap<(usize, Tag), u64>>,
    posted: Mutex<HashMap<(usize, Tag), u64>>,
}

fn next_seq(counters: &Mutex<HashMap<(usize, Tag), u64>>, key: (usize, Tag)) -> u64 {
    let mut counters = counters.lock().unwrap_or_else(PoisonError::into_inner);
    let counter = counters.entry(key).or_insert(0);
    let seq = *counter;
    *counter += 1;
    seq
}

impl Communicator {
    /// Creates the communicator of `rank` in a group of `size` ranks.
    pub fn new(rank: usize, size: usize, transport: Arc<dyn Transport>) -> Result<Self> {
        if rank >= size {
            return Err(Error::InvalidRank { rank, size });
        }
        Ok(Self::from_parts(rank, size, transport))
    }

    pub(crate) fn from_parts(rank: usize, size: usize, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                rank,
                size,
                transport,
                sent: Mutex::new(HashMap::new()),
                posted: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn rank(&self) -> usize {
        self.inner.rank
    }

    pub fn size(&self) -> usize {
        self.inner.size
    }

    fn check_rank(&self, rank: usize) -> Result<()> {
        if rank >= self.size() {
            return Err(Error::InvalidRank {
                rank,
                size: self.size(),
            });
        }
        Ok(())
    }

    fn check_user_tag(tag: Tag) -> Result<()> {
        if tag >= COLLECTIVE_TAG_BASE {
            return Err(Error::ReservedTag(tag));
        }
        Ok(())
    }

    fn envelope<M: Message>(&self, message: &M, dest: usize, tag: Tag) -> Envelope {
        Envelope {
            source: self.rank(),
            dest,
            tag,
            seq: next_seq(&self.inner.sent, (dest, tag)),
            payload: message.encode_to_vec(),
        }
    }

    // ========================================================================
    // Point-to-point
    // ========================================================================

    /// Sends `message` to `dest` and blocks until it has been handed over.
    pub async fn send<M: Message>(&self, message: &M, dest: usize, tag: Tag) -> Result<()> {
        self.check_rank(dest)?;
        Self::check_user_tag(tag)?;
        self.send_raw(message, dest, tag).await
    }

    /// Blocks until the next message from `source` under `tag` arrives.
    pub async fn recv<M: Message + Default>(&self, source: usize, tag: Tag) -> Result<M> {
        self.check_rank(source)?;
        Self::check_user_tag(tag)?;
        self.recv_raw(source, tag).await
    }

    /// Starts sending `message` to `dest` and returns immediately.
    ///
    /// The message is encoded before this returns, so `message` may be
    /// dropped or reused straight away.
    pub fn isend<M: Message>(&self, message: &M, dest: usize, tag: Tag) -> Result<Request<()>> {
        self.check_rank(dest)?;
        Self::check_user_tag(tag)?;

        let envelope = self.envelope(message, dest, tag);
        debug!(rank = self.rank(), dest, tag, seq = envelope.seq, "isend issued");
        let transport = Arc::clone(&self.inner.transport);
        Ok(Request::new(tokio::spawn(async move {
            transport.deliver(envelope).await
        })))
    }

    /// Posts a receive for the next message from `source` under `tag` and
    /// returns immediately.
    pub fn irecv<M>(&self, source: usize, tag: Tag) -> Result<Request<M>>
    where
        M: Message + Default + 'static,
    {
        self.check_rank(source)?;
        Self::check_user_tag(tag)?;

        let seq = next_seq(&self.inner.posted, (source, tag));
        debug!(rank = self.rank(), source, tag, seq, "irecv posted");
        let transport = Arc::clone(&self.inner.transport);
        Ok(Request::new(tokio::spawn(async move {
            let payload = transport.receive(source, tag, seq).await?;
            Ok(M::decode(payload.as_slice())?)
        })))
    }

    async fn send_raw<M: Message>(&self, message: &M, dest: usize, tag: Tag) -> Result<()> {
        let envelope = self.envelope(message, dest, tag);
        debug!(rank = self.rank(), dest, tag, seq = envelope.seq, "send");
        self.inner.transport.deliver(envelope).await
    }

    async fn recv_raw<M: Message + Default>(&self, source: usize, tag: Tag) -> Result<M> {
        let seq = next_seq(&self.inner.posted, (source, tag));
        let payload = self.inner.transport.receive(source, tag, seq).await?;
        debug!(rank = self.rank(), source, tag, seq, "recv");
        Ok(M::decode(payload.as_slice())?)
    }

    // ========================================================================
    // Collectives
    // ========================================================================

    /// Returns once every rank of the group has called `barrier`.
    pub async fn barrier(&self) -> Result<()> {
        const ROOT: usize = 0;
        if self.rank() == ROOT {
            for peer in self.peers(ROOT) {
                self.recv_raw::<()>(peer, BARRIER_TAG).await?;
            }
            for peer in self.peers(ROOT) {
                self.send_raw(&(), peer, BARRIER_TAG).await?;
            }
        } else {
            self.send_raw(&(), ROOT, BARRIER_TAG).await?;
            self.recv_raw::<()>(ROOT, BARRIER_TAG).await?;
        }
        Ok(())
    }

    /// Copies `value` from `root` into `value` on every other rank.
    pub async fn broadcast<M: Message + Default>(&self, value: &mut M, root: usize) -> Result<()> {
        self.check_rank(root)?;
        if self.rank() == root {
            for peer in self.peers(root) {
                self.send_raw(value, peer, BROADCAST_TAG).await?;
            }
        } else {
            *value = self.recv_raw(root, BROADCAST_TAG).await?;
        }
        self.barrier().await
    }

    /// Hands part `i` of `parts` to rank `i` and returns this rank's part.
    ///
    /// `parts` is only read at `root`, where it must hold exactly one part per
    /// rank; other ranks pass `None`.
    pub async fn scatter<M: Message + Default>(&self, parts: Option<Vec<M>>, root: usize) -> Result<M> {
        self.check_rank(root)?;
        let own = if self.rank() == root {
            let parts = parts.unwrap_or_default();
            if parts.len() != self.size() {
                return Err(Error::InvalidCount {
                    expected: self.size(),
                    actual: parts.len(),
                });
            }

            let mut own = None;
            for (peer, part) in parts.into_iter().enumerate() {
                if peer == root {
                    own = Some(part);
                } else {
                    self.send_raw(&part, peer, SCATTER_TAG).await?;
                }
            }
            own.unwrap_or_default()
        } else {
            self.recv_raw(root, SCATTER_TAG).await?
        };
        self.barrier().await?;
        Ok(own)
    }

    /// Collects `value` from every rank at `root`, in rank order.
    ///
    /// Returns `Some` at `root` and `None` everywhere else.
    pub async fn gather<M: Message + Default + Clone>(&self, value: &M, root: usize) -> Result<Option<Vec<M>>> {
        self.check_rank(root)?;
        let gathered = if self.rank() == root {
            let mut parts = Vec::with_capacity(self.size());
            for peer in 0..self.size() {
                if peer == root {
                    parts.push(value.clone());
                } else {
                    parts.push(self.recv_raw(peer, GATHER_TAG).await?);
                }
            }
            Some(parts)
        } else {
            self.send_raw(value, root, GATHER_TAG).await?;
            None
        };
        self.barrier().await?;
        Ok(gathered)
    }

    /// Collects `value` from every rank on every rank, in rank order.
    pub async fn all_gather<M>(&self, value: &M) -> Result<Vec<M>>
    where
        M: Message + Default + Clone + 'static,
    {
        let mut sends = Vec::with_capacity(self.size());
        for peer in self.peers(self.rank()) {
            let envelope = self.envelope(value, peer, ALL_GATHER_TAG);
            let transport = Arc::clone(&self.inner.transport);
            sends.push(tokio::spawn(async move { transport.deliver(envelope).await }));
        }

        let mut parts = Vec::with_capacity(self.size());
        for peer in 0..self.size() {
            if peer == self.rank() {
                parts.push(value.clone());
            } else {
                parts.push(self.recv_raw(peer, ALL_GATHER_TAG).await?);
            }
        }

        for send in sends {
            send.await??;
        }
        Ok(parts)
    }

    fn peers(&self, except: usize) -> impl Iterator<Item = usize> + use<> {
        (0..self.size()).filter(move |&peer| peer != except)
    }
}
