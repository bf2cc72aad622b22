//! The seam between the communicator and the medium messages travel over.

use async_trait::async_trait;

use crate::mailbox::Slot;
use crate::{Result, Tag};

/// One message in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub source: usize,
    pub dest: usize,
    pub tag: Tag,
    pub seq: u64,
    pub payload: Vec<u8>,
}

impl Envelope {
    pub(crate) fn slot(&self) -> Slot {
        Slot {
            source: self.source,
            tag: self.tag,
            seq: self.seq,
        }
    }
}

/// Moves envelopes between ranks.
///
/// A transport instance belongs to one rank: `deliver` carries an envelope to
/// `envelope.dest`, and `receive` waits for an envelope addressed to the
/// owning rank.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, envelope: Envelope) -> Result<()>;

    async fn receive(&self, source: usize, tag: Tag, seq: u64) -> Result<Vec<u8>>;
}
