//! Background subscription that feeds a rank's mailbox from the relay.

use std::sync::Arc;

use futures_util::StreamExt;
use matrix_mpi_types::relay::relay_client::RelayClient;
use matrix_mpi_types::relay::{Envelope, SubscribeRequest};
use tonic::Streaming;
use tonic::transport::Channel;
use tracing::{debug, trace};

use crate::Error;
use crate::mailbox::{Mailbox, Slot};

pub struct SyncTask {
    client: RelayClient<Channel>,
    mailbox: Arc<Mailbox>,
    session: String,
    rank: u32,
    last_sync: u64,
}

impl SyncTask {
    pub fn new(client: RelayClient<Channel>, mailbox: Arc<Mailbox>, session: String, rank: u32) -> Self {
        Self {
            client,
            mailbox,
            session,
            rank,
            last_sync: 0,
        }
    }

    /// Joins the session with a first subscription.
    ///
    /// Fails when this rank already joined the session, so a reused session
    /// is reported before the run sends anything.
    pub async fn join(&mut self) -> Result<Streaming<Envelope>, Error> {
        self.subscribe(false).await
    }

    /// Streams envelopes into the mailbox until the relay reports an error.
    ///
    /// A stream that ends cleanly is reopened from the last ordinal seen.
    pub async fn run(mut self, mut stream: Streaming<Envelope>) -> Result<(), Error> {
        loop {
            while let Some(result) = stream.next().await {
                self.process_envelope(result?)?;
            }
            stream = self.subscribe(true).await?;
        }
    }

    async fn subscribe(&mut self, resume: bool) -> Result<Streaming<Envelope>, Error> {
        let request = SubscribeRequest {
            session: self.session.clone(),
            rank: self.rank,
            start_ordinal: self.last_sync,
            resume,
        };
        debug!(rank = self.rank, from = self.last_sync, resume, "subscribing to relay");
        Ok(self.client.subscribe(request).await?.into_inner())
    }

    fn process_envelope(&mut self, envelope: Envelope) -> Result<(), Error> {
        if envelope.ordinal <= self.last_sync {
            return Ok(());
        }
        self.last_sync = envelope.ordinal;

        trace!(
            rank = self.rank,
            ordinal = envelope.ordinal,
            source = envelope.source,
            tag = envelope.tag,
            seq = envelope.seq,
            "envelope arrived"
        );
        let slot = Slot {
            source: envelope.source as usize,
            tag: envelope.tag,
            seq: envelope.seq,
        };
        self.mailbox.deposit(slot, envelope.payload)
    }
}
