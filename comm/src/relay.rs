//! Transport that routes envelopes through a relay server, so ranks can live
//! in separate processes or on separate hosts.

use std::sync::Arc;

use async_trait::async_trait;
use matrix_mpi_types::relay;
use matrix_mpi_types::relay::relay_client::RelayClient;
use tokio::task::JoinHandle;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, error};

use crate::communicator::Communicator;
use crate::error::{Error, Result};
use crate::mailbox::{Mailbox, Slot};
use crate::sync::SyncTask;
use crate::transport::{Envelope, Transport};
use crate::Tag;

/// A rank's connection to a relay server.
///
/// Sends are posted to the relay; a background task subscribes to everything
/// the relay holds for this rank in the session and keeps a local mailbox
/// filled. If that subscription fails, the mailbox is closed and every
/// pending or later receive fails with [`Error::ConnectionClosed`].
///
/// # Example
///
/// ```no_run
/// use comm::{Communicator, RelayTransport};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), comm::Error> {
///     let transport = RelayTransport::connect("localhost:50051", 0, "demo").await?;
///     let world = Communicator::new(0, 2, Arc::new(transport))?;
///
///     world.send(&"hello".to_string(), 1, 0).await?;
///     Ok(())
/// }
/// ```
pub struct RelayTransport {
    client: RelayClient<Channel>,
    mailbox: Arc<Mailbox>,
    session: String,
    rank: usize,
    sync_handle: JoinHandle<()>,
}

impl RelayTransport {
    /// Connects to a relay and starts receiving envelopes addressed to `rank`
    /// within `session`.
    ///
    /// # Arguments
    ///
    /// * `addr` - Relay address (e.g., `"localhost:50051"`)
    /// * `rank` - The rank this transport receives for
    /// * `session` - Run identifier; ranks only see envelopes of their own session
    ///
    /// A session holds one run. Connecting a rank that already joined
    /// `session` fails with an `ALREADY_EXISTS` status, so envelopes left over
    /// from an earlier run are never matched against a new one.
    pub async fn connect(addr: impl Into<ServerAddr>, rank: usize, session: impl Into<String>) -> Result<Self> {
        let server_addr = addr.into();
        let session = session.into();
        let endpoint = Endpoint::from_shared(format!("http://{}", server_addr.0))?;
        let channel = endpoint.connect().await?;
        let client = RelayClient::new(channel);

        let mailbox = Arc::new(Mailbox::new());
        let wire_rank = wire_u32(rank)?;

        let mut sync_task = SyncTask::new(client.clone(), Arc::clone(&mailbox), session.clone(), wire_rank);
        let stream = sync_task.join().await?;
        let sync_mailbox = Arc::clone(&mailbox);
        let sync_handle = tokio::spawn(async move {
            if let Err(e) = sync_task.run(stream).await {
                error!("relay subscription for rank {} failed: {}", wire_rank, e);
                sync_mailbox.close();
            }
        });

        debug!(addr = %server_addr.0, rank, session = %session, "connected to relay");
        Ok(Self {
            client,
            mailbox,
            session,
            rank,
            sync_handle,
        })
    }

    /// Connects and wraps the transport into a communicator for a group of
    /// `size` ranks.
    pub async fn communicator(
        addr: impl Into<ServerAddr>,
        rank: usize,
        size: usize,
        session: impl Into<String>,
    ) -> Result<Communicator> {
        let transport = Self::connect(addr, rank, session).await?;
        Communicator::new(rank, size, Arc::new(transport))
    }
}

#[async_trait]
impl Transport for RelayTransport {
    async fn deliver(&self, envelope: Envelope) -> Result<()> {
        let post = relay::Envelope {
            session: self.session.clone(),
            source: wire_u32(envelope.source)?,
            dest: wire_u32(envelope.dest)?,
            tag: envelope.tag,
            seq: envelope.seq,
            payload: envelope.payload,
            ..Default::default()
        };

        let ack = self.client.clone().post(post).await?.into_inner();
        debug!(
            rank = self.rank,
            dest = envelope.dest,
            ordinal = ack.ordinal,
            "envelope posted"
        );
        Ok(())
    }

    async fn receive(&self, source: usize, tag: Tag, seq: u64) -> Result<Vec<u8>> {
        self.mailbox.take(Slot { source, tag, seq }).await
    }
}

impl Drop for RelayTransport {
    fn drop(&mut self) {
        self.sync_handle.abort();
    }
}

fn wire_u32(rank: usize) -> Result<u32> {
    u32::try_from(rank).map_err(|_| Error::InvalidRank {
        rank,
        size: u32::MAX as usize,
    })
}

/// Server address wrapper for type-safe connection.
#[derive(Clone)]
pub struct ServerAddr(pub String);

impl From<String> for ServerAddr {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ServerAddr {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
