use crate::models::StoredEnvelope;
use crate::storage::Storage;
use futures_util::stream::{Stream, StreamExt};
use matrix_mpi_types::relay::relay_server::{Relay, RelayServer};
use matrix_mpi_types::relay::{Envelope, PostAck, SubscribeRequest};
use std::pin::Pin;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct RelayServiceImpl {
    storage: Arc<Storage>,
}

impl RelayServiceImpl {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

type SubscribeStream = Pin<Box<dyn Stream<Item = Result<Envelope, Status>> + Send>>;

#[tonic::async_trait]
impl Relay for RelayServiceImpl {
    type SubscribeStream = SubscribeStream;

    async fn post(&self, request: Request<Envelope>) -> Result<Response<PostAck>, Status> {
        let env = request.into_inner();
        let stored = StoredEnvelope::new(
            env.session,
            env.source,
            env.dest,
            env.tag,
            env.seq,
            env.payload,
        );

        let ordinal = self
            .storage
            .append(stored)
            .await
            .map_err(|e| Status::internal(e.to_string()))?;

        debug!(
            ordinal,
            source = env.source,
            dest = env.dest,
            tag = env.tag,
            seq = env.seq,
            "envelope stored"
        );
        Ok(Response::new(PostAck { ordinal }))
    }

    async fn subscribe(
        &self,
        request: Request<SubscribeRequest>,
    ) -> Result<Response<Self::SubscribeStream>, Status> {
        let req = request.into_inner();
        if !req.resume {
            let joined = self
                .storage
                .join(&req.session, req.rank)
                .await
                .map_err(|e| Status::internal(e.to_string()))?;
            if !joined {
                warn!(session = %req.session, rank = req.rank, "session reused");
                return Err(Status::already_exists(format!(
                    "rank {} already joined session {:?}; start a new run with a new session",
                    req.rank, req.session
                )));
            }
        }
        debug!(session = %req.session, rank = req.rank, from = req.start_ordinal, "subscriber attached");
        let stream = self
            .storage
            .subscribe_from(req.session, req.rank, req.start_ordinal);

        let output = async_stream::stream! {
            let mut db_stream = stream;
            while let Some(result) = db_stream.next().await {
                match result {
                    Ok(record) => {
                        yield Ok(Envelope {
                            ordinal: record.ordinal,
                            session: record.session,
                            source: record.source,
                            dest: record.dest,
                            tag: record.tag,
                            seq: record.seq,
                            payload: record.payload,
                            timestamp: record.timestamp,
                        });
                    }
                    Err(e) => {
                        warn!("subscription failed: {}", e);
                        yield Err(Status::internal(format!("Stream error: {}", e)));
                        break;
                    }
                }
            }
        };

        Ok(Response::new(Box::pin(output)))
    }
}

pub fn create_server(storage: Arc<Storage>) -> RelayServer<RelayServiceImpl> {
    RelayServer::new(RelayServiceImpl::new(storage))
}
