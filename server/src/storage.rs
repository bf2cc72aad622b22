use crate::models::StoredEnvelope;
use futures_util::stream::Stream;
use sqlx::{Row, SqlitePool};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const PAGE_SIZE: i64 = 100;

pub type EnvelopeStream = Pin<Box<dyn Stream<Item = Result<StoredEnvelope, StorageError>> + Send>>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("stored envelope has out-of-range field {0}")]
    Corrupt(&'static str),
}

pub struct Storage {
    pool: SqlitePool,
    appended: Arc<Notify>,
}

impl Storage {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            appended: Arc::new(Notify::new()),
        }
    }

    /// Appends an envelope and wakes every subscriber. Returns the assigned ordinal.
    pub async fn append(&self, envelope: StoredEnvelope) -> Result<u64, StorageError> {
        let row = sqlx::query(
            "INSERT INTO envelopes (session, source, dest, tag, seq, payload, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING ordinal",
        )
        .bind(&envelope.session)
        .bind(i64::from(envelope.source))
        .bind(i64::from(envelope.dest))
        .bind(i64::from(envelope.tag))
        .bind(envelope.seq as i64)
        .bind(&envelope.payload)
        .bind(envelope.timestamp)
        .fetch_one(&self.pool)
        .await?;

        let ordinal: i64 = row.get("ordinal");
        self.appended.notify_waiters();
        Ok(ordinal as u64)
    }

    /// Records `rank` as a member of `session`. Returns `false` when the rank
    /// had already joined, which means the session is being reused.
    pub async fn join(&self, session: &str, rank: u32) -> Result<bool, StorageError> {
        let result = sqlx::query("INSERT OR IGNORE INTO members (session, rank) VALUES (?, ?)")
            .bind(session)
            .bind(i64::from(rank))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Streams, forever, the envelopes of `session` addressed to `dest` with an
    /// ordinal above `ordinal`, in ordinal order.
    pub fn subscribe_from(&self, session: String, dest: u32, ordinal: u64) -> EnvelopeStream {
        let pool = self.pool.clone();
        let appended = Arc::clone(&self.appended);
        Box::pin(async_stream::try_stream! {
            let mut ordinal = ordinal as i64;

            loop {
                let wake = appended.notified();
                let rows = sqlx::query_as::<_, (i64, String, i64, i64, i64, i64, Vec<u8>, i64)>(
                    "SELECT ordinal, session, source, dest, tag, seq, payload, timestamp
                     FROM envelopes WHERE session = ? AND dest = ? AND ordinal > ?
                     ORDER BY ordinal LIMIT ?",
                )
                .bind(&session)
                .bind(i64::from(dest))
                .bind(ordinal)
                .bind(PAGE_SIZE)
                .fetch_all(&pool)
                .await?;

                if rows.is_empty() {
                    let _ = tokio::time::timeout(POLL_INTERVAL, wake).await;
                    continue;
                }

                for (ord, session, source, dest, tag, seq, payload, timestamp) in rows {
                    ordinal = ord;
                    yield StoredEnvelope {
                        ordinal: ord as u64,
                        session,
                        source: u32::try_from(source).map_err(|_| StorageError::Corrupt("source"))?,
                        dest: u32::try_from(dest).map_err(|_| StorageError::Corrupt("dest"))?,
                        tag: u32::try_from(tag).map_err(|_| StorageError::Corrupt("tag"))?,
                        seq: seq as u64,
                        payload,
                        timestamp,
                    };
                }
            }
        })
    }
}
