use chrono::Utc;

/// An envelope as persisted by the relay.
#[derive(Debug, Clone)]
pub struct StoredEnvelope {
    pub ordinal: u64,
    pub session: String,
    pub source: u32,
    pub dest: u32,
    pub tag: u32,
    pub seq: u64,
    pub payload: Vec<u8>,
    pub timestamp: i64,
}

impl StoredEnvelope {
    pub fn new(session: String, source: u32, dest: u32, tag: u32, seq: u64, payload: Vec<u8>) -> Self {
        Self {
            ordinal: 0,
            session,
            source,
            dest,
            tag,
            seq,
            payload,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}
