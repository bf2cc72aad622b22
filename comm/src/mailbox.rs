//! Per-rank store of arrived payloads awaiting a matching receive.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio::sync::Notify;

use crate::{Error, Tag};

/// Identifies one message: who sent it, under which tag, and its position in
/// the sender's stream for that tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub source: usize,
    pub tag: Tag,
    pub seq: u64,
}

#[derive(Default)]
struct State {
    slots: HashMap<Slot, Vec<u8>>,
    closed: bool,
}

pub struct Mailbox {
    state: Mutex<State>,
    arrived: Notify,
}

impl Mailbox {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            arrived: Notify::new(),
        }
    }

    /// Stores `payload` for a later `take`.
    ///
    /// A slot is filled at most once per run; a second envelope for an
    /// occupied slot is rejected and the stored payload is kept.
    pub fn deposit(&self, slot: Slot, payload: Vec<u8>) -> Result<(), Error> {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.slots.contains_key(&slot) {
                return Err(Error::DuplicateMessage {
                    source: slot.source,
                    tag: slot.tag,
                    seq: slot.seq,
                });
            }
            state.slots.insert(slot, payload);
        }
        self.arrived.notify_waiters();
        Ok(())
    }

    /// Fails every pending and future `take`.
    pub fn close(&self) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).closed = true;
        self.arrived.notify_waiters();
    }

    /// Waits until the payload for `slot` has arrived and removes it.
    pub async fn take(&self, slot: Slot) -> Result<Vec<u8>, Error> {
        loop {
            let arrived = self.arrived.notified();
            tokio::pin!(arrived);
            arrived.as_mut().enable();

            {
                let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(payload) = state.slots.remove(&slot) {
                    return Ok(payload);
                }
                if state.closed {
                    return Err(Error::ConnectionClosed);
                }
            }

            arrived.await;
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).slots.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}
