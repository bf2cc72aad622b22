//! Store-and-forward relay that lets ranks running in separate processes
//! exchange messages.
//!
//! Every envelope posted to the relay is appended to a SQLite table and
//! streamed to the subscriber registered for its `(session, dest)` pair.
//! Subscribers resume from the last ordinal they saw, so a reconnecting rank
//! never misses or duplicates an envelope.

pub mod db;
pub mod grpc;
pub mod models;
pub mod storage;
