// Realtime hub client modules
//
// Long-polling session protocol: an ordered handshake (authenticate,
// negotiate, connect, subscribe) followed by cursor-threaded polls and an
// explicit abort. Steps never retry; retry policy belongs to the caller.

pub mod client;
pub mod handshake;
pub mod models;
pub mod poll;

pub use client::{DEFAULT_BASE_URL, SessionClient};
pub use models::Envelope;
