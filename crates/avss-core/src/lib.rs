//! # AVSS Core
//!
//! An asynchronous distributed key generation in which every shareholder deals
//! a Pedersen-committed sharing of a random secret over an atomic broadcast
//! channel. It tolerates `f` faulty shareholders as long as `f < k <= n - 2f`,
//! where `k` shares are needed to reconstruct the distributed secret.
//!
//! The protocol is a synchronous state machine ([`primitives::Shareholder`])
//! which is either driven by hand or wrapped into a threaded [`Node`].
//! [`run_local`] runs a whole group inside one process.

/// Broadcast channel trait and an in-memory implementation
mod board;
pub use board::{BroadcastChannel, InMemoryBoard};

mod config;
pub use config::Config;

/// Shareholders driven by worker threads
mod node;
pub use node::Node;

/// Running a whole group in-process
mod local;
pub use local::{run_local, DkgSummary, NodeSummary};

/// Low level primitives and datatypes of the DKG
pub mod primitives;

#[cfg(test)]
mod test_helpers;
