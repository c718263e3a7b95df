//! # vche-demo: In-Process Verifiable Evaluation Sessions
//!
//! Runs the client and the server halves of a verifiable inner product in
//! one process, optionally with a server that corrupts its result.
//!
//! ## Architecture
//!
//! - **`config`**: Session configuration (scheme, slots, modulus, replication), JSON or flags
//! - **`session`**: Key generation, packing, lockstep evaluation and the verifying decode

pub mod config;
pub mod session;
