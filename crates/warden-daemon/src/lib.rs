//! # warden-daemon
//!
//! Supervisor core for warden: owns the roster of managed processes, their
//! lifecycle (start, stop, exit observation), captured output, and periodic
//! HTTP health probing, and exposes it all over a small axum control API.
//!
//! All shared state lives in one map behind a single reader/writer lock;
//! background tasks (output capture, exit waiters, the health ticker) mutate
//! records through short, independently locked writes and never hold the
//! lock across spawns, pipe reads, process waits, or network probes.

pub mod api;
pub mod output;
pub mod probe;
pub mod supervisor;

pub use supervisor::Supervisor;
