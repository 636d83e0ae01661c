//! Adapters implementing the [`Adapter`](crate::Adapter) port.
//!
//! `memory` keeps everything in process and is what tests and demos run
//! against. `deadline` wraps any adapter with a per-operation timeout.
//! Backends with real storage will live in separate crates.

pub mod deadline;
pub mod memory;
