// src/core/mod.rs

/// Records, stage outputs and the fixed strings written into records.
pub mod models;

/// Typed errors for each pipeline stage, the store and the worker pool.
pub mod error;

/// The record store contract and its in-memory implementation.
pub mod store;

/// The bounded worker pool analyses and link probes run on.
pub mod pool;

/// One module per pipeline stage (page, links, TLS, DNS, headers).
pub mod scanner;

/// Turns stage results into the 0-100 health score.
pub mod scoring;

/// Sequences the stages for one analysis and persists progress.
pub mod pipeline;
