//! Freqlimit - Distributed Sliding-Window Frequency Limiter
//!
//! This crate answers "has subject S performed fewer than L actions within the
//! trailing window of duration W?" and records new actions when permitted.
//! State lives in a shared Redis store so that multiple service instances
//! enforce one combined budget instead of per-process counters.

pub mod config;
pub mod error;
pub mod limit;
pub mod store;
