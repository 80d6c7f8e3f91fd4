//! Real-time git collaboration monitor.
//!
//! Ingests GitHub webhooks, normalizes them into canonical events, flags
//! likely merge conflicts between concurrently active branches, and streams
//! the results to dashboard clients over WebSocket, keeping a bounded window
//! of recent events for late joiners and statistics.

pub mod config;
pub mod conflict;
pub mod hub;
pub mod ingest;
pub mod server;
pub mod store;
pub mod types;
pub mod webhooks;

#[cfg(test)]
mod test_utils;
