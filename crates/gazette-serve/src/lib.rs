//! Gazette Serve - HTTP trigger surface for the feed pipeline.
//!
//! This crate exposes the poll → ingest → enrich chain over HTTP and a
//! daily schedule loop. It owns no pipeline logic of its own: handlers
//! build the components from `gazette-ingest` around the injected client
//! bundle in [`AppState`] and run them to completion per invocation.
//!
//! # Architecture
//!
//! - **AppState**: Shared state (client bundle, feed list, checkpoint,
//!   staged entries)
//! - **Routes**: Health probe plus run/collect/summarize triggers
//! - **Chain**: The phase orchestration shared by HTTP and the scheduler
//! - **Schedule**: Daily 06:00 UTC trigger

pub mod chain;
mod error;
mod routes;
pub mod schedule;
mod state;

pub use self::chain::{collect, run_chain, summarize, ChainOutcome, CollectOutcome};
pub use self::error::ApiError;
pub use self::routes::router;
pub use self::state::{AppState, Config};
