//! Core types and decision logic for the leadsync lead pipeline.
//!
//! This crate is deliberately free of HTTP and database dependencies. Input
//! codecs (`leadsync-ingest`) and destination stores (`leadsync-store-sqlite`,
//! `leadsync-hubspot`) depend on it; it depends on nothing proprietary.
//!
//! Data flows one way:
//!
//! ```text
//! raw rows ─ normalize ─ classify ─ dedup ─ chunked writes ─ events
//! ```

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod classify;
pub mod context;
pub mod dedup;
pub mod error;
pub mod model;
pub mod normalize;
pub mod notify;
pub mod pipeline;
pub mod source;
pub mod store;

pub use error::{Error, Result};
