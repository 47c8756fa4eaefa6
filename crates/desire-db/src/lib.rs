//! Remote document store backend for the Desire session engine.
//!
//! Holds each user's profile document and pantry-item collection in
//! PostgreSQL. The session engine talks to this crate only through the
//! `DocumentStore` adapter in `desire-core`.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
