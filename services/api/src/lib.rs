//! services/api/src/lib.rs
//!
//! Library surface of the `api` service: configuration, the shared snapshot
//! cache, the port adapters (Codeforces, Postgres, SES), and the web layer.

pub mod adapters;
pub mod cache;
pub mod config;
pub mod error;
pub mod web;
