//! Marigold Core - Shared types library.
//!
//! This crate provides common types used across all Marigold components:
//! - `backend` - HTTP API and queue-ingestion worker
//! - `integration-tests` - cross-crate behavior tests
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Entity keys, concurrency tokens, order status
//! - [`entities`] - Domain records stored in the entity store
//! - [`api`] - Request/response payloads for the HTTP surface
//! - [`message`] - Schema-tolerant queue message decoding

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod entities;
pub mod message;
pub mod types;

pub use entities::*;
pub use types::*;
