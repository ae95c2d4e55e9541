//! Marigold Backend library.
//!
//! This crate provides the backend functionality as a library, allowing it
//! to be tested and reused. The `marigold-backend` binary wires the
//! production storage backends (PostgreSQL entity store and queue,
//! filesystem blob and file stores) into the same components the test
//! suites drive with in-memory backends.
//!
//! # Modules
//!
//! - [`config`] - Environment configuration loaded once at startup
//! - [`storage`] - Entity store, order queue, blob store, and file share
//! - [`ingest`] - Queue ingestion pipeline and its worker loop
//! - [`services`] - Upload coordination (blob + metadata dual write)
//! - [`routes`] - HTTP surface
//! - [`state`] - Shared application state
//! - [`error`] - Unified application error type

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod ingest;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;
