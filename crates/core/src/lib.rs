//! Customer Registry Core - Shared types library.
//!
//! This crate provides common types used across all customer registry components:
//! - `service` - The customer resource API (axum)
//! - `cli` - Command-line tools for index bootstrap and store probes
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no store access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Customer ids, the customer resource views, and caller identity

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
