//! Core types for the customer registry.
//!
//! This module provides type-safe wrappers for the customer domain.

pub mod customer;
pub mod id;
pub mod identity;

pub use customer::{Customer, CustomerPayload};
pub use id::*;
pub use identity::{CallerIdentity, VerifiedCredential};
