//! Business logic services for the customer API.
//!
//! # Services
//!
//! - `customers` - Customer resource manager (self-service authorization, uniqueness)
//! - `fallback` - Fallback guard for degraded store reads

pub mod customers;
pub mod fallback;

pub use customers::{CustomerError, CustomerService};
pub use fallback::FallbackGuard;
