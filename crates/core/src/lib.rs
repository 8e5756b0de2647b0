//! Bazaar Core - Canonical commerce types.
//!
//! This crate provides the vocabulary shared by every Bazaar component:
//! - `gateway` - Federated tool gateway in front of marketplace providers
//! - `integration-tests` - Fake providers and cross-module tests
//!
//! # Architecture
//!
//! The core crate contains only types and pure computations - no I/O, no
//! database access, no HTTP clients. Provider adapters translate their own
//! payloads into these canonical shapes before anything else sees them.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, capability and status enums
//! - [`model`] - Products, carts, checkout sessions, orders, and addresses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod model;
pub mod types;

pub use model::*;
pub use types::*;
