//! Bazaar gateway library.
//!
//! A single tool surface in front of many marketplace providers: one
//! capability registry decides which provider serves which tool, search and
//! compare fan out across providers, carts stay with the provider that owns
//! them, and checkout sessions are driven through a persisted state machine.
//!
//! The binary in `main.rs` wires these modules behind an axum router; the
//! library is what the integration tests drive.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod mapping;
pub mod middleware;
pub mod providers;
pub mod registry;
pub mod routes;
pub mod services;
pub mod state;
pub mod tools;

pub use error::{ErrorCode, ToolError};
pub use tools::{ToolRegistry, ToolResponse};
