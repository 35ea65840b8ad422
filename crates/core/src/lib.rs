//! La Vega Core - Shared domain types.
//!
//! This crate provides the types shared by every La Vega component:
//! - `admin` - Order management backend (HTTP API, import, reports, backup)
//! - `cli` - Command-line tools for migrations, imports and report generation
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP. Enable the `sqlite` feature to get `sqlx` encode/decode support.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, order numbers and order lifecycle status

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
