//! Core types for La Vega.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod order_number;
pub mod status;

pub use id::*;
pub use order_number::{OrderNumber, OrderNumberError};
pub use status::*;
