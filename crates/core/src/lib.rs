//! MegaStore Core - Shared types library.
//!
//! This crate provides common types used across all MegaStore components:
//! - `storefront` - Public-facing storefront (catalog, product detail, cart)
//! - `cli` - Command-line tools for seeding and store checks
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no store
//! access. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and prices

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
