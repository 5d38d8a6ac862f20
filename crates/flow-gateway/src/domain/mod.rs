//! Domain types for the flow gateway.

pub mod config;
pub mod envelope;
pub mod error;
pub mod pricing;
