//! # CoachFlow Gateway Test Suite
//!
//! Unified test crate exercising the full exchange pipeline from the
//! remote client's side: envelopes are encrypted the way the platform
//! encrypts them, POSTed through the real router, and responses are
//! opened with the flipped IV.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p flow-tests
//! cargo test -p flow-tests integration::
//! ```

#![allow(dead_code)]

pub mod integration;
