//! Integration test crate for ringscan.
//!
//! This crate has no library code — it only contains integration tests
//! that crawl a simulated swarm end to end across the workspace crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p ringscan-integration-tests
//! ```
