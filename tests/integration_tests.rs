//! Integration tests entry point
//!
//! Includes all integration test modules from the integration/
//! subdirectory so they build as one test binary.

mod integration;
