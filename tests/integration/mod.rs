//! Integration test suite for writenode
//!
//! End-to-end tests driving the write-node handler through an in-memory host
//! the way a compositing application would, plus command-line tests running
//! the real binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **path_computation**: Computing paths from script, output and context
//! - **locking**: Lock detection, resets, re-entrancy and render suppression
//! - **lifecycle**: Node creation, profiles, output names, saves and loads
//! - **files_on_disk**: Listing rendered frames
//! - **cli**: The `writenode` command line

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod cli;
mod files_on_disk;
mod lifecycle;
mod locking;
mod path_computation;
