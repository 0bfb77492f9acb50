//! Core types shared by every writenode module.
//!
//! Currently this is the error taxonomy: strongly typed errors for library
//! callers ([`WriteNodeError`], [`PathComputationError`]) and the
//! [`ErrorContext`] wrapper the CLI uses to show actionable messages.

pub mod error;

pub use error::{ErrorContext, PathComputationError, WriteNodeError, user_friendly_error};
