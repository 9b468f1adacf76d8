//! Core types for diwire
//!
//! This module holds the error taxonomy shared by the model, the container builder,
//! the compiler passes and the CLI.
//!
//! # Error Management
//!
//! - **Strongly-typed errors** ([`DiError`]) returned by every library operation
//! - **User-friendly contexts** ([`ErrorContext`]) with actionable suggestions for CLI users
//! - [`user_friendly_error`] converts any `anyhow::Error` into a displayable context
//!
//! # Examples
//!
//! ```rust
//! use diwire::core::{DiError, ErrorContext};
//!
//! fn create_helpful_error() -> ErrorContext {
//!     ErrorContext::new(DiError::AlreadyCompiled)
//!         .with_suggestion("Build a new container builder")
//! }
//!
//! let ctx = create_helpful_error();
//! assert!(ctx.to_string().contains("already been compiled"));
//! ```

pub mod error;

pub use error::{DiError, ErrorContext, Result, user_friendly_error};
