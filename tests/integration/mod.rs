//! Integration test suite for diwire
//!
//! End-to-end tests running the `diwire` binary against container files written to
//! temporary directories.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! - **compile**: compile command, dump formats and output files
//! - **list**: list command and tag filtering
//! - **validate**: validate command, exit codes and JSON reports

#[path = "../common/mod.rs"]
mod common;

mod compile;
mod list;
mod validate;
