//! Unit test suite for diwire
//!
//! Library-level tests driving the full compiler pipeline on containers built in code
//! or loaded from files, without spawning the binary.
//!
//! ```bash
//! cargo test --test unit
//! ```

mod extensions;
mod loading;
mod pipeline;
