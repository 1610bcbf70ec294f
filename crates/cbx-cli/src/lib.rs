//! Command-line surface of the cbx toolkit.
//!
//! The argument tree lives here so completions and the binary share one
//! definition.

pub mod cli;
