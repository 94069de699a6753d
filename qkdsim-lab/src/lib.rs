//! Library surface for the `qkdsim-lab` binary.
//!
//! The binary re-exports its config parser and campaign driver so doctests
//! and runnable examples can link against them. This keeps the CLI thin
//! while letting other workspace crates reuse the lab logic as a regular
//! library.

pub mod config;
pub mod service;
