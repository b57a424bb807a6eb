//! Lumen Core
//!
//! Ambient utilities for the Lumen rendering crates: logging setup,
//! puffin profiling hooks and the hash collections used across the workspace.

pub mod alloc;
pub mod logging;
pub mod profiling;
