//! Hash collections used across Lumen.
//!
//! Re-exports of the AHash-backed map and set. Hot lookups in the batcher
//! (texture registry, bind group cache, pipeline registry) go through these.

pub use ahash::{AHashMap as HashMap, AHashSet as HashSet, RandomState};
