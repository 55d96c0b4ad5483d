//! svgmap - turn named SVG elements into links and keep the rendered image
//! map consistent with its inputs.
//!
//! # Module Structure
//!
//! ```text
//! svgmap/
//! ├── logger     # log!/debug! macros
//! ├── freshness  # blake3 content hashes and fingerprints
//! ├── svg        # Parse, scan ids, wrap links, normalize, serialize
//! ├── map        # ImageMap, regions, derived cache
//! ├── store      # MapStore (memory, JSON directory)
//! ├── engine     # Entry points and lazy getters
//! └── config     # svgmap.toml
//! ```

// Must come first so the macros are visible to every module below
#[macro_use]
pub mod logger;

pub mod config;
pub mod engine;
pub mod freshness;
pub mod map;
pub mod store;
pub mod svg;

#[cfg(test)]
mod fixtures;

pub use engine::{Engine, EngineError};
