//! Command-line interface module.

mod args;
pub mod file;
pub mod map;

pub use args::{Cli, Commands, MapCommand};
