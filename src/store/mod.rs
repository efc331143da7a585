//! Hierarchical state: path parsing, intersection, and the value tree.

mod path;
mod state_store;

pub use path::*;
pub use state_store::*;

#[cfg(test)]
mod path_test;
