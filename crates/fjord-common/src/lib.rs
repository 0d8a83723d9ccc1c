//! Shared types used across the Fjord crates.

pub mod module_graph;
pub mod symbol;

pub use symbol::Symbol;
