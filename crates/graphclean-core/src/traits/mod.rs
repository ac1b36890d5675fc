//! Core traits for graphclean store drivers.

mod graph_store;

pub use graph_store::*;
