//! Core types for graphclean.

mod label;
mod node;
mod operation;

pub use label::*;
pub use node::*;
pub use operation::*;
