//! Query node model and its assembler

pub mod assembler;
pub mod types;

pub use assembler::QueryAssembler;
pub use types::*;
