pub mod assembler;
pub mod types;

pub use assembler::AggregationAssembler;
pub use types::*;
