pub mod common;
pub mod test_definition;

pub use common::*;
pub use test_definition::*;
