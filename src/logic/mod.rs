pub mod test_definitions;
pub mod validate;

pub use test_definitions::*;
pub use validate::*;
