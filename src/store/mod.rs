pub mod external;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use external::*;
pub use memory::*;
pub use postgres::*;
pub use traits::*;
