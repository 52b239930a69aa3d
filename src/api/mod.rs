pub mod handlers;
pub mod routes;
pub mod scope_extractor;

pub use handlers::*;
pub use routes::*;
pub use scope_extractor::*;
