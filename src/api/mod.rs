pub mod extractors;
pub mod handlers;
pub mod routes;
pub mod signals;

pub use handlers::*;
pub use routes::*;
pub use signals::*;
