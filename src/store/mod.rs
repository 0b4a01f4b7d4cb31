pub mod actor_store;
pub mod error;
pub mod lookup_cache;
pub mod memory;
pub mod rest;
pub mod traits;

pub use actor_store::*;
pub use error::*;
pub use lookup_cache::*;
pub use memory::*;
pub use rest::*;
pub use traits::*;
