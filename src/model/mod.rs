pub mod actor;
pub mod common;
pub mod entity;
pub mod form;

pub use actor::*;
pub use common::*;
pub use entity::*;
pub use form::*;
