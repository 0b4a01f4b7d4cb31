pub mod color_spec;
pub mod coordinator;
pub mod field_mapper;
pub mod identity;
pub mod modal_state;
pub mod notifier;
pub mod validation;

pub use coordinator::*;
pub use field_mapper::*;
pub use identity::*;
pub use modal_state::*;
pub use notifier::*;
pub use validation::*;
