//! Authentication service models

pub mod role;
pub mod user;

// Re-export for convenience
pub use role::{Capability, Role};
pub use user::{NewUser, UpdateUser, User};
