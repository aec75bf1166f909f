//! User accounts and token authentication for the review service.
//!
//! Users sign up with an email and username, receive a confirmation code by
//! mail and exchange it for a JWT access token.

pub mod confirmation;
pub mod error;
pub mod jwt;
pub mod mailer;
pub mod models;
pub mod rate_limiter;
pub mod repositories;
pub mod routes;
pub mod validation;

pub use error::{AuthError, AuthResult};
pub use routes::{AuthState, create_router};
