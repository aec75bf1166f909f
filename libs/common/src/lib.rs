//! Shared plumbing for the YaMDb services.
//!
//! Both the HTTP service and the bulk import tool connect through this crate,
//! apply the schema migrations with it and classify PostgreSQL constraint
//! violations the same way.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = init_pool(&DatabaseConfig::from_env()?).await?;
//!     run_migrations(&pool).await?;
//!     assert!(health_check(&pool).await?);
//!     Ok(())
//! }
//! ```

pub mod database;
pub mod error;
