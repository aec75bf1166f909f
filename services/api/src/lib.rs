//! Catalogue, reviews and comments for the YaMDb review service.
//!
//! The library holds everything the `api` server and the `import_csv` tool
//! share: models, repositories, the permission layer and the HTTP routes.

pub mod error;
pub mod importer;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod permissions;
pub mod repositories;
pub mod routes;
pub mod settings;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use settings::Settings;
pub use state::AppState;
