pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use auth::{AuthUser, RequireAdmin, RequireTeacher};
pub use error::{ApiError, ApiResult};
pub use routes::{create_router, ApiDoc};
pub use server::Server;
pub use state::AppState;
