pub mod catalog;
pub mod config_manager;
pub mod dashboard;
pub mod error;
pub mod prompts;
pub mod questions;
pub mod security;
pub mod store;
pub mod text;
pub mod types;
pub mod users;
pub mod validation;

pub use catalog::CatalogService;
pub use config_manager::*;
pub use dashboard::DashboardService;
pub use error::*;
pub use prompts::PromptService;
pub use questions::QuestionService;
pub use security::{AuthContext, SecurityError, SecurityEvent, SecurityLogger, TokenService};
pub use store::{Collection, Database, DocumentStore, JsonFileStore, MemoryStore};
pub use types::*;
pub use users::UserService;
