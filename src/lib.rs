pub mod backend;
pub mod config;
pub mod error;
pub mod logging;
pub mod password;
pub mod provider;
pub mod query;
pub mod repository;
pub mod resource;

// Re-export commonly used types for easier access
pub use backend::UserRecord;
pub use error::{AppError, AppResult};
pub use provider::ProviderRegistry;
pub use query::{Pageable, SearchCriteria};
pub use repository::UserRepository;
