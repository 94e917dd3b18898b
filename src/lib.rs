pub mod app;
pub mod backend;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;
pub mod stats;
pub mod storage;
pub mod timer;

pub use app::router;
pub use backend::{Backend, BackendKind, LocalBackend, RemoteBackend};
pub use config::Config;
pub use errors::{AppError, ServiceError, ServiceResult};
pub use services::Services;
pub use state::AppState;
pub use storage::LocalStore;
