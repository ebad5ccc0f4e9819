pub mod error;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod reload;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use observability::{apply_logging_level, init_tracing};
pub use reload::{reload_runtime, spawn_config_reloader};
pub use server::{ServerBuilder, SolrgateServer, build_app};
pub use state::{AppState, Runtime, RuntimeError};
