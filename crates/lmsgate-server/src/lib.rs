pub mod bootstrap;
pub mod config;
pub mod handlers;
pub mod observability;
pub mod server;

pub use bootstrap::BootstrapError;
pub use config::{
    AppConfig, LoggingConfig, PostgresStorageConfig, ServerConfig, StorageBackend, StorageConfig,
    UserConfig,
};
pub use observability::init_tracing;
pub use server::{LmsgateServer, ServerBuilder, build_app, build_router};
