pub mod config;
pub mod credential;
pub mod error;
pub mod models;
pub mod moderation;
pub mod openapi;
pub mod projection;
pub mod repo;
pub mod routes;
pub mod security;
pub mod store;

// Re-export commonly used items for tests / external users
pub use routes::{config, AppState};
pub use security::SecurityHeaders;
pub use store::{BoardStore, StoreError};
