//! Core domain logic for Listling shared lists.
//! This crate is the single source of truth for ordering and restore invariants.

pub mod auth;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use auth::init_data::{verify_init_data, InitDataError, WebAppUser};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::list::{List, ListId, ListItem, ListItemId, UserId};
pub use repo::item_repo::{
    ItemListQuery, ItemRepoError, ItemRepoResult, ItemRepository, SqliteItemRepository,
};
pub use repo::list_repo::{ListRepoError, ListRepoResult, ListRepository, SqliteListRepository};
pub use service::list_service::{ListService, ServiceError, ServiceResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
