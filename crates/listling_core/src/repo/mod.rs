//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define position-aware data access contracts over list storage.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Multi-step position mutations run inside one immediate transaction.
//! - Repository APIs return semantic errors (`ItemNotFound`,
//!   `NothingToRestore`) in addition to DB transport errors.

pub mod item_repo;
pub mod list_repo;

pub(crate) fn now_epoch_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
