//! Domain model for shared lists and their ordered items.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep ordering/soft-delete semantics in one shape for every caller.
//!
//! # Invariants
//! - Deletion is represented by a `deleted_at` timestamp, not hard delete.
//! - `position` is unique among live items of the same list.

pub mod list;
