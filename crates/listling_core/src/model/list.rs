//! List and list-item domain records.
//!
//! # Responsibility
//! - Define the canonical records for lists, items, and lifecycle helpers.
//!
//! # Invariants
//! - `ListItem::deleted_at` is the source of truth for tombstone state.
//! - A deleted item keeps its saved `position` until restored.

use serde::{Deserialize, Serialize};

/// Stable identifier of a list (SQLite rowid).
pub type ListId = i64;

/// Stable identifier of a list item (SQLite rowid).
pub type ListItemId = i64;

/// Numeric identity of an acting user, as asserted by the chat platform.
pub type UserId = i64;

/// A shared to-do/shopping list.
///
/// Lists are created by a user action and are never structurally deleted;
/// visibility is governed by ownership grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    pub id: ListId,
    pub name: String,
}

/// One entry of a list with its rank among live siblings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: ListItemId,
    #[serde(rename = "listId")]
    pub list_id: ListId,
    pub name: String,
    /// Identity that created (and may undo-restore) this item.
    #[serde(rename = "createdBy")]
    pub created_by: UserId,
    /// 1-based rank among the live items of the list.
    pub position: i64,
    /// Soft-delete marker: unix epoch milliseconds, `None` while live.
    #[serde(rename = "deletedAt")]
    pub deleted_at: Option<i64>,
}

impl ListItem {
    /// Returns whether this item should be considered visible/active.
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}
