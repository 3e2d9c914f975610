//! List-item repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide position-aware read/write APIs over `list_items` storage.
//! - Keep the ordering and restore mechanics inside the persistence boundary.
//!
//! # Invariants
//! - `position` values are unique among live items of one list after every
//!   operation exposed here.
//! - Appended items receive `max(live position) + 1`, or 1 on an empty list.
//! - Restore uses shift-then-place: live items at or above the saved position
//!   are shifted by +1 as one batch before the tombstone is cleared.
//! - Reorder, single restore and bulk restore are atomic: a mid-batch failure
//!   rolls the whole operation back.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::list::{ListId, ListItem, ListItemId, UserId};
use crate::repo::now_epoch_ms;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ITEM_SELECT_SQL: &str = "SELECT
    id,
    list_id,
    name,
    created_by,
    position,
    deleted_at
FROM list_items";

pub type ItemRepoResult<T> = Result<T, ItemRepoError>;

/// Errors from list-item persistence and query operations.
#[derive(Debug)]
pub enum ItemRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Item name is empty after trimming.
    EmptyName,
    /// Referenced item does not exist as a live row of the list.
    ItemNotFound { list_id: ListId, item_id: ListItemId },
    /// No deleted item matched the restore scope.
    NothingToRestore { list_id: ListId },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for ItemRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::EmptyName => write!(f, "item name cannot be empty"),
            Self::ItemNotFound { list_id, item_id } => {
                write!(f, "item {item_id} not found in list {list_id}")
            }
            Self::NothingToRestore { list_id } => {
                write!(f, "no deleted items to restore in list {list_id}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "item repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "item repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "item repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted item data: {message}"),
        }
    }
}

impl Error for ItemRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for ItemRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for ItemRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Query options for listing items of one list.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemListQuery {
    /// Include soft-deleted rows. Default is live-only.
    pub include_deleted: bool,
}

/// Repository interface for position-aware item operations.
pub trait ItemRepository {
    /// Appends one item at the end of the live sequence of the list.
    fn append_item(&self, list_id: ListId, name: &str, created_by: UserId)
        -> ItemRepoResult<ListItem>;
    /// Loads one item by id with optional deleted-row visibility.
    fn get_item(
        &self,
        list_id: ListId,
        item_id: ListItemId,
        include_deleted: bool,
    ) -> ItemRepoResult<Option<ListItem>>;
    /// Lists items of one list ordered by `position ASC, id ASC`.
    fn list_items(&self, list_id: ListId, query: ItemListQuery) -> ItemRepoResult<Vec<ListItem>>;
    /// Rewrites positions of the supplied live items to `index + 1`.
    fn reorder_items(&self, list_id: ListId, ordered_ids: &[ListItemId]) -> ItemRepoResult<()>;
    /// Marks one live item deleted; its saved position is retained.
    fn soft_delete_item(&self, list_id: ListId, item_id: ListItemId) -> ItemRepoResult<()>;
    /// Restores the most recently deleted item created by `user_id`.
    fn restore_last_deleted(&self, list_id: ListId, user_id: UserId) -> ItemRepoResult<ListItem>;
    /// Restores every deleted item created by `user_id`, ascending by saved
    /// position. Returns the number of restored items.
    fn restore_all_deleted(&self, list_id: ListId, user_id: UserId) -> ItemRepoResult<usize>;
}

/// SQLite-backed item repository.
pub struct SqliteItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteItemRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> ItemRepoResult<Self> {
        ensure_item_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ItemRepository for SqliteItemRepository<'_> {
    fn append_item(
        &self,
        list_id: ListId,
        name: &str,
        created_by: UserId,
    ) -> ItemRepoResult<ListItem> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ItemRepoError::EmptyName);
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let position = next_live_position(&tx, list_id)?;
        tx.execute(
            "INSERT INTO list_items (list_id, name, created_by, position)
             VALUES (?1, ?2, ?3, ?4);",
            params![list_id, name, created_by, position],
        )?;
        let item_id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(ListItem {
            id: item_id,
            list_id,
            name: name.to_string(),
            created_by,
            position,
            deleted_at: None,
        })
    }

    fn get_item(
        &self,
        list_id: ListId,
        item_id: ListItemId,
        include_deleted: bool,
    ) -> ItemRepoResult<Option<ListItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ITEM_SELECT_SQL}
             WHERE id = ?1
               AND list_id = ?2
               AND (?3 = 1 OR deleted_at IS NULL);"
        ))?;

        let mut rows = stmt.query(params![item_id, list_id, include_deleted as i64])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_item_row(row)?));
        }

        Ok(None)
    }

    fn list_items(&self, list_id: ListId, query: ItemListQuery) -> ItemRepoResult<Vec<ListItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ITEM_SELECT_SQL}
             WHERE list_id = ?1
               AND (?2 = 1 OR deleted_at IS NULL)
             ORDER BY position ASC, id ASC;"
        ))?;

        let mut rows = stmt.query(params![list_id, query.include_deleted as i64])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }

    fn reorder_items(&self, list_id: ListId, ordered_ids: &[ListItemId]) -> ItemRepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        // Validate the whole set before the first write, so a bad id aborts
        // with every position untouched.
        for &item_id in ordered_ids {
            let exists: i64 = tx.query_row(
                "SELECT EXISTS(
                    SELECT 1
                    FROM list_items
                    WHERE id = ?1 AND list_id = ?2 AND deleted_at IS NULL
                );",
                params![item_id, list_id],
                |row| row.get(0),
            )?;
            if exists != 1 {
                return Err(ItemRepoError::ItemNotFound { list_id, item_id });
            }
        }

        // Position is purely a function of input order; items outside the
        // supplied set are left untouched.
        for (index, &item_id) in ordered_ids.iter().enumerate() {
            tx.execute(
                "UPDATE list_items
                 SET position = ?3
                 WHERE id = ?1 AND list_id = ?2;",
                params![item_id, list_id, index as i64 + 1],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn soft_delete_item(&self, list_id: ListId, item_id: ListItemId) -> ItemRepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE list_items
             SET deleted_at = ?3
             WHERE id = ?1 AND list_id = ?2 AND deleted_at IS NULL;",
            params![item_id, list_id, now_epoch_ms()],
        )?;
        if changed == 0 {
            // An already-deleted item is excluded by the live predicate, so a
            // repeated delete surfaces as not-found.
            return Err(ItemRepoError::ItemNotFound { list_id, item_id });
        }
        Ok(())
    }

    fn restore_last_deleted(&self, list_id: ListId, user_id: UserId) -> ItemRepoResult<ListItem> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let last_deleted = tx
            .query_row(
                &format!(
                    "{ITEM_SELECT_SQL}
                     WHERE list_id = ?1
                       AND created_by = ?2
                       AND deleted_at IS NOT NULL
                     ORDER BY deleted_at DESC, id DESC
                     LIMIT 1;"
                ),
                params![list_id, user_id],
                |row| Ok((row.get::<_, ListItemId>("id")?, row.get::<_, i64>("position")?)),
            )
            .optional()?;

        let (item_id, saved_position) = match last_deleted {
            Some(found) => found,
            None => return Err(ItemRepoError::NothingToRestore { list_id }),
        };

        restore_at_saved_position(&tx, list_id, item_id, saved_position)?;
        tx.commit()?;

        self.get_item(list_id, item_id, false)?
            .ok_or(ItemRepoError::ItemNotFound { list_id, item_id })
    }

    fn restore_all_deleted(&self, list_id: ListId, user_id: UserId) -> ItemRepoResult<usize> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        // Ascending saved-position order minimizes cascading shifts and
        // reproduces the pre-deletion relative order.
        let mut stmt = tx.prepare(
            "SELECT id, position
             FROM list_items
             WHERE list_id = ?1
               AND created_by = ?2
               AND deleted_at IS NOT NULL
             ORDER BY position ASC, deleted_at ASC, id ASC;",
        )?;
        let mut rows = stmt.query(params![list_id, user_id])?;
        let mut deleted = Vec::new();
        while let Some(row) = rows.next()? {
            deleted.push((row.get::<_, ListItemId>(0)?, row.get::<_, i64>(1)?));
        }
        drop(rows);
        drop(stmt);

        // Each restore re-derives the live set fresh: prior restores in this
        // batch are visible to the next shift.
        for &(item_id, saved_position) in &deleted {
            restore_at_saved_position(&tx, list_id, item_id, saved_position)?;
        }

        tx.commit()?;
        Ok(deleted.len())
    }
}

/// Shifts live items at or above the saved position as one batch, then clears
/// the tombstone of `item_id` at that position. Guarantees no duplicate
/// position among live items after the call.
fn restore_at_saved_position(
    tx: &Transaction<'_>,
    list_id: ListId,
    item_id: ListItemId,
    saved_position: i64,
) -> ItemRepoResult<()> {
    tx.execute(
        "UPDATE list_items
         SET position = position + 1
         WHERE list_id = ?1
           AND deleted_at IS NULL
           AND position >= ?2;",
        params![list_id, saved_position],
    )?;
    tx.execute(
        "UPDATE list_items
         SET deleted_at = NULL, position = ?3
         WHERE id = ?1 AND list_id = ?2;",
        params![item_id, list_id, saved_position],
    )?;
    Ok(())
}

fn next_live_position(tx: &Transaction<'_>, list_id: ListId) -> ItemRepoResult<i64> {
    let max_position: i64 = tx.query_row(
        "SELECT COALESCE(MAX(position), 0)
         FROM list_items
         WHERE list_id = ?1 AND deleted_at IS NULL;",
        [list_id],
        |row| row.get(0),
    )?;
    Ok(max_position + 1)
}

fn parse_item_row(row: &Row<'_>) -> ItemRepoResult<ListItem> {
    let position: i64 = row.get("position")?;
    if position < 0 {
        return Err(ItemRepoError::InvalidData(format!(
            "negative position `{position}` in list_items.position"
        )));
    }

    Ok(ListItem {
        id: row.get("id")?,
        list_id: row.get("list_id")?,
        name: row.get("name")?,
        created_by: row.get("created_by")?,
        position,
        deleted_at: row.get("deleted_at")?,
    })
}

fn ensure_item_connection_ready(conn: &Connection) -> ItemRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(ItemRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "list_items")? {
        return Err(ItemRepoError::MissingRequiredTable("list_items"));
    }

    for column in ["id", "list_id", "name", "created_by", "position", "deleted_at"] {
        if !table_has_column(conn, "list_items", column)? {
            return Err(ItemRepoError::MissingRequiredColumn {
                table: "list_items",
                column,
            });
        }
    }

    Ok(())
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub(crate) fn table_has_column(
    conn: &Connection,
    table: &str,
    column: &str,
) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
