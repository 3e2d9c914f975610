//! List, ownership and selection repository with SQLite implementation.
//!
//! # Responsibility
//! - Persist lists, ownership grants and the per-user active-list selection.
//! - Keep the ownership predicate a pure read with no side effects.
//!
//! # Invariants
//! - Creating a list writes the list row, the creator's ownership grant and
//!   the creator's selection atomically.
//! - At most one selection row exists per user (keyed upsert).
//! - Granting ownership is idempotent.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::list::{List, ListId, UserId};
use crate::repo::item_repo::{table_exists, table_has_column};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ListRepoResult<T> = Result<T, ListRepoError>;

/// Errors from list/ownership/selection operations.
#[derive(Debug)]
pub enum ListRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// List name is empty after trimming.
    EmptyName,
    /// Referenced list does not exist.
    ListNotFound(ListId),
    /// The user already owns a list with this name.
    DuplicateName { user_id: UserId, name: String },
    /// The user has no selected list.
    NoSelection(UserId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl Display for ListRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::EmptyName => write!(f, "list name cannot be empty"),
            Self::ListNotFound(id) => write!(f, "list not found: {id}"),
            Self::DuplicateName { user_id, name } => {
                write!(f, "user {user_id} already owns a list named `{name}`")
            }
            Self::NoSelection(user_id) => write!(f, "user {user_id} has no selected list"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "list repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "list repository requires table `{table}`")
            }
        }
    }
}

impl Error for ListRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for ListRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for ListRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for list lifecycle, ownership and selection.
pub trait ListRepository {
    /// Creates a list owned and selected by `owner`.
    fn create_list(&self, name: &str, owner: UserId) -> ListRepoResult<List>;
    /// Loads one list by id.
    fn get_list(&self, list_id: ListId) -> ListRepoResult<Option<List>>;
    /// Grants ownership; already-owner is Ok.
    fn add_owner(&self, user_id: UserId, list_id: ListId) -> ListRepoResult<()>;
    /// Pure ownership predicate.
    fn is_owner(&self, user_id: UserId, list_id: ListId) -> ListRepoResult<bool>;
    /// Lists every list the user owns, oldest grant first.
    fn lists_owned_by(&self, user_id: UserId) -> ListRepoResult<Vec<List>>;
    /// Returns the user's selected list, if any.
    fn selected_list(&self, user_id: UserId) -> ListRepoResult<Option<List>>;
    /// Points the user's selection at `list_id`.
    fn set_selected_list(&self, user_id: UserId, list_id: ListId) -> ListRepoResult<()>;
}

/// SQLite-backed list repository.
pub struct SqliteListRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteListRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> ListRepoResult<Self> {
        ensure_list_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ListRepository for SqliteListRepository<'_> {
    fn create_list(&self, name: &str, owner: UserId) -> ListRepoResult<List> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ListRepoError::EmptyName);
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let already_owned: i64 = tx.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM lists
                JOIN list_owners ON list_owners.list_id = lists.id
                WHERE list_owners.user_id = ?1 AND lists.name = ?2
            );",
            params![owner, name],
            |row| row.get(0),
        )?;
        if already_owned == 1 {
            return Err(ListRepoError::DuplicateName {
                user_id: owner,
                name: name.to_string(),
            });
        }

        tx.execute("INSERT INTO lists (name) VALUES (?1);", [name])?;
        let list_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO list_owners (user_id, list_id) VALUES (?1, ?2);",
            params![owner, list_id],
        )?;
        upsert_selection(&tx, owner, list_id)?;
        tx.commit()?;

        Ok(List {
            id: list_id,
            name: name.to_string(),
        })
    }

    fn get_list(&self, list_id: ListId) -> ListRepoResult<Option<List>> {
        let list = self
            .conn
            .query_row(
                "SELECT id, name FROM lists WHERE id = ?1;",
                [list_id],
                |row| {
                    Ok(List {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(list)
    }

    fn add_owner(&self, user_id: UserId, list_id: ListId) -> ListRepoResult<()> {
        if self.get_list(list_id)?.is_none() {
            return Err(ListRepoError::ListNotFound(list_id));
        }
        self.conn.execute(
            "INSERT OR IGNORE INTO list_owners (user_id, list_id) VALUES (?1, ?2);",
            params![user_id, list_id],
        )?;
        Ok(())
    }

    fn is_owner(&self, user_id: UserId, list_id: ListId) -> ListRepoResult<bool> {
        let owns: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM list_owners WHERE user_id = ?1 AND list_id = ?2
            );",
            params![user_id, list_id],
            |row| row.get(0),
        )?;
        Ok(owns == 1)
    }

    fn lists_owned_by(&self, user_id: UserId) -> ListRepoResult<Vec<List>> {
        let mut stmt = self.conn.prepare(
            "SELECT lists.id, lists.name
             FROM lists
             JOIN list_owners ON list_owners.list_id = lists.id
             WHERE list_owners.user_id = ?1
             ORDER BY list_owners.created_at ASC, lists.id ASC;",
        )?;
        let mut rows = stmt.query([user_id])?;
        let mut lists = Vec::new();
        while let Some(row) = rows.next()? {
            lists.push(List {
                id: row.get(0)?,
                name: row.get(1)?,
            });
        }
        Ok(lists)
    }

    fn selected_list(&self, user_id: UserId) -> ListRepoResult<Option<List>> {
        let list = self
            .conn
            .query_row(
                "SELECT lists.id, lists.name
                 FROM selections
                 JOIN lists ON lists.id = selections.list_id
                 WHERE selections.user_id = ?1;",
                [user_id],
                |row| {
                    Ok(List {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(list)
    }

    fn set_selected_list(&self, user_id: UserId, list_id: ListId) -> ListRepoResult<()> {
        if self.get_list(list_id)?.is_none() {
            return Err(ListRepoError::ListNotFound(list_id));
        }
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        upsert_selection(&tx, user_id, list_id)?;
        tx.commit()?;
        Ok(())
    }
}

fn upsert_selection(tx: &Transaction<'_>, user_id: UserId, list_id: ListId) -> ListRepoResult<()> {
    tx.execute(
        "INSERT INTO selections (user_id, list_id)
         VALUES (?1, ?2)
         ON CONFLICT(user_id) DO UPDATE SET
            list_id = excluded.list_id,
            updated_at = (strftime('%s', 'now') * 1000);",
        params![user_id, list_id],
    )?;
    Ok(())
}

fn ensure_list_connection_ready(conn: &Connection) -> ListRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(ListRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["lists", "list_owners", "selections"] {
        if !table_exists(conn, table)? {
            return Err(ListRepoError::MissingRequiredTable(table));
        }
    }

    // Selection joins require the lists.name column.
    if !table_has_column(conn, "lists", "name")? {
        return Err(ListRepoError::MissingRequiredTable("lists"));
    }

    Ok(())
}
