//! Shared-list use-case service.
//!
//! # Responsibility
//! - Provide the ordered-item lifecycle operations behind the chat and web
//!   boundaries: append, delete, reorder, single undo, bulk undo.
//! - Gate every mutation of an existing list on the ownership predicate.
//!
//! # Invariants
//! - An identity without an ownership grant never reaches the repository
//!   write path (`PermissionDenied` before any store mutation).
//! - Granting ownership itself is unguarded: any owner may share with anyone,
//!   self-share excepted.
//! - The service holds no state across calls; selection and positions always
//!   round-trip through the store.

use crate::model::list::{List, ListId, ListItem, ListItemId, UserId};
use crate::repo::item_repo::{ItemListQuery, ItemRepoError, ItemRepository};
use crate::repo::list_repo::{ListRepoError, ListRepository};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors surfaced by list use-case operations.
#[derive(Debug)]
pub enum ServiceError {
    /// Input failed validation before touching the store.
    Validation(String),
    /// The acting identity has no ownership grant for the list.
    PermissionDenied { user_id: UserId, list_id: ListId },
    /// Item-level persistence error (not-found, nothing-to-restore, db).
    Item(ItemRepoError),
    /// List-level persistence error (not-found, duplicate, db).
    List(ListRepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "{message}"),
            Self::PermissionDenied { user_id, list_id } => {
                write!(f, "user {user_id} does not own list {list_id}")
            }
            Self::Item(err) => write!(f, "{err}"),
            Self::List(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Item(err) => Some(err),
            Self::List(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ItemRepoError> for ServiceError {
    fn from(value: ItemRepoError) -> Self {
        Self::Item(value)
    }
}

impl From<ListRepoError> for ServiceError {
    fn from(value: ListRepoError) -> Self {
        Self::List(value)
    }
}

/// Use-case service over item and list repositories.
pub struct ListService<I: ItemRepository, L: ListRepository> {
    items: I,
    lists: L,
}

impl<I: ItemRepository, L: ListRepository> ListService<I, L> {
    /// Creates a service using the provided repository implementations.
    pub fn new(items: I, lists: L) -> Self {
        Self { items, lists }
    }

    /// Verifies that `user_id` owns `list_id`.
    ///
    /// Pure predicate over the ownership relation; performs no writes.
    pub fn authorize(&self, user_id: UserId, list_id: ListId) -> ServiceResult<()> {
        if self.lists.is_owner(user_id, list_id)? {
            return Ok(());
        }
        warn!(
            "event=authorize module=service status=denied user_id={user_id} list_id={list_id}"
        );
        Err(ServiceError::PermissionDenied { user_id, list_id })
    }

    /// Appends one item at the end of the list.
    pub fn append(&self, user_id: UserId, list_id: ListId, name: &str) -> ServiceResult<ListItem> {
        self.authorize(user_id, list_id)?;
        let item = self.items.append_item(list_id, name, user_id)?;
        info!(
            "event=item_append module=service status=ok list_id={list_id} item_id={} position={}",
            item.id, item.position
        );
        Ok(item)
    }

    /// Soft-deletes one item; its saved position is retained for restore.
    pub fn delete_item(
        &self,
        user_id: UserId,
        list_id: ListId,
        item_id: ListItemId,
    ) -> ServiceResult<()> {
        self.authorize(user_id, list_id)?;
        self.items.soft_delete_item(list_id, item_id)?;
        info!(
            "event=item_delete module=service status=ok list_id={list_id} item_id={item_id}"
        );
        Ok(())
    }

    /// Rewrites positions of the supplied live items to match the given order.
    pub fn reorder(
        &self,
        user_id: UserId,
        list_id: ListId,
        ordered_ids: &[ListItemId],
    ) -> ServiceResult<()> {
        self.authorize(user_id, list_id)?;
        self.items.reorder_items(list_id, ordered_ids)?;
        info!(
            "event=item_reorder module=service status=ok list_id={list_id} count={}",
            ordered_ids.len()
        );
        Ok(())
    }

    /// Restores the caller's most recently deleted item of the list.
    pub fn undo_last(&self, user_id: UserId, list_id: ListId) -> ServiceResult<ListItem> {
        self.authorize(user_id, list_id)?;
        let item = self.items.restore_last_deleted(list_id, user_id)?;
        info!(
            "event=undo_last module=service status=ok list_id={list_id} item_id={} position={}",
            item.id, item.position
        );
        Ok(item)
    }

    /// Restores every item the caller deleted from the list, in ascending
    /// saved-position order. Returns the number of restored items.
    pub fn undo_all(&self, user_id: UserId, list_id: ListId) -> ServiceResult<usize> {
        self.authorize(user_id, list_id)?;
        let restored = self.items.restore_all_deleted(list_id, user_id)?;
        if restored == 0 {
            return Err(ServiceError::Item(ItemRepoError::NothingToRestore {
                list_id,
            }));
        }
        info!(
            "event=undo_all module=service status=ok list_id={list_id} restored={restored}"
        );
        Ok(restored)
    }

    /// Lists items of the list, live-only by default.
    pub fn items(
        &self,
        user_id: UserId,
        list_id: ListId,
        query: ItemListQuery,
    ) -> ServiceResult<Vec<ListItem>> {
        self.authorize(user_id, list_id)?;
        Ok(self.items.list_items(list_id, query)?)
    }

    /// Creates a list owned and selected by the caller.
    pub fn create_list(&self, user_id: UserId, name: &str) -> ServiceResult<List> {
        let list = self.lists.create_list(name, user_id)?;
        info!(
            "event=list_create module=service status=ok list_id={} owner={user_id}",
            list.id
        );
        Ok(list)
    }

    /// Grants ownership of the caller's list to another identity.
    ///
    /// The target is deliberately unguarded ("share with anyone"); only
    /// sharing with oneself is rejected.
    pub fn share_list(
        &self,
        user_id: UserId,
        list_id: ListId,
        share_with: UserId,
    ) -> ServiceResult<()> {
        if share_with == user_id {
            return Err(ServiceError::Validation(
                "cannot share a list with yourself".to_string(),
            ));
        }
        self.authorize(user_id, list_id)?;
        self.lists.add_owner(share_with, list_id)?;
        info!(
            "event=list_share module=service status=ok list_id={list_id} shared_with={share_with}"
        );
        Ok(())
    }

    /// Points the caller's selection at one of their lists.
    pub fn select_list(&self, user_id: UserId, list_id: ListId) -> ServiceResult<()> {
        self.authorize(user_id, list_id)?;
        self.lists.set_selected_list(user_id, list_id)?;
        Ok(())
    }

    /// Returns the caller's selected list, read fresh from the store.
    pub fn selected_list(&self, user_id: UserId) -> ServiceResult<Option<List>> {
        Ok(self.lists.selected_list(user_id)?)
    }

    /// Lists every list the caller owns.
    pub fn owned_lists(&self, user_id: UserId) -> ServiceResult<Vec<List>> {
        Ok(self.lists.lists_owned_by(user_id)?)
    }
}
