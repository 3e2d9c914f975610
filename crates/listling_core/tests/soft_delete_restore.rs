use listling_core::db::open_db_in_memory;
use listling_core::{
    ItemListQuery, ItemRepoError, ItemRepository, ListRepository, SqliteItemRepository,
    SqliteListRepository,
};
use rusqlite::Connection;

const ALICE: i64 = 100;
const BOB: i64 = 200;

fn list_fixture(conn: &Connection) -> i64 {
    let lists = SqliteListRepository::try_new(conn).unwrap();
    lists.create_list("groceries", ALICE).unwrap().id
}

fn position_of(repo: &SqliteItemRepository<'_>, list_id: i64, item_id: i64) -> i64 {
    repo.get_item(list_id, item_id, false)
        .unwrap()
        .expect("item should be live")
        .position
}

#[test]
fn delete_keeps_position_and_hides_item_from_live_queries() {
    let conn = open_db_in_memory().unwrap();
    let list_id = list_fixture(&conn);
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let item = repo.append_item(list_id, "milk", ALICE).unwrap();
    repo.soft_delete_item(list_id, item.id).unwrap();

    assert!(repo.get_item(list_id, item.id, false).unwrap().is_none());
    let deleted = repo
        .get_item(list_id, item.id, true)
        .unwrap()
        .expect("deleted item should be reachable with include_deleted");
    assert!(deleted.deleted_at.is_some());
    assert_eq!(deleted.position, item.position);
}

#[test]
fn deleting_an_already_deleted_item_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let list_id = list_fixture(&conn);
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let item = repo.append_item(list_id, "milk", ALICE).unwrap();
    repo.soft_delete_item(list_id, item.id).unwrap();

    let err = repo.soft_delete_item(list_id, item.id).unwrap_err();
    assert!(matches!(err, ItemRepoError::ItemNotFound { .. }));
}

#[test]
fn undo_last_round_trips_the_deleted_item_to_its_saved_position() {
    let conn = open_db_in_memory().unwrap();
    let list_id = list_fixture(&conn);
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let a = repo.append_item(list_id, "a", ALICE).unwrap();
    let b = repo.append_item(list_id, "b", ALICE).unwrap();
    let c = repo.append_item(list_id, "c", ALICE).unwrap();

    repo.soft_delete_item(list_id, b.id).unwrap();
    let restored = repo.restore_last_deleted(list_id, ALICE).unwrap();

    assert_eq!(restored.id, b.id);
    assert_eq!(restored.position, 2);
    assert!(restored.deleted_at.is_none());

    // Items that originally sat before the restored one are unchanged,
    // items at or after its saved position moved by exactly +1.
    assert_eq!(position_of(&repo, list_id, a.id), 1);
    assert_eq!(position_of(&repo, list_id, c.id), 4);
}

#[test]
fn undo_last_restores_deletions_most_recent_first() {
    let conn = open_db_in_memory().unwrap();
    let list_id = list_fixture(&conn);
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let a = repo.append_item(list_id, "a", ALICE).unwrap();
    let b = repo.append_item(list_id, "b", ALICE).unwrap();

    repo.soft_delete_item(list_id, a.id).unwrap();
    repo.soft_delete_item(list_id, b.id).unwrap();

    // Deletion order was a then b, so undo pops b first.
    assert_eq!(repo.restore_last_deleted(list_id, ALICE).unwrap().id, b.id);
    assert_eq!(repo.restore_last_deleted(list_id, ALICE).unwrap().id, a.id);
}

#[test]
fn undo_last_with_no_deleted_items_reports_nothing_to_restore() {
    let conn = open_db_in_memory().unwrap();
    let list_id = list_fixture(&conn);
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    repo.append_item(list_id, "milk", ALICE).unwrap();

    let err = repo.restore_last_deleted(list_id, ALICE).unwrap_err();
    assert!(matches!(err, ItemRepoError::NothingToRestore { .. }));
}

#[test]
fn undo_last_ignores_items_deleted_by_other_users() {
    let conn = open_db_in_memory().unwrap();
    let list_id = list_fixture(&conn);
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let own = repo.append_item(list_id, "mine", ALICE).unwrap();
    let foreign = repo.append_item(list_id, "theirs", BOB).unwrap();
    repo.soft_delete_item(list_id, own.id).unwrap();
    repo.soft_delete_item(list_id, foreign.id).unwrap();

    // Bob's undo only reaches items Bob created.
    let restored = repo.restore_last_deleted(list_id, BOB).unwrap();
    assert_eq!(restored.id, foreign.id);

    let err = repo.restore_last_deleted(list_id, BOB).unwrap_err();
    assert!(matches!(err, ItemRepoError::NothingToRestore { .. }));
}

#[test]
fn undo_all_reproduces_the_pre_deletion_sequence() {
    let conn = open_db_in_memory().unwrap();
    let list_id = list_fixture(&conn);
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let a = repo.append_item(list_id, "a", ALICE).unwrap();
    let b = repo.append_item(list_id, "b", ALICE).unwrap();
    let c = repo.append_item(list_id, "c", ALICE).unwrap();
    let d = repo.append_item(list_id, "d", ALICE).unwrap();

    // Delete out of order relative to positions.
    repo.soft_delete_item(list_id, c.id).unwrap();
    repo.soft_delete_item(list_id, a.id).unwrap();
    repo.soft_delete_item(list_id, d.id).unwrap();

    let restored = repo.restore_all_deleted(list_id, ALICE).unwrap();
    assert_eq!(restored, 3);

    let sequence: Vec<i64> = repo
        .list_items(list_id, ItemListQuery::default())
        .unwrap()
        .into_iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(sequence, [a.id, b.id, c.id, d.id]);
}

#[test]
fn undo_all_with_nothing_deleted_restores_zero_items() {
    let conn = open_db_in_memory().unwrap();
    let list_id = list_fixture(&conn);
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    repo.append_item(list_id, "milk", ALICE).unwrap();
    assert_eq!(repo.restore_all_deleted(list_id, ALICE).unwrap(), 0);
}

#[test]
fn restore_into_emptied_list_succeeds() {
    let conn = open_db_in_memory().unwrap();
    let list_id = list_fixture(&conn);
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let a = repo.append_item(list_id, "a", ALICE).unwrap();
    let b = repo.append_item(list_id, "b", ALICE).unwrap();
    repo.soft_delete_item(list_id, a.id).unwrap();
    repo.soft_delete_item(list_id, b.id).unwrap();

    // No live items remain to shift; restore still lands on the saved slot.
    let restored = repo.restore_last_deleted(list_id, ALICE).unwrap();
    assert_eq!(restored.id, b.id);
    assert_eq!(restored.position, 2);
}

#[test]
fn undo_all_disambiguates_duplicate_saved_positions() {
    let conn = open_db_in_memory().unwrap();
    let list_id = list_fixture(&conn);
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    // Craft two tombstones sharing saved position 1: delete the item at
    // position 1, renumber the survivor onto position 1, delete it too.
    let a = repo.append_item(list_id, "a", ALICE).unwrap();
    let b = repo.append_item(list_id, "b", ALICE).unwrap();
    repo.soft_delete_item(list_id, a.id).unwrap();
    repo.reorder_items(list_id, &[b.id]).unwrap();
    repo.soft_delete_item(list_id, b.id).unwrap();

    assert_eq!(repo.restore_all_deleted(list_id, ALICE).unwrap(), 2);

    let positions: Vec<i64> = repo
        .list_items(list_id, ItemListQuery::default())
        .unwrap()
        .into_iter()
        .map(|item| item.position)
        .collect();
    assert_eq!(positions.len(), 2);
    assert_ne!(positions[0], positions[1]);
}

#[test]
fn include_deleted_query_returns_tombstones() {
    let conn = open_db_in_memory().unwrap();
    let list_id = list_fixture(&conn);
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let a = repo.append_item(list_id, "a", ALICE).unwrap();
    let b = repo.append_item(list_id, "b", ALICE).unwrap();
    repo.soft_delete_item(list_id, a.id).unwrap();

    let live = repo.list_items(list_id, ItemListQuery::default()).unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].id, b.id);

    let all = repo
        .list_items(
            list_id,
            ItemListQuery {
                include_deleted: true,
            },
        )
        .unwrap();
    assert_eq!(all.len(), 2);
}
