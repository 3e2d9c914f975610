use listling_core::db::open_db_in_memory;
use listling_core::{
    ItemListQuery, ItemRepoError, ListRepoError, ListRepository, ListService, ServiceError,
    SqliteItemRepository, SqliteListRepository,
};
use rusqlite::Connection;

const ALICE: i64 = 100;
const BOB: i64 = 200;

fn service(conn: &Connection) -> ListService<SqliteItemRepository<'_>, SqliteListRepository<'_>> {
    ListService::new(
        SqliteItemRepository::try_new(conn).unwrap(),
        SqliteListRepository::try_new(conn).unwrap(),
    )
}

#[test]
fn create_list_grants_ownership_and_selects_it() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let list = service.create_list(ALICE, "groceries").unwrap();

    service.authorize(ALICE, list.id).unwrap();
    let selected = service.selected_list(ALICE).unwrap().unwrap();
    assert_eq!(selected.id, list.id);
    assert_eq!(selected.name, "groceries");
}

#[test]
fn creating_a_second_list_moves_the_selection() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let first = service.create_list(ALICE, "groceries").unwrap();
    let second = service.create_list(ALICE, "hardware").unwrap();

    assert_eq!(service.selected_list(ALICE).unwrap().unwrap().id, second.id);

    service.select_list(ALICE, first.id).unwrap();
    assert_eq!(service.selected_list(ALICE).unwrap().unwrap().id, first.id);
}

#[test]
fn duplicate_list_name_for_same_owner_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    service.create_list(ALICE, "groceries").unwrap();
    let err = service.create_list(ALICE, "groceries").unwrap_err();
    assert!(matches!(
        err,
        ServiceError::List(ListRepoError::DuplicateName { .. })
    ));

    // The same name is fine for a different owner.
    service.create_list(BOB, "groceries").unwrap();
}

#[test]
fn every_mutating_operation_is_denied_without_ownership() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let list = service.create_list(ALICE, "groceries").unwrap();
    let item = service.append(ALICE, list.id, "milk").unwrap();

    assert_permission_denied(service.append(BOB, list.id, "chocolate").map(|_| ()));
    assert_permission_denied(service.delete_item(BOB, list.id, item.id));
    assert_permission_denied(service.reorder(BOB, list.id, &[item.id]));
    assert_permission_denied(service.undo_last(BOB, list.id).map(|_| ()));
    assert_permission_denied(service.undo_all(BOB, list.id).map(|_| ()));
    assert_permission_denied(service.select_list(BOB, list.id));

    // Nothing was mutated by the denied calls.
    let items = service
        .items(ALICE, list.id, ItemListQuery::default())
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, item.id);
    assert_eq!(items[0].position, 1);
}

#[test]
fn sharing_grants_the_target_full_access() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let list = service.create_list(ALICE, "groceries").unwrap();
    service.share_list(ALICE, list.id, BOB).unwrap();

    service.authorize(BOB, list.id).unwrap();
    service.append(BOB, list.id, "milk").unwrap();
    service.select_list(BOB, list.id).unwrap();

    // Sharing twice stays Ok.
    service.share_list(ALICE, list.id, BOB).unwrap();
}

#[test]
fn sharing_with_yourself_is_a_validation_error() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let list = service.create_list(ALICE, "groceries").unwrap();
    let err = service.share_list(ALICE, list.id, ALICE).unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[test]
fn sharing_an_unowned_list_is_denied() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    service.create_list(ALICE, "groceries").unwrap();
    let err = service.share_list(ALICE, 9999, BOB).unwrap_err();
    assert!(matches!(err, ServiceError::PermissionDenied { .. }));
}

#[test]
fn undo_all_with_clean_list_surfaces_nothing_to_restore() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let list = service.create_list(ALICE, "groceries").unwrap();
    service.append(ALICE, list.id, "milk").unwrap();

    let err = service.undo_all(ALICE, list.id).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Item(ItemRepoError::NothingToRestore { .. })
    ));
}

#[test]
fn owned_lists_reflect_grants_in_creation_order() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let first = service.create_list(ALICE, "groceries").unwrap();
    let second = service.create_list(BOB, "hardware").unwrap();
    service.share_list(BOB, second.id, ALICE).unwrap();

    let owned: Vec<i64> = service
        .owned_lists(ALICE)
        .unwrap()
        .into_iter()
        .map(|list| list.id)
        .collect();
    assert_eq!(owned, [first.id, second.id]);
}

#[test]
fn selection_survives_only_through_the_store() {
    let conn = open_db_in_memory().unwrap();

    let list_id = {
        let service = service(&conn);
        service.create_list(ALICE, "groceries").unwrap().id
    };

    // A brand new service instance sees the same selection row.
    let fresh = ListService::new(
        SqliteItemRepository::try_new(&conn).unwrap(),
        SqliteListRepository::try_new(&conn).unwrap(),
    );
    assert_eq!(fresh.selected_list(ALICE).unwrap().unwrap().id, list_id);
}

#[test]
fn set_selected_list_rejects_unknown_lists() {
    let conn = open_db_in_memory().unwrap();
    let lists = SqliteListRepository::try_new(&conn).unwrap();

    let err = lists.set_selected_list(ALICE, 12345).unwrap_err();
    assert!(matches!(err, ListRepoError::ListNotFound(12345)));
}

fn assert_permission_denied(result: Result<(), ServiceError>) {
    match result {
        Err(ServiceError::PermissionDenied { user_id, .. }) => assert_eq!(user_id, BOB),
        Err(other) => panic!("expected permission denial, got: {other}"),
        Ok(()) => panic!("expected permission denial, got Ok"),
    }
}
