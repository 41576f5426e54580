//! SQLite permission store tests

mod common;

use common::Harness;
use pagewarden::access_control::{NewPagePermission, PermissionId, Principal, Role, UserId};
use pagewarden::error::StoreError;
use pagewarden::store::{Pagination, PermissionStore, PrincipalSummary};

#[tokio::test]
async fn test_insert_conflict() {
    let h = Harness::new().await;
    let page = h.page().await;
    let alice = h.user("alice").await;
    let grant = NewPagePermission::for_page(&page, Principal::User(alice), Role::Reader, alice);

    h.store.insert(grant.clone()).await.unwrap();
    let err = h.store.insert(grant).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));
}

#[tokio::test]
async fn test_user_and_group_indexes_are_independent() {
    let h = Harness::new().await;
    let page = h.page().await;
    let alice = h.user("alice").await;
    let group = h.group("editors").await;

    h.store
        .insert(NewPagePermission::for_page(
            &page,
            Principal::User(alice),
            Role::Reader,
            alice,
        ))
        .await
        .unwrap();
    h.store
        .insert(NewPagePermission::for_page(
            &page,
            Principal::Group(group),
            Role::Reader,
            alice,
        ))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_check_constraint_rejects_both_principals() {
    let h = Harness::new().await;
    let page = h.page().await;

    let result = sqlx::query(
        "INSERT INTO page_permissions
         (id, page_id, user_id, group_id, role, workspace_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 'reader', ?5, '2026-01-01T00:00:00.000000Z', '2026-01-01T00:00:00.000000Z')",
    )
    .bind(PermissionId::generate().to_string())
    .bind(page.id.to_string())
    .bind(UserId::generate().to_string())
    .bind(h.group("g").await.to_string())
    .bind(page.workspace_id.to_string())
    .execute(&h.pool)
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_corrupt_role_is_reported() {
    let h = Harness::new().await;
    let page = h.page().await;
    let alice = h.user("alice").await;
    let grant = h
        .store
        .insert(NewPagePermission::for_page(
            &page,
            Principal::User(alice),
            Role::Reader,
            alice,
        ))
        .await
        .unwrap();

    // Bypass the CHECK constraint to simulate a row written by something else
    sqlx::query("PRAGMA ignore_check_constraints = ON")
        .execute(&h.pool)
        .await
        .unwrap();
    sqlx::query("UPDATE page_permissions SET role = 'owner' WHERE id = ?1")
        .bind(grant.id.to_string())
        .execute(&h.pool)
        .await
        .unwrap();

    let err = h.store.find_by_id(grant.id).await.unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { .. }));
}

#[tokio::test]
async fn test_existing_ids() {
    let h = Harness::new().await;
    let page = h.page().await;
    let users = h.users(4).await;

    for user in &users[..2] {
        h.store
            .insert(NewPagePermission::for_page(
                &page,
                Principal::User(*user),
                Role::Reader,
                users[0],
            ))
            .await
            .unwrap();
    }

    let existing = h.store.existing_user_ids(page.id, &users).await.unwrap();
    assert_eq!(existing.len(), 2);
    assert!(existing.contains(&users[0]));
    assert!(existing.contains(&users[1]));

    assert!(h.store.existing_user_ids(page.id, &[]).await.unwrap().is_empty());
    assert!(h.store.existing_group_ids(page.id, &[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_insert_many_reports_conflicts() {
    let h = Harness::new().await;
    let page = h.page().await;
    let users = h.users(3).await;
    let new = |user: UserId| NewPagePermission::for_page(&page, Principal::User(user), Role::Reader, user);

    h.store.insert(new(users[1])).await.unwrap();

    let inserted = h
        .store
        .insert_many(&[new(users[0]), new(users[1]), new(users[2])])
        .await
        .unwrap();
    assert_eq!(inserted, vec![true, false, true]);
    assert!(h.store.insert_many(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_listing_pagination_and_summaries() {
    let h = Harness::new().await;
    let page = h.page().await;
    let users = h.users(3).await;
    let group = h.group("editors").await;

    for user in &users {
        h.store
            .insert(NewPagePermission::for_page(
                &page,
                Principal::User(*user),
                Role::Reader,
                users[0],
            ))
            .await
            .unwrap();
    }
    h.store
        .insert(NewPagePermission::for_page(
            &page,
            Principal::Group(group),
            Role::Writer,
            users[0],
        ))
        .await
        .unwrap();

    let first = h
        .store
        .list_for_page(page.id, Pagination::new(1, 3))
        .await
        .unwrap();
    assert_eq!(first.items.len(), 3);
    assert!(first.meta.has_next_page);
    assert!(!first.meta.has_prev_page);
    match &first.items[0].principal {
        PrincipalSummary::User { id, name, email, .. } => {
            assert_eq!(*id, users[0]);
            assert_eq!(name.as_deref(), Some("user0"));
            assert_eq!(email.as_deref(), Some("user0@example.com"));
        }
        other => panic!("expected a user, got {other:?}"),
    }

    let second = h
        .store
        .list_for_page(page.id, Pagination::new(2, 3))
        .await
        .unwrap();
    assert_eq!(second.items.len(), 1);
    assert!(!second.meta.has_next_page);
    assert!(second.meta.has_prev_page);
    assert!(matches!(
        &second.items[0].principal,
        PrincipalSummary::Group { name: Some(n), is_default: false, .. } if n == "editors"
    ));
}

#[tokio::test]
async fn test_listing_order_with_shared_timestamp() {
    let h = Harness::new().await;
    let page = h.page().await;
    let users = h.users(20).await;

    let grants: Vec<NewPagePermission> = users
        .iter()
        .map(|u| NewPagePermission::for_page(&page, Principal::User(*u), Role::Reader, users[0]))
        .collect();
    let inserted = h.store.insert_many(&grants).await.unwrap();
    assert!(inserted.iter().all(|ok| *ok));

    let first = h
        .store
        .list_for_page(page.id, Pagination::new(1, 100))
        .await
        .unwrap();
    assert_eq!(first.items.len(), 20);
    // One transaction, one timestamp
    assert!(
        first
            .items
            .iter()
            .all(|item| item.created_at == first.items[0].created_at)
    );

    let ids: Vec<PermissionId> = first.items.iter().map(|item| item.id).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);

    let again: Vec<PermissionId> = h
        .store
        .list_for_page(page.id, Pagination::new(1, 100))
        .await
        .unwrap()
        .items
        .iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(ids, again);

    // Pages split the same order
    let mut paged = Vec::new();
    for number in 1..=4 {
        let window = h
            .store
            .list_for_page(page.id, Pagination::new(number, 5))
            .await
            .unwrap();
        paged.extend(window.items.iter().map(|item| item.id));
    }
    assert_eq!(ids, paged);
}

#[tokio::test]
async fn test_cascade_hooks_touch_only_their_rows() {
    let h = Harness::new().await;
    let (first, second) = (h.page().await, h.page().await);
    let (alice, bob) = (h.user("alice").await, h.user("bob").await);
    let group = h.group("editors").await;

    for page in [&first, &second] {
        for principal in [Principal::User(alice), Principal::User(bob), Principal::Group(group)] {
            h.store
                .insert(NewPagePermission::for_page(page, principal, Role::Reader, alice))
                .await
                .unwrap();
        }
    }

    assert_eq!(h.store.delete_for_user(alice).await.unwrap(), 2);
    assert!(h.store.find_by_page_and_user(first.id, bob).await.unwrap().is_some());

    assert_eq!(h.store.delete_for_group(group).await.unwrap(), 2);
    assert_eq!(h.store.delete_for_page(first.id).await.unwrap(), 1);
    assert!(h.store.find_by_page_and_user(second.id, bob).await.unwrap().is_some());
    assert_eq!(h.store.delete_for_page(first.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_update_and_delete_missing() {
    let h = Harness::new().await;
    let id = PermissionId::generate();
    assert!(h.store.update_role(id, Role::Admin).await.unwrap().is_none());
    assert!(!h.store.delete(id).await.unwrap());
}
