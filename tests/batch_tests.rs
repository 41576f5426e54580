//! Batch grant pipeline tests

mod common;

use common::{BlindStore, Harness, MAX_BATCH};
use pagewarden::access_control::{GrantTarget, PageId, Principal, PrincipalKind, Role, UserId};
use pagewarden::error::GrantError;
use pagewarden::service::BatchStatus;
use pagewarden::store::{Pagination, PermissionStore};
use std::sync::Arc;

#[tokio::test]
async fn test_batch_adds_users_and_groups() {
    let h = Harness::new().await;
    let page = h.page().await;
    let users = h.users(3).await;
    let group = h.group("editors").await;
    let admin = h.user("admin").await;

    let outcome = h
        .batch()
        .grant_batch(page.id, Role::Reader, &users, &[group], admin)
        .await
        .unwrap();

    assert_eq!(outcome.added, 4);
    assert_eq!(outcome.entries.len(), 4);
    assert_eq!(outcome.count(BatchStatus::Added), 4);

    // Users first, in request order, then groups
    let principals: Vec<Principal> = outcome.entries.iter().map(|e| e.principal).collect();
    assert_eq!(
        principals,
        vec![
            Principal::User(users[0]),
            Principal::User(users[1]),
            Principal::User(users[2]),
            Principal::Group(group),
        ]
    );

    for user in &users {
        let grant = h
            .store
            .find_by_page_and_user(page.id, *user)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(grant.role, Role::Reader);
        assert_eq!(grant.added_by_id, Some(admin));
        assert_eq!(grant.workspace_id, page.workspace_id);
    }
}

#[tokio::test]
async fn test_batch_missing_page() {
    let h = Harness::new().await;
    let err = h
        .batch()
        .grant_batch(
            PageId::generate(),
            Role::Reader,
            &[UserId::generate()],
            &[],
            UserId::generate(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GrantError::PageNotFound));
}

#[tokio::test]
async fn test_empty_batch() {
    let h = Harness::new().await;
    let page = h.page().await;
    let err = h
        .batch()
        .grant_batch(page.id, Role::Reader, &[], &[], UserId::generate())
        .await
        .unwrap_err();
    assert!(matches!(err, GrantError::EmptyBatch));
}

#[tokio::test]
async fn test_batch_too_large() {
    let h = Harness::new().await;
    let page = h.page().await;
    let users: Vec<UserId> = (0..=MAX_BATCH).map(|_| UserId::generate()).collect();

    let err = h
        .batch()
        .grant_batch(page.id, Role::Reader, &users, &[], UserId::generate())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GrantError::BatchTooLarge {
            kind: PrincipalKind::User,
            len: 26,
            max: 25
        }
    ));

    // Nothing was written
    let listing = h
        .store
        .list_for_page(page.id, Pagination::default())
        .await
        .unwrap();
    assert!(listing.items.is_empty());
}

#[tokio::test]
async fn test_batch_mixed_outcomes() {
    let h = Harness::new().await;
    let page = h.page().await;
    let users = h.users(25).await;
    let admin = h.user("admin").await;

    // 10 already granted
    let grants = h.grants();
    for user in &users[..10] {
        grants
            .grant(page.id, Role::Reader, GrantTarget::user(*user), admin)
            .await
            .unwrap();
    }
    // 5 capped below writer
    for user in &users[10..15] {
        h.space_role(*user, page.space_id, Role::Reader).await;
    }

    let outcome = h
        .batch()
        .grant_batch(page.id, Role::Writer, &users, &[], admin)
        .await
        .unwrap();

    assert_eq!(outcome.added, 10);
    assert_eq!(outcome.count(BatchStatus::AlreadyGranted), 10);
    assert_eq!(
        outcome.count(BatchStatus::ExceedsSpaceRole { cap: Role::Reader }),
        5
    );
    let added: Vec<Principal> = outcome.added_principals().collect();
    let expected: Vec<Principal> = users[15..].iter().map(|u| Principal::User(*u)).collect();
    assert_eq!(added, expected);

    // 10 pre-existing rows plus 10 new ones
    let listing = h
        .store
        .list_for_page(page.id, Pagination::new(1, 100))
        .await
        .unwrap();
    assert_eq!(listing.items.len(), 20);
    assert!(!listing.meta.has_next_page);

    // Existing grants keep their role
    let existing = h
        .store
        .find_by_page_and_user(page.id, users[0])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(existing.role, Role::Reader);

    // Capped users received nothing
    assert!(
        h.store
            .find_by_page_and_user(page.id, users[10])
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_batch_group_cap() {
    let h = Harness::new().await;
    let page = h.page().await;
    let readers = h.group("readers").await;
    let admins = h.group("admins").await;
    h.group_space_role(readers, page.space_id, Role::Reader).await;
    h.group_space_role(admins, page.space_id, Role::Admin).await;

    let outcome = h
        .batch()
        .grant_batch(
            page.id,
            Role::Admin,
            &[],
            &[readers, admins],
            UserId::generate(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.added, 1);
    assert_eq!(
        outcome.entries[0].status,
        BatchStatus::ExceedsSpaceRole { cap: Role::Reader }
    );
    assert_eq!(outcome.entries[1].status, BatchStatus::Added);
}

#[tokio::test]
async fn test_repeated_ids_collapse() {
    let h = Harness::new().await;
    let page = h.page().await;
    let alice = h.user("alice").await;
    let bob = h.user("bob").await;

    let outcome = h
        .batch()
        .grant_batch(page.id, Role::Reader, &[alice, bob, alice, alice], &[], bob)
        .await
        .unwrap();

    assert_eq!(outcome.added, 2);
    assert_eq!(outcome.entries.len(), 2);
}

#[tokio::test]
async fn test_batch_all_skipped_writes_nothing() {
    let h = Harness::new().await;
    let page = h.page().await;
    let alice = h.user("alice").await;
    h.space_role(alice, page.space_id, Role::Reader).await;

    let outcome = h
        .batch()
        .grant_batch(page.id, Role::Admin, &[alice], &[], alice)
        .await
        .unwrap();
    assert_eq!(outcome.added, 0);
    assert_eq!(outcome.added_principals().count(), 0);
}

#[tokio::test]
async fn test_batch_racing_duplicates_become_already_granted() {
    let h = Harness::new().await;
    let page = h.page().await;
    let users = h.users(3).await;

    h.grants()
        .grant(page.id, Role::Reader, GrantTarget::user(users[1]), users[0])
        .await
        .unwrap();

    // Existence check sees nothing, so the store rejects users[1] on insert
    let outcome = h
        .batch_over(Arc::new(BlindStore(h.store.clone())))
        .grant_batch(page.id, Role::Reader, &users, &[], users[0])
        .await
        .unwrap();

    assert_eq!(outcome.added, 2);
    assert_eq!(outcome.entries[1].status, BatchStatus::AlreadyGranted);

    // The rows that did not conflict were still committed
    for user in [users[0], users[2]] {
        assert!(
            h.store
                .find_by_page_and_user(page.id, user)
                .await
                .unwrap()
                .is_some()
        );
    }
}
