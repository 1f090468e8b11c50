//! Repository integration tests against a live Postgres database.
//!
//! Tests cover:
//! - version-guarded item writes (single winner under concurrency, conflict
//!   payload, tombstoned rows invisible to guarded writes)
//! - membership capacity and the active-pair unique index
//! - invitation acceptance: expiry boundary, lazy expiry persistence, and
//!   atomicity when the group is full
//! - uniform tombstone filtering after soft deletes and the group cascade
//!
//! Each test runs in its own database provisioned by `#[sqlx::test]` with the
//! crate migrations applied.

use chrono::{Duration, DurationRound, Utc};
use persistence::entities::{
    GroupEntity, GroupRoleDb, InvitationEntity, InvitationStatusDb, ShoppingItemEntity,
    ShoppingListEntity, UserEntity,
};
use persistence::repositories::{
    AcceptOutcome, AddMemberOutcome, CasOutcome, GroupMemberRepository, GroupRepository,
    InvitationRepository, ShoppingItemRepository, ShoppingListRepository, UserRepository,
};
use shared::token::{generate_invitation_token, generate_invite_code};
use sqlx::PgPool;
use uuid::Uuid;

async fn seed_user(pool: &PgPool, label: &str) -> UserEntity {
    let now = Utc::now();
    UserRepository::new(pool.clone())
        .create(
            &format!("{label}-{}@example.com", Uuid::new_v4()),
            "$argon2id$fixture",
            label,
            None,
            &Uuid::new_v4().to_string(),
            now + Duration::hours(24),
            now,
        )
        .await
        .unwrap()
}

async fn seed_group(pool: &PgPool, owner: &UserEntity, max_members: i32) -> GroupEntity {
    let (group, _owner_member) = GroupRepository::new(pool.clone())
        .create(
            "Household",
            None,
            owner.id,
            max_members,
            &generate_invite_code(),
            Utc::now(),
        )
        .await
        .unwrap();
    group
}

async fn seed_list(pool: &PgPool, group: &GroupEntity, user: &UserEntity) -> ShoppingListEntity {
    ShoppingListRepository::new(pool.clone())
        .create(group.id, "Groceries", None, user.id, None, None, Utc::now())
        .await
        .unwrap()
}

async fn seed_item(
    pool: &PgPool,
    list: &ShoppingListEntity,
    user: &UserEntity,
) -> ShoppingItemEntity {
    ShoppingItemRepository::new(pool.clone())
        .add(list.id, "Milk", 2, None, None, false, user.id, Utc::now())
        .await
        .unwrap()
}

// =============================================================================
// Version-guarded item writes
// =============================================================================

#[sqlx::test]
async fn test_concurrent_updates_from_same_version_have_single_winner(pool: PgPool) {
    let owner = seed_user(&pool, "owner").await;
    let group = seed_group(&pool, &owner, 10).await;
    let list = seed_list(&pool, &group, &owner).await;
    let item = seed_item(&pool, &list, &owner).await;
    assert_eq!(item.version, 1);

    let items = ShoppingItemRepository::new(pool.clone());
    let now = Utc::now();
    let (first, second) = tokio::join!(
        items.update_fields(
            item.id,
            1,
            Some("Whole milk"),
            None,
            None,
            None,
            None,
            Some(owner.id),
            now,
        ),
        items.update_fields(
            item.id,
            1,
            Some("Skim milk"),
            None,
            None,
            None,
            None,
            Some(owner.id),
            now,
        ),
    );

    let outcomes = [first.unwrap(), second.unwrap()];
    let wins = outcomes
        .iter()
        .filter(|o| matches!(o, CasOutcome::Updated(_)))
        .count();
    let conflicts = outcomes
        .iter()
        .filter(|o| matches!(o, CasOutcome::Conflict(_)))
        .count();
    assert_eq!(wins, 1);
    assert_eq!(conflicts, 1);

    // The loser sees the winner's write, not its own.
    for outcome in outcomes {
        if let CasOutcome::Conflict(current) = outcome {
            assert_eq!(current.version, 2);
        }
    }
}

#[sqlx::test]
async fn test_stale_update_returns_current_row(pool: PgPool) {
    let owner = seed_user(&pool, "owner").await;
    let group = seed_group(&pool, &owner, 10).await;
    let list = seed_list(&pool, &group, &owner).await;
    let item = seed_item(&pool, &list, &owner).await;

    let items = ShoppingItemRepository::new(pool.clone());
    let updated = items
        .update_fields(
            item.id,
            1,
            Some("Oat milk"),
            None,
            None,
            None,
            None,
            Some(owner.id),
            Utc::now(),
        )
        .await
        .unwrap();
    let CasOutcome::Updated(updated) = updated else {
        panic!("first update must land");
    };
    assert_eq!(updated.version, 2);

    let stale = items
        .update_fields(
            item.id,
            1,
            Some("Soy milk"),
            None,
            None,
            None,
            None,
            Some(owner.id),
            Utc::now(),
        )
        .await
        .unwrap();
    match stale {
        CasOutcome::Conflict(current) => {
            assert_eq!(current.version, 2);
            assert_eq!(current.name, "Oat milk");
        }
        other => panic!("expected Conflict, got {:?}", other),
    }
}

#[sqlx::test]
async fn test_deleted_item_invisible_to_reads_and_writes(pool: PgPool) {
    let owner = seed_user(&pool, "owner").await;
    let group = seed_group(&pool, &owner, 10).await;
    let list = seed_list(&pool, &group, &owner).await;
    let item = seed_item(&pool, &list, &owner).await;

    let items = ShoppingItemRepository::new(pool.clone());
    let deleted = items
        .soft_delete(item.id, 1, Some(owner.id), Utc::now())
        .await
        .unwrap();
    assert!(matches!(deleted, CasOutcome::Updated(_)));

    assert!(items.find_by_id(item.id).await.unwrap().is_none());
    assert!(items.list_by_list(list.id).await.unwrap().is_empty());

    let after = items
        .update_fields(
            item.id,
            2,
            Some("Ghost"),
            None,
            None,
            None,
            None,
            Some(owner.id),
            Utc::now(),
        )
        .await
        .unwrap();
    assert!(matches!(after, CasOutcome::NotFound));
}

// =============================================================================
// Membership capacity and uniqueness
// =============================================================================

#[sqlx::test]
async fn test_add_member_enforces_capacity(pool: PgPool) {
    let owner = seed_user(&pool, "owner").await;
    let second = seed_user(&pool, "second").await;
    let third = seed_user(&pool, "third").await;
    // Owner occupies one of the two slots.
    let group = seed_group(&pool, &owner, 2).await;

    let members = GroupMemberRepository::new(pool.clone());
    let added = members
        .add_member(
            group.id,
            second.id,
            GroupRoleDb::Member,
            Some(owner.id),
            Some(owner.id),
            Utc::now(),
        )
        .await
        .unwrap();
    assert!(matches!(added, AddMemberOutcome::Added(_)));

    let over = members
        .add_member(
            group.id,
            third.id,
            GroupRoleDb::Member,
            Some(owner.id),
            Some(owner.id),
            Utc::now(),
        )
        .await
        .unwrap();
    assert!(matches!(
        over,
        AddMemberOutcome::CapacityReached { max_members: 2 }
    ));
    assert!(members.find_active(group.id, third.id).await.unwrap().is_none());
}

#[sqlx::test]
async fn test_add_member_rejects_duplicate_active_pair(pool: PgPool) {
    let owner = seed_user(&pool, "owner").await;
    let second = seed_user(&pool, "second").await;
    let group = seed_group(&pool, &owner, 10).await;

    let members = GroupMemberRepository::new(pool.clone());
    for expected_duplicate in [false, true] {
        let outcome = members
            .add_member(
                group.id,
                second.id,
                GroupRoleDb::Member,
                Some(owner.id),
                Some(owner.id),
                Utc::now(),
            )
            .await
            .unwrap();
        if expected_duplicate {
            assert!(matches!(outcome, AddMemberOutcome::AlreadyMember));
        } else {
            assert!(matches!(outcome, AddMemberOutcome::Added(_)));
        }
    }
    assert_eq!(members.count_active(group.id).await.unwrap(), 2);
}

#[sqlx::test]
async fn test_remove_never_touches_owner_row(pool: PgPool) {
    let owner = seed_user(&pool, "owner").await;
    let group = seed_group(&pool, &owner, 10).await;

    let members = GroupMemberRepository::new(pool.clone());
    let removed = members
        .remove(group.id, owner.id, Some(owner.id), Utc::now())
        .await
        .unwrap();
    assert!(!removed);
    assert!(members.find_active(group.id, owner.id).await.unwrap().is_some());
}

// =============================================================================
// Invitation acceptance
// =============================================================================

async fn seed_invitation(
    pool: &PgPool,
    group: &GroupEntity,
    invited_by: Uuid,
    email: &str,
    expires_at: chrono::DateTime<Utc>,
) -> (InvitationEntity, String) {
    let token = generate_invitation_token();
    let invitation = InvitationRepository::new(pool.clone())
        .create(
            group.id, email, None, invited_by, &token, expires_at, None, Utc::now(),
        )
        .await
        .unwrap();
    (invitation, token)
}

#[sqlx::test]
async fn test_accept_at_exact_expiry_instant_succeeds(pool: PgPool) {
    let owner = seed_user(&pool, "owner").await;
    let invitee = seed_user(&pool, "invitee").await;
    let group = seed_group(&pool, &owner, 10).await;

    // Truncate to microseconds so the value round-trips through timestamptz
    // unchanged; the boundary comparison below relies on exact equality.
    let expires_at = (Utc::now() + Duration::days(7))
        .duration_trunc(Duration::microseconds(1))
        .unwrap();
    let (_, token) = seed_invitation(&pool, &group, owner.id, &invitee.email, expires_at).await;

    // An invitation lapses strictly after expires_at, not at it.
    let outcome = InvitationRepository::new(pool.clone())
        .accept(&token, invitee.id, expires_at)
        .await
        .unwrap();
    match outcome {
        AcceptOutcome::Accepted { invitation, member } => {
            assert_eq!(invitation.status, InvitationStatusDb::Accepted);
            assert_eq!(member.user_id, invitee.id);
        }
        other => panic!("expected Accepted, got {:?}", other),
    }
}

#[sqlx::test]
async fn test_accept_past_expiry_stores_expired(pool: PgPool) {
    let owner = seed_user(&pool, "owner").await;
    let invitee = seed_user(&pool, "invitee").await;
    let group = seed_group(&pool, &owner, 10).await;

    let expires_at = Utc::now() - Duration::days(1);
    let (_, token) = seed_invitation(&pool, &group, owner.id, &invitee.email, expires_at).await;

    let invitations = InvitationRepository::new(pool.clone());
    let outcome = invitations.accept(&token, invitee.id, Utc::now()).await.unwrap();
    assert!(matches!(outcome, AcceptOutcome::Lapsed));

    // The lapse is persisted and no membership was created.
    let stored = invitations.find_by_token(&token).await.unwrap().unwrap();
    assert_eq!(stored.status, InvitationStatusDb::Expired);
    let members = GroupMemberRepository::new(pool.clone());
    assert!(members.find_active(group.id, invitee.id).await.unwrap().is_none());
}

#[sqlx::test]
async fn test_accept_into_full_group_leaves_invitation_pending(pool: PgPool) {
    let owner = seed_user(&pool, "owner").await;
    let second = seed_user(&pool, "second").await;
    let invitee = seed_user(&pool, "invitee").await;
    let group = seed_group(&pool, &owner, 2).await;

    let members = GroupMemberRepository::new(pool.clone());
    let filled = members
        .add_member(
            group.id,
            second.id,
            GroupRoleDb::Member,
            Some(owner.id),
            Some(owner.id),
            Utc::now(),
        )
        .await
        .unwrap();
    assert!(matches!(filled, AddMemberOutcome::Added(_)));

    let expires_at = Utc::now() + Duration::days(7);
    let (_, token) = seed_invitation(&pool, &group, owner.id, &invitee.email, expires_at).await;

    let invitations = InvitationRepository::new(pool.clone());
    let outcome = invitations.accept(&token, invitee.id, Utc::now()).await.unwrap();
    assert!(matches!(
        outcome,
        AcceptOutcome::CapacityReached { max_members: 2 }
    ));

    // Nothing was consumed: the invitation can still be accepted once a
    // slot frees up.
    let stored = invitations.find_by_token(&token).await.unwrap().unwrap();
    assert_eq!(stored.status, InvitationStatusDb::Pending);
    assert!(members.find_active(group.id, invitee.id).await.unwrap().is_none());
}

// =============================================================================
// Tombstone cascade
// =============================================================================

#[sqlx::test]
async fn test_group_tombstone_cascade_hides_children(pool: PgPool) {
    let owner = seed_user(&pool, "owner").await;
    let second = seed_user(&pool, "second").await;
    let group = seed_group(&pool, &owner, 10).await;
    let list = seed_list(&pool, &group, &owner).await;
    let item = seed_item(&pool, &list, &owner).await;

    let members = GroupMemberRepository::new(pool.clone());
    members
        .add_member(
            group.id,
            second.id,
            GroupRoleDb::Member,
            Some(owner.id),
            Some(owner.id),
            Utc::now(),
        )
        .await
        .unwrap();

    let groups = GroupRepository::new(pool.clone());
    assert!(groups
        .soft_delete_cascade(group.id, Some(owner.id), Utc::now())
        .await
        .unwrap());

    assert!(groups.find_by_id(group.id).await.unwrap().is_none());
    assert!(ShoppingListRepository::new(pool.clone())
        .find_by_id(list.id)
        .await
        .unwrap()
        .is_none());
    assert!(ShoppingItemRepository::new(pool.clone())
        .find_by_id(item.id)
        .await
        .unwrap()
        .is_none());
    assert!(members.find_active(group.id, owner.id).await.unwrap().is_none());
    assert!(members.find_active(group.id, second.id).await.unwrap().is_none());

    // The rows survive for audit reads.
    let tombstoned = groups.find_by_id_any(group.id).await.unwrap().unwrap();
    assert!(tombstoned.tombstone.is_deleted);
}
