//! Integration tests for `SqliteStore` and `SqliteIdentities` against an
//! in-memory database.

use attendly_core::{
  identity::NewIdentity,
  invite::{Invite, InviteScheme},
  profile::{AdminProfile, ProfessorProfile, Profile, StudentProfile, AccountStatus},
  role::UserType,
  store::{AccountStore, IdentityAdmin},
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn student(id: Uuid, number: &str) -> StudentProfile {
  StudentProfile {
    id,
    first_name:     "John".into(),
    middle_name:    None,
    last_name:      "Doe".into(),
    student_number: number.into(),
    email:          "john.doe@gmail.com".into(),
    department:     "CCS".into(),
    program:        "BSCS".into(),
    year_level:     "2".into(),
    section:        "A".into(),
    status:         AccountStatus::Active,
    archived:       false,
  }
}

fn invite(scheme: InviteScheme, token: &str, user_type: UserType) -> Invite {
  Invite {
    id: Uuid::new_v4(),
    token: token.into(),
    email: "invitee@x.com".into(),
    user_type,
    expires_at: Utc::now() + Duration::days(3),
    used_at: None,
    is_active: true,
    scheme,
  }
}

// ─── Identities ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_identity() {
  let ids = store().await.identities();

  let created = ids
    .create_user(NewIdentity::verified("jane@x.com", "Secret123", UserType::Admin, "Jane Doe"))
    .await
    .unwrap();
  assert!(created.email_verified);

  let fetched = ids.get_user(created.id).await.unwrap().unwrap();
  assert_eq!(fetched.email, "jane@x.com");
}

#[tokio::test]
async fn duplicate_email_is_rejected_case_insensitively() {
  let ids = store().await.identities();
  ids
    .create_user(NewIdentity::verified("jane@x.com", "Secret123", UserType::Admin, "Jane"))
    .await
    .unwrap();

  let err = ids
    .create_user(NewIdentity::verified("JANE@x.com", "Other456", UserType::Admin, "Jane"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::EmailTaken(_)), "got {err:?}");
}

#[tokio::test]
async fn password_is_hashed_and_verifiable() {
  let ids = store().await.identities();
  ids
    .create_user(NewIdentity::verified("p@x.com", "hunter22", UserType::Professor, "P"))
    .await
    .unwrap();

  assert!(ids.verify_password("p@x.com", "hunter22").await.unwrap().is_some());
  assert!(ids.verify_password("p@x.com", "wrong").await.unwrap().is_none());
  assert!(ids.verify_password("nobody@x.com", "hunter22").await.unwrap().is_none());
}

#[tokio::test]
async fn delete_identity_then_missing() {
  let ids = store().await.identities();
  let created = ids
    .create_user(NewIdentity::verified("d@x.com", "secret1", UserType::Student, "D"))
    .await
    .unwrap();

  ids.delete_user(created.id).await.unwrap();
  assert!(ids.get_user(created.id).await.unwrap().is_none());

  let err = ids.delete_user(created.id).await.unwrap_err();
  assert!(matches!(err, Error::IdentityNotFound(id) if id == created.id));
}

// ─── Profiles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_admin_and_get_profile() {
  let s = store().await;
  let id = Uuid::new_v4();
  s.insert_admin(AdminProfile::new(id, "Jane Doe".into(), "jane@x.com".into()))
    .await
    .unwrap();

  match s.get_profile(id).await.unwrap() {
    Some(Profile::Admin(a)) => {
      assert_eq!(a.admin_name, "Jane Doe");
      assert_eq!(a.role, "Admin");
    }
    other => panic!("expected admin, got {other:?}"),
  }
}

#[tokio::test]
async fn duplicate_professor_email_is_a_duplicate_error() {
  let s = store().await;
  s.insert_professor(ProfessorProfile::new(
    Uuid::new_v4(),
    "Ada Lovelace".into(),
    "ada@x.com".into(),
    "CS".into(),
  ))
  .await
  .unwrap();

  let err = s
    .insert_professor(ProfessorProfile::new(
      Uuid::new_v4(),
      "Ada Again".into(),
      "ada@x.com".into(),
      "CS".into(),
    ))
    .await
    .unwrap_err();
  assert!(err.is_duplicate(), "got {err:?}");
}

#[tokio::test]
async fn upsert_student_overwrites_same_id() {
  let s = store().await;
  let id = Uuid::new_v4();
  s.upsert_student(student(id, "2021-0001")).await.unwrap();

  let mut updated = student(id, "2021-0001");
  updated.section = "B".into();
  s.upsert_student(updated).await.unwrap();

  match s.get_profile(id).await.unwrap() {
    Some(Profile::Student(st)) => assert_eq!(st.section, "B"),
    other => panic!("expected student, got {other:?}"),
  }
}

#[tokio::test]
async fn delete_profiles_spans_all_tables() {
  let s = store().await;
  let id = Uuid::new_v4();
  s.upsert_student(student(id, "2021-0002")).await.unwrap();

  assert_eq!(s.delete_profiles(id).await.unwrap(), 1);
  assert!(s.get_profile(id).await.unwrap().is_none());
  assert_eq!(s.delete_profiles(id).await.unwrap(), 0);
}

// ─── Invitations ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn find_invite_by_exact_token() {
  let s = store().await;
  let inv = invite(InviteScheme::Primary, "abc", UserType::Professor);
  s.insert_invite(&inv).await.unwrap();

  let found = s.find_invite(InviteScheme::Primary, "abc").await.unwrap().unwrap();
  assert_eq!(found.id, inv.id);
  assert_eq!(found.user_type, UserType::Professor);

  assert!(s.find_invite(InviteScheme::Primary, "ab").await.unwrap().is_none());
  assert!(s.find_invite(InviteScheme::LegacyAdmin, "abc").await.unwrap().is_none());
}

#[tokio::test]
async fn legacy_invites_are_always_admin() {
  let s = store().await;
  let inv = invite(InviteScheme::LegacyAdmin, "legacy", UserType::Admin);
  s.insert_invite(&inv).await.unwrap();

  let found = s
    .find_invite(InviteScheme::LegacyAdmin, "legacy")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(found.user_type, UserType::Admin);
  assert_eq!(found.scheme, InviteScheme::LegacyAdmin);
}

#[tokio::test]
async fn reserve_is_exclusive_until_released() {
  let s = store().await;
  let inv = invite(InviteScheme::Primary, "once", UserType::Student);
  s.insert_invite(&inv).await.unwrap();

  assert!(s.reserve_invite(InviteScheme::Primary, inv.id).await.unwrap());
  assert!(!s.reserve_invite(InviteScheme::Primary, inv.id).await.unwrap());

  s.release_invite(InviteScheme::Primary, inv.id).await.unwrap();
  assert!(s.reserve_invite(InviteScheme::Primary, inv.id).await.unwrap());
}

#[tokio::test]
async fn used_invite_cannot_be_released_or_reserved() {
  let s = store().await;
  let inv = invite(InviteScheme::Primary, "used", UserType::Admin);
  s.insert_invite(&inv).await.unwrap();

  assert!(s.reserve_invite(InviteScheme::Primary, inv.id).await.unwrap());
  assert!(s.mark_invite_used(InviteScheme::Primary, inv.id, Utc::now()).await.unwrap());

  s.release_invite(InviteScheme::Primary, inv.id).await.unwrap();
  let row = s.find_invite(InviteScheme::Primary, "used").await.unwrap().unwrap();
  assert!(row.used_at.is_some());
  assert!(!row.is_active);
  assert!(!s.reserve_invite(InviteScheme::Primary, inv.id).await.unwrap());
  assert!(!s.mark_invite_used(InviteScheme::Primary, inv.id, Utc::now()).await.unwrap());
}

#[tokio::test]
async fn concurrent_reservations_have_one_winner() {
  let s = store().await;
  let inv = invite(InviteScheme::Primary, "race", UserType::Professor);
  s.insert_invite(&inv).await.unwrap();

  let handles: Vec<_> = (0..8)
    .map(|_| {
      let s = s.clone();
      tokio::spawn(async move { s.reserve_invite(InviteScheme::Primary, inv.id).await })
    })
    .collect();

  let mut wins = 0;
  for h in handles {
    if h.await.unwrap().unwrap() {
      wins += 1;
    }
  }
  assert_eq!(wins, 1);
}
