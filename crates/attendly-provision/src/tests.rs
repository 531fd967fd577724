//! Saga tests against the SQLite backend, with doubles for the mail sender
//! and for a profile store that fails on demand.

use std::sync::{Arc, Mutex};

use attendly_core::{
  identity::{Identity, NewIdentity},
  invite::{Invite, InviteScheme},
  mail::{MailReceipt, OutgoingEmail},
  profile::{AdminProfile, ProfessorProfile, Profile, StudentProfile},
  role::UserType,
  store::{AccountStore, IdentityAdmin, Mailer},
};
use attendly_store_sqlite::{SqliteIdentities, SqliteStore};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
  error::Step,
  invite::{InviteStrategy, InviteVerification},
  provisioner::{ProvisionConfig, Provisioner},
  request::{
    CreateAdminRequest, CreateProfessorRequest, CreateStudentRequest,
    DeleteAccountRequest, RegisterInvitedRequest,
  },
};

// ─── Doubles ─────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct MailError(String);

/// Records every email; fails every send when `reject` is set.
#[derive(Clone, Default)]
struct RecordingMailer {
  sent:   Arc<Mutex<Vec<OutgoingEmail>>>,
  reject: Option<String>,
}

impl RecordingMailer {
  fn rejecting(message: &str) -> Self {
    Self { reject: Some(message.to_owned()), ..Default::default() }
  }

  fn sent(&self) -> Vec<OutgoingEmail> { self.sent.lock().unwrap().clone() }
}

impl Mailer for RecordingMailer {
  type Error = MailError;

  async fn send<'a>(&'a self, email: &'a OutgoingEmail) -> Result<MailReceipt, MailError> {
    if let Some(message) = &self.reject {
      return Err(MailError(message.clone()));
    }
    self.sent.lock().unwrap().push(email.clone());
    Ok(MailReceipt::from_body(201, r#"{"messageId":"<test@brevo>"}"#))
  }
}

/// Delegates to [`SqliteStore`], except that profile writes or the final
/// invite update can be made to fail.
#[derive(Clone)]
struct FlakyStore {
  inner:         SqliteStore,
  fail_profiles: bool,
  fail_mark:     bool,
}

type StoreError = attendly_store_sqlite::Error;

fn injected() -> StoreError { StoreError::Decode("injected failure".into()) }

impl AccountStore for FlakyStore {
  type Error = StoreError;

  async fn insert_admin(&self, p: AdminProfile) -> Result<AdminProfile, StoreError> {
    if self.fail_profiles {
      return Err(injected());
    }
    self.inner.insert_admin(p).await
  }

  async fn insert_professor(&self, p: ProfessorProfile) -> Result<ProfessorProfile, StoreError> {
    if self.fail_profiles {
      return Err(injected());
    }
    self.inner.insert_professor(p).await
  }

  async fn upsert_student(&self, p: StudentProfile) -> Result<StudentProfile, StoreError> {
    if self.fail_profiles {
      return Err(injected());
    }
    self.inner.upsert_student(p).await
  }

  async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
    self.inner.get_profile(id).await
  }

  async fn delete_profiles(&self, id: Uuid) -> Result<u64, StoreError> {
    self.inner.delete_profiles(id).await
  }

  async fn find_invite<'a>(
    &'a self,
    scheme: InviteScheme,
    token: &'a str,
  ) -> Result<Option<Invite>, StoreError> {
    self.inner.find_invite(scheme, token).await
  }

  async fn reserve_invite(&self, scheme: InviteScheme, id: Uuid) -> Result<bool, StoreError> {
    self.inner.reserve_invite(scheme, id).await
  }

  async fn release_invite(&self, scheme: InviteScheme, id: Uuid) -> Result<(), StoreError> {
    self.inner.release_invite(scheme, id).await
  }

  async fn mark_invite_used(
    &self,
    scheme: InviteScheme,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> Result<bool, StoreError> {
    if self.fail_mark {
      return Err(injected());
    }
    self.inner.mark_invite_used(scheme, id, at).await
  }
}

/// Identity provider whose deletes always fail.
#[derive(Clone)]
struct UndeletableIdentities(SqliteIdentities);

impl IdentityAdmin for UndeletableIdentities {
  type Error = StoreError;

  async fn create_user(&self, input: NewIdentity) -> Result<Identity, StoreError> {
    self.0.create_user(input).await
  }

  async fn delete_user(&self, _id: Uuid) -> Result<(), StoreError> {
    Err(StoreError::Decode("provider unavailable".into()))
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
    self.0.get_user(id).await
  }
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

struct Harness {
  db:     SqliteStore,
  mailer: RecordingMailer,
  p:      Provisioner<SqliteIdentities, FlakyStore, RecordingMailer>,
}

async fn harness_with(mailer: Option<RecordingMailer>, fail_profiles: bool, fail_mark: bool) -> Harness {
  let db = SqliteStore::open_in_memory().await.unwrap();
  let store = FlakyStore { inner: db.clone(), fail_profiles, fail_mark };
  let recorder = mailer.clone().unwrap_or_default();
  let config = ProvisionConfig {
    student_login_domain: "students.school.edu".into(),
    app_name:             "Attendly".into(),
    login_url:            Some("https://attendly.app/login".into()),
  };
  let p = Provisioner::new(db.identities(), store, mailer, config);
  Harness { db, mailer: recorder, p }
}

async fn harness() -> Harness { harness_with(Some(RecordingMailer::default()), false, false).await }

fn some(s: &str) -> Option<String> { Some(s.to_owned()) }

fn admin_request(email: &str) -> CreateAdminRequest {
  CreateAdminRequest {
    first_name:    some("Jane"),
    last_name:     some("Doe"),
    email:         some(email),
    temp_password: some("Secret123"),
  }
}

fn student_request(number: &str) -> CreateStudentRequest {
  CreateStudentRequest {
    student_number: some(number),
    student_email:  some("John.Cruz@Gmail.com"),
    first_name:     some("John"),
    middle_name:    None,
    last_name:      some("Dela Cruz"),
    department:     some("CCS"),
    program:        some("BSCS"),
    year_level:     some("1"),
    section:        some("A"),
    login_password: None,
  }
}

fn invite(scheme: InviteScheme, token: &str, email: &str, user_type: UserType) -> Invite {
  Invite {
    id: Uuid::new_v4(),
    token: token.into(),
    email: email.into(),
    user_type,
    expires_at: Utc::now() + Duration::days(7),
    used_at: None,
    is_active: true,
    scheme,
  }
}

fn invited_professor(token: &str) -> RegisterInvitedRequest {
  RegisterInvitedRequest {
    token:      some(token),
    user_type:  some("professor"),
    password:   some("Secret123"),
    first_name: some("Ada"),
    last_name:  some("Lovelace"),
    department: some("CS"),
    ..Default::default()
  }
}

fn invited_admin(token: &str) -> RegisterInvitedRequest {
  RegisterInvitedRequest {
    token:      some(token),
    user_type:  some("admin"),
    password:   some("Secret123"),
    first_name: some("Grace"),
    last_name:  some("Hopper"),
    ..Default::default()
  }
}

async fn stored_invite(db: &SqliteStore, i: &Invite) -> Invite {
  db.find_invite(i.scheme, &i.token).await.unwrap().unwrap()
}

// ─── Direct creation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn create_admin_writes_identity_profile_and_email() {
  let h = harness().await;

  let out = h.p.create_admin(&admin_request("Jane@X.com")).await.unwrap();

  let identity = h.db.identities().get_user(out.admin_id).await.unwrap().unwrap();
  assert_eq!(identity.email, "jane@x.com");
  assert!(identity.email_verified);

  assert_eq!(out.admin.admin_name, "Jane Doe");
  assert_eq!(out.admin.username, "jane@x.com");
  assert_eq!(out.admin.role, "Admin");
  assert!(matches!(
    h.db.get_profile(out.admin_id).await.unwrap(),
    Some(Profile::Admin(_))
  ));

  let sent = h.mailer.sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].to.email, "jane@x.com");
  assert!(sent[0].html_body.contains("Secret123"));
  assert_eq!(out.brevo.status, 201);
}

#[tokio::test]
async fn create_professor_stores_department() {
  let h = harness().await;
  let req = CreateProfessorRequest {
    first_name: some("Ada"),
    last_name:  some("Lovelace"),
    email:      some("ada@uni.edu"),
    department: some("CS"),
    password:   some("analytical"),
  };

  let out = h.p.create_professor(&req).await.unwrap();
  assert_eq!(out.professor.department, "CS");
  assert_eq!(out.professor.professor_name, "Ada Lovelace");
  assert!(!out.professor.archived);
  assert_eq!(h.mailer.sent().len(), 1);
}

#[tokio::test]
async fn create_student_uses_synthetic_login_and_default_password() {
  let h = harness().await;

  let out = h.p.create_student(&student_request("2021-0001")).await.unwrap();

  assert_eq!(out.login_email, "2021-0001@students.school.edu");
  assert_eq!(out.student.email, "john.cruz@gmail.com");

  let identity = h.db.identities().get_user(out.student_id).await.unwrap().unwrap();
  assert_eq!(identity.email, out.login_email);
  let verified = h
    .db
    .identities()
    .verify_password(&out.login_email, "DELACRUZ2021-0001")
    .await
    .unwrap();
  assert!(verified.is_some());

  // The credentials go to the contact address, not the login address.
  let sent = h.mailer.sent();
  assert_eq!(sent[0].to.email, "john.cruz@gmail.com");
  assert!(sent[0].html_body.contains("2021-0001@students.school.edu"));
}

#[tokio::test]
async fn validation_failure_creates_nothing() {
  let h = harness().await;
  let mut req = admin_request("jane@x.com");
  req.first_name = some("   ");

  let err = h.p.create_admin(&req).await.unwrap_err();
  assert_eq!(err.step, Step::Validate);
  assert_eq!(err.message, "first_name is required");
  assert!(h.mailer.sent().is_empty());

  // No identity.
  let signed_in = h.db.identities().verify_password("jane@x.com", "Secret123").await.unwrap();
  assert!(signed_in.is_none());

  // No admin profile: the username is still free.
  h.db
    .insert_admin(AdminProfile::new(Uuid::new_v4(), "Jane Doe".into(), "jane@x.com".into()))
    .await
    .unwrap();
}

#[tokio::test]
async fn missing_mailer_fails_at_env_before_side_effects() {
  let h = harness_with(None, false, false).await;

  let err = h.p.create_admin(&admin_request("jane@x.com")).await.unwrap_err();
  assert_eq!(err.step, Step::Env);

  let ok = h
    .db
    .identities()
    .create_user(NewIdentity::verified("jane@x.com", "Secret123", UserType::Admin, "Jane"))
    .await;
  assert!(ok.is_ok(), "no identity should have been created");
}

#[tokio::test]
async fn duplicate_email_fails_at_create_user() {
  let h = harness().await;
  h.p.create_admin(&admin_request("jane@x.com")).await.unwrap();

  let err = h.p.create_admin(&admin_request("JANE@x.com")).await.unwrap_err();
  assert_eq!(err.step, Step::CreateUser);
  assert_eq!(err.message, "a user with this email address has already been registered");
  assert_eq!(h.mailer.sent().len(), 1);
}

#[tokio::test]
async fn failed_profile_insert_deletes_the_identity() {
  let h = harness_with(Some(RecordingMailer::default()), true, false).await;

  let err = h.p.create_admin(&admin_request("jane@x.com")).await.unwrap_err();
  assert_eq!(err.step, Step::InsertAdmin);
  assert_eq!(err.details.as_ref().unwrap()["identity_deleted"], true);
  assert!(h.mailer.sent().is_empty());

  // Compensated: the email can be registered again.
  h.db
    .identities()
    .create_user(NewIdentity::verified("jane@x.com", "Secret123", UserType::Admin, "Jane"))
    .await
    .unwrap();
}

#[tokio::test]
async fn failed_student_upsert_is_reported_as_upsert_student() {
  let h = harness_with(Some(RecordingMailer::default()), true, false).await;
  let err = h.p.create_student(&student_request("2021-0002")).await.unwrap_err();
  assert_eq!(err.step, Step::UpsertStudent);
}

#[tokio::test]
async fn failed_compensation_reports_the_orphaned_identity() {
  let db = SqliteStore::open_in_memory().await.unwrap();
  let store = FlakyStore { inner: db.clone(), fail_profiles: true, fail_mark: false };
  let p = Provisioner::new(
    UndeletableIdentities(db.identities()),
    store,
    Some(RecordingMailer::default()),
    ProvisionConfig::default(),
  );

  let err = p.create_admin(&admin_request("jane@x.com")).await.unwrap_err();
  assert_eq!(err.step, Step::InsertAdmin);
  let details = err.details.unwrap();
  assert_eq!(details["identity_deleted"], false);
  assert!(details["orphaned_identity"].is_string());
}

#[tokio::test]
async fn email_failure_keeps_the_account() {
  let h = harness_with(Some(RecordingMailer::rejecting("Key not found")), false, false).await;

  let err = h.p.create_admin(&admin_request("jane@x.com")).await.unwrap_err();
  assert_eq!(err.step, Step::BrevoSend);
  assert_eq!(err.message, "Key not found");

  let details = err.details.unwrap();
  assert_eq!(details["account_created"], true);
  let id: Uuid = serde_json::from_value(details["user_id"].clone()).unwrap();
  assert!(h.db.identities().get_user(id).await.unwrap().is_some());
  assert!(h.db.get_profile(id).await.unwrap().is_some());
}

// ─── Invited registration ────────────────────────────────────────────────────

#[tokio::test]
async fn invited_professor_is_registered_and_invite_consumed() {
  let h = harness().await;
  let inv = invite(InviteScheme::Primary, "tok-prof", "ada@uni.edu", UserType::Professor);
  h.db.insert_invite(&inv).await.unwrap();

  let out = h.p.register_invited_user(&invited_professor("tok-prof")).await.unwrap();

  assert_eq!(out.user_type, UserType::Professor);
  let identity = h.db.identities().get_user(out.user_id).await.unwrap().unwrap();
  assert_eq!(identity.email, "ada@uni.edu");
  match out.profile {
    Profile::Professor(p) => {
      assert_eq!(p.email, "ada@uni.edu");
      assert_eq!(p.department, "CS");
    }
    other => panic!("unexpected profile {other:?}"),
  }

  let after = stored_invite(&h.db, &inv).await;
  assert!(after.used_at.is_some());
  assert!(!after.is_active);
  // Invited accounts get no credentials email.
  assert!(h.mailer.sent().is_empty());
}

#[tokio::test]
async fn invited_password_is_stored_verbatim() {
  let h = harness().await;
  let i = invite(InviteScheme::Primary, "tok-1", "ada@uni.edu", UserType::Professor);
  h.db.insert_invite(&i).await.unwrap();

  let mut req = invited_professor("tok-1");
  req.password = some("  my pass phrase  ");
  h.p.register_invited_user(&req).await.unwrap();

  let ids = h.db.identities();
  let exact = ids.verify_password("ada@uni.edu", "  my pass phrase  ").await.unwrap();
  assert!(exact.is_some());
  let stripped = ids.verify_password("ada@uni.edu", "my pass phrase").await.unwrap();
  assert!(stripped.is_none());
}

#[tokio::test]
async fn invited_student_signs_in_with_synthetic_login() {
  let h = harness().await;
  let inv = invite(InviteScheme::Primary, "tok-stu", "john@gmail.com", UserType::Student);
  h.db.insert_invite(&inv).await.unwrap();

  let req = RegisterInvitedRequest {
    token:          some("tok-stu"),
    user_type:      some("student"),
    password:       some("Secret123"),
    first_name:     some("John"),
    last_name:      some("Cruz"),
    department:     some("CCS"),
    student_number: some("2022-0042"),
    program:        some("BSIT"),
    year_level:     some("2"),
    section:        some("B"),
    ..Default::default()
  };
  let out = h.p.register_invited_user(&req).await.unwrap();

  let identity = h.db.identities().get_user(out.user_id).await.unwrap().unwrap();
  assert_eq!(identity.email, "2022-0042@students.school.edu");
  let Profile::Student(s) = out.profile else { panic!("expected student") };
  assert_eq!(s.email, "john@gmail.com");
}

#[tokio::test]
async fn used_invite_is_rejected_and_creates_nothing() {
  let h = harness().await;
  let inv = invite(InviteScheme::Primary, "tok", "ada@uni.edu", UserType::Professor);
  h.db.insert_invite(&inv).await.unwrap();
  h.p.register_invited_user(&invited_professor("tok")).await.unwrap();

  let mut again = invited_professor("tok");
  again.first_name = some("Other");
  let err = h.p.register_invited_user(&again).await.unwrap_err();
  assert_eq!(err.step, Step::Invite);
  assert_eq!(err.details.unwrap()["reason"], "already_used");
}

#[tokio::test]
async fn expired_or_mismatched_invites_are_rejected() {
  let h = harness().await;
  let mut expired = invite(InviteScheme::Primary, "old", "ada@uni.edu", UserType::Professor);
  expired.expires_at = Utc::now() - Duration::minutes(1);
  h.db.insert_invite(&expired).await.unwrap();
  let student_only = invite(InviteScheme::Primary, "stu", "ada@uni.edu", UserType::Student);
  h.db.insert_invite(&student_only).await.unwrap();

  let err = h.p.register_invited_user(&invited_professor("old")).await.unwrap_err();
  assert_eq!(err.step, Step::Invite);
  assert_eq!(err.details.unwrap()["reason"], "expired");

  let err = h.p.register_invited_user(&invited_professor("stu")).await.unwrap_err();
  assert_eq!(err.step, Step::Invite);
  assert_eq!(err.details.unwrap()["reason"], "role_mismatch");

  let err = h.p.register_invited_user(&invited_professor("nope")).await.unwrap_err();
  assert_eq!(err.step, Step::Invite);
  assert!(err.details.is_none());
}

#[tokio::test]
async fn email_must_match_the_invitation() {
  let h = harness().await;
  let inv = invite(InviteScheme::Primary, "tok", "ada@uni.edu", UserType::Professor);
  h.db.insert_invite(&inv).await.unwrap();

  let mut req = invited_professor("tok");
  req.email = some("someone@else.org");
  let err = h.p.register_invited_user(&req).await.unwrap_err();
  assert_eq!(err.step, Step::Invite);

  // Case differences are fine, and the invite is still redeemable.
  req.email = some("ADA@uni.edu");
  h.p.register_invited_user(&req).await.unwrap();
}

#[tokio::test]
async fn legacy_admin_invite_is_accepted_for_admins_only() {
  let h = harness().await;
  let legacy = invite(InviteScheme::LegacyAdmin, "legacy", "grace@navy.mil", UserType::Admin);
  h.db.insert_invite(&legacy).await.unwrap();

  let err = h.p.register_invited_user(&invited_professor("legacy")).await.unwrap_err();
  assert_eq!(err.step, Step::Invite);

  let out = h.p.register_invited_user(&invited_admin("legacy")).await.unwrap();
  assert_eq!(out.user_type, UserType::Admin);
  assert!(stored_invite(&h.db, &legacy).await.used_at.is_some());
}

#[tokio::test]
async fn verification_without_legacy_strategy_ignores_admin_invites() {
  let db = SqliteStore::open_in_memory().await.unwrap();
  let legacy = invite(InviteScheme::LegacyAdmin, "legacy", "grace@navy.mil", UserType::Admin);
  db.insert_invite(&legacy).await.unwrap();
  let store = FlakyStore { inner: db.clone(), fail_profiles: false, fail_mark: false };
  let p = Provisioner::new(db.identities(), store, None::<RecordingMailer>, ProvisionConfig::default())
    .with_invite_verification(InviteVerification::new(vec![InviteStrategy::InviteTable]));

  let err = p.register_invited_user(&invited_admin("legacy")).await.unwrap_err();
  assert_eq!(err.step, Step::Invite);
}

#[tokio::test]
async fn failed_profile_insert_releases_the_invite() {
  let h = harness_with(Some(RecordingMailer::default()), true, false).await;
  let inv = invite(InviteScheme::Primary, "tok", "ada@uni.edu", UserType::Professor);
  h.db.insert_invite(&inv).await.unwrap();

  let err = h.p.register_invited_user(&invited_professor("tok")).await.unwrap_err();
  assert_eq!(err.step, Step::InsertProfile);

  let after = stored_invite(&h.db, &inv).await;
  assert!(after.is_active);
  assert!(after.used_at.is_none());
  h.db
    .identities()
    .create_user(NewIdentity::verified("ada@uni.edu", "Secret123", UserType::Professor, "Ada"))
    .await
    .unwrap();
}

#[tokio::test]
async fn failed_create_user_releases_the_invite() {
  let h = harness().await;
  h.db
    .identities()
    .create_user(NewIdentity::verified("ada@uni.edu", "Secret123", UserType::Professor, "Ada"))
    .await
    .unwrap();
  let inv = invite(InviteScheme::Primary, "tok", "ada@uni.edu", UserType::Professor);
  h.db.insert_invite(&inv).await.unwrap();

  let err = h.p.register_invited_user(&invited_professor("tok")).await.unwrap_err();
  assert_eq!(err.step, Step::CreateUser);
  assert!(stored_invite(&h.db, &inv).await.is_active);
}

#[tokio::test]
async fn failed_invite_update_keeps_the_account_and_the_reservation() {
  let h = harness_with(Some(RecordingMailer::default()), false, true).await;
  let inv = invite(InviteScheme::Primary, "tok", "ada@uni.edu", UserType::Professor);
  h.db.insert_invite(&inv).await.unwrap();

  let err = h.p.register_invited_user(&invited_professor("tok")).await.unwrap_err();
  assert_eq!(err.step, Step::UpdateInvite);
  let id: Uuid = serde_json::from_value(err.details.unwrap()["user_id"].clone()).unwrap();
  assert!(h.db.get_profile(id).await.unwrap().is_some());

  // Still reserved, so it cannot be redeemed a second time.
  let after = stored_invite(&h.db, &inv).await;
  assert!(!after.is_active);
  assert!(after.used_at.is_none());
}

#[tokio::test]
async fn concurrent_redemptions_create_exactly_one_account() {
  let h = harness().await;
  let inv = invite(InviteScheme::Primary, "race", "ada@uni.edu", UserType::Professor);
  h.db.insert_invite(&inv).await.unwrap();

  let p = Arc::new(h.p);
  let handles: Vec<_> = (0..6)
    .map(|_| {
      let p = p.clone();
      tokio::spawn(async move { p.register_invited_user(&invited_professor("race")).await })
    })
    .collect();

  let mut ok = 0;
  for handle in handles {
    match handle.await.unwrap() {
      Ok(_) => ok += 1,
      Err(e) => assert_eq!(e.step, Step::Invite, "loser failed at {}", e.step),
    }
  }
  assert_eq!(ok, 1);
  assert!(stored_invite(&h.db, &inv).await.used_at.is_some());
}

// ─── Delete account ──────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_account_removes_profile_then_identity() {
  let h = harness().await;
  let created = h.p.create_student(&student_request("2021-0009")).await.unwrap();

  let req = DeleteAccountRequest { user_id: Some(created.student_id.to_string()) };
  let out = h.p.delete_account(&req).await.unwrap();
  assert_eq!(out.profiles_deleted, 1);

  assert!(h.db.get_profile(created.student_id).await.unwrap().is_none());
  assert!(h.db.identities().get_user(created.student_id).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_of_unknown_identity_fails_at_delete_user() {
  let h = harness().await;
  let req = DeleteAccountRequest { user_id: Some(Uuid::new_v4().to_string()) };

  let err = h.p.delete_account(&req).await.unwrap_err();
  assert_eq!(err.step, Step::DeleteUser);
  assert_eq!(err.details.unwrap()["profiles_deleted"], 0);
}
