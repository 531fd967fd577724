//! Collaborator traits for the provisioning workflow.
//!
//! The orchestrator (`attendly-provision`) drives three independently-failing
//! external systems through these traits: an identity provider, a relational
//! store, and a transactional mail sender. Backends live in
//! `attendly-store-sqlite` (local) and `attendly-remote` (hosted).

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  identity::{Identity, NewIdentity},
  invite::{Invite, InviteScheme},
  mail::{MailReceipt, OutgoingEmail},
  profile::{AdminProfile, ProfessorProfile, Profile, StudentProfile},
};

// ─── Identity provider ───────────────────────────────────────────────────────

/// Privileged access to the identity provider's credential store.
pub trait IdentityAdmin: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create an identity. Fails if the email is already registered.
  fn create_user(
    &self,
    input: NewIdentity,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_;

  /// Delete an identity. The provider's error message is surfaced verbatim
  /// through `Self::Error`'s `Display`.
  fn delete_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Look an identity up by id. Returns `None` if it does not exist.
  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;
}

// ─── Relational store ────────────────────────────────────────────────────────

/// Privileged access to the profile tables and the invitation tables.
pub trait AccountStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Profiles ──────────────────────────────────────────────────────────

  fn insert_admin(
    &self,
    profile: AdminProfile,
  ) -> impl Future<Output = Result<AdminProfile, Self::Error>> + Send + '_;

  fn insert_professor(
    &self,
    profile: ProfessorProfile,
  ) -> impl Future<Output = Result<ProfessorProfile, Self::Error>> + Send + '_;

  /// Insert a student, or overwrite the row with the same id.
  fn upsert_student(
    &self,
    profile: StudentProfile,
  ) -> impl Future<Output = Result<StudentProfile, Self::Error>> + Send + '_;

  /// Find the profile keyed by `id` in whichever role table holds it.
  fn get_profile(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  /// Delete every profile row keyed by `id` across all role tables.
  /// Returns the number of rows removed.
  fn delete_profiles(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Invitations ───────────────────────────────────────────────────────

  /// Return the invitation with exactly this token in `scheme`'s table, if
  /// any. Tokens are unique, so at most one row is ever returned.
  fn find_invite<'a>(
    &'a self,
    scheme: InviteScheme,
    token: &'a str,
  ) -> impl Future<Output = Result<Option<Invite>, Self::Error>> + Send + 'a;

  /// Atomically claim an invitation for redemption: a single conditional
  /// update that flips `is_active` to false only while the row is still
  /// active and unused. Returns `true` iff this call won the claim.
  fn reserve_invite(
    &self,
    scheme: InviteScheme,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Undo [`reserve_invite`](Self::reserve_invite) after a failed
  /// redemption. Has no effect on an invitation already marked used.
  fn release_invite(
    &self,
    scheme: InviteScheme,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Stamp `used_at` on a reserved invitation. Returns `false` if no row
  /// was updated.
  fn mark_invite_used(
    &self,
    scheme: InviteScheme,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Mail ────────────────────────────────────────────────────────────────────

/// A transactional-email sender. One attempt per call; no retry.
pub trait Mailer: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn send<'a>(
    &'a self,
    email: &'a OutgoingEmail,
  ) -> impl Future<Output = Result<MailReceipt, Self::Error>> + Send + 'a;
}
