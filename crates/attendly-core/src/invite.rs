//! Invitations: single-use, time-limited tokens authorising the creation of
//! one identity and profile pair for a specific role and email.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result, role::UserType};

/// Which invitation table a row came from.
///
/// Admin invitations were historically issued into a separate table without
/// a `user_type` column. Both tables are honoured until the old one drains.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display,
  EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InviteScheme {
  /// The `invites` table, covering every role.
  Primary,
  /// The `admin_invites` table; rows always imply [`UserType::Admin`].
  LegacyAdmin,
}

impl InviteScheme {
  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownInviteScheme(s.to_owned()))
  }

  pub fn table(self) -> &'static str {
    match self {
      InviteScheme::Primary => "invites",
      InviteScheme::LegacyAdmin => "admin_invites",
    }
  }
}

/// A stored invitation row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invite {
  pub id:         Uuid,
  pub token:      String,
  pub email:      String,
  pub user_type:  UserType,
  pub expires_at: DateTime<Utc>,
  pub used_at:    Option<DateTime<Utc>>,
  pub is_active:  bool,
  #[serde(default = "default_scheme")]
  pub scheme:     InviteScheme,
}

fn default_scheme() -> InviteScheme { InviteScheme::Primary }

/// Why an invitation cannot be redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum InviteRejection {
  RoleMismatch,
  Inactive,
  AlreadyUsed,
  Expired,
}

impl Invite {
  /// Check the redemption invariant: active, unused, unexpired and issued
  /// for `role`.
  pub fn check(
    &self,
    role: UserType,
    now: DateTime<Utc>,
  ) -> Result<(), InviteRejection> {
    if self.user_type != role {
      return Err(InviteRejection::RoleMismatch);
    }
    if self.used_at.is_some() {
      return Err(InviteRejection::AlreadyUsed);
    }
    if !self.is_active {
      return Err(InviteRejection::Inactive);
    }
    if now >= self.expires_at {
      return Err(InviteRejection::Expired);
    }
    Ok(())
  }
}
