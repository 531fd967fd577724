//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, and
//! booleans `0`/`1` integers.

use attendly_core::{
  invite::{Invite, InviteScheme},
  profile::{AccountStatus, AdminProfile, ProfessorProfile, StudentProfile},
  role::UserType,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_status(s: AccountStatus) -> &'static str {
  match s {
    AccountStatus::Active => "Active",
    AccountStatus::Inactive => "Inactive",
  }
}

pub fn decode_status(s: &str) -> Result<AccountStatus> {
  match s {
    "Active" => Ok(AccountStatus::Active),
    "Inactive" => Ok(AccountStatus::Inactive),
    other => Err(Error::Decode(format!("unknown account status: {other:?}"))),
  }
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

pub struct RawAdmin {
  pub id:         String,
  pub admin_name: String,
  pub username:   String,
  pub role:       String,
  pub status:     String,
}

impl RawAdmin {
  pub fn into_profile(self) -> Result<AdminProfile> {
    Ok(AdminProfile {
      id:         decode_uuid(&self.id)?,
      admin_name: self.admin_name,
      username:   self.username,
      role:       self.role,
      status:     decode_status(&self.status)?,
    })
  }
}

pub struct RawProfessor {
  pub id:             String,
  pub professor_name: String,
  pub email:          String,
  pub department:     String,
  pub status:         String,
  pub archived:       bool,
}

impl RawProfessor {
  pub fn into_profile(self) -> Result<ProfessorProfile> {
    Ok(ProfessorProfile {
      id:             decode_uuid(&self.id)?,
      professor_name: self.professor_name,
      email:          self.email,
      department:     self.department,
      status:         decode_status(&self.status)?,
      archived:       self.archived,
    })
  }
}

pub struct RawStudent {
  pub id:             String,
  pub first_name:     String,
  pub middle_name:    Option<String>,
  pub last_name:      String,
  pub student_number: String,
  pub email:          String,
  pub department:     String,
  pub program:        String,
  pub year_level:     String,
  pub section:        String,
  pub status:         String,
  pub archived:       bool,
}

impl RawStudent {
  pub fn into_profile(self) -> Result<StudentProfile> {
    Ok(StudentProfile {
      id:             decode_uuid(&self.id)?,
      first_name:     self.first_name,
      middle_name:    self.middle_name,
      last_name:      self.last_name,
      student_number: self.student_number,
      email:          self.email,
      department:     self.department,
      program:        self.program,
      year_level:     self.year_level,
      section:        self.section,
      status:         decode_status(&self.status)?,
      archived:       self.archived,
    })
  }
}

pub struct RawInvite {
  pub id:         String,
  pub token:      String,
  pub email:      String,
  /// `None` for legacy admin invitations, which have no such column.
  pub user_type:  Option<String>,
  pub expires_at: String,
  pub used_at:    Option<String>,
  pub is_active:  bool,
}

impl RawInvite {
  pub fn into_invite(self, scheme: InviteScheme) -> Result<Invite> {
    let user_type = match (scheme, self.user_type) {
      (InviteScheme::LegacyAdmin, _) => UserType::Admin,
      (InviteScheme::Primary, Some(t)) => UserType::parse(&t)?,
      (InviteScheme::Primary, None) => {
        return Err(attendly_core::Error::UnknownUserType(String::new()).into());
      }
    };
    Ok(Invite {
      id: decode_uuid(&self.id)?,
      token: self.token,
      email: self.email,
      user_type,
      expires_at: decode_dt(&self.expires_at)?,
      used_at: self.used_at.as_deref().map(decode_dt).transpose()?,
      is_active: self.is_active,
      scheme,
    })
  }
}

pub struct RawIdentity {
  pub id:             String,
  pub email:          String,
  pub email_verified: bool,
  pub created_at:     String,
}

impl RawIdentity {
  pub fn into_identity(self) -> Result<attendly_core::identity::Identity> {
    Ok(attendly_core::identity::Identity {
      id:             decode_uuid(&self.id)?,
      email:          self.email,
      email_verified: self.email_verified,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}
