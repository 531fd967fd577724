//! Role-specific profile rows.
//!
//! Every profile is keyed by the id of the identity it belongs to (a shared
//! primary key, not a separate foreign key plus surrogate id).

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::role::UserType;

/// Dashboard-visible account status.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display,
  EnumString, AsRefStr,
)]
pub enum AccountStatus {
  #[default]
  Active,
  Inactive,
}

/// Role label written to new admin rows.
pub const DEFAULT_ADMIN_ROLE: &str = "Admin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminProfile {
  pub id:         Uuid,
  pub admin_name: String,
  /// Admins sign in with their email, so the username is the email.
  pub username:   String,
  pub role:       String,
  pub status:     AccountStatus,
}

impl AdminProfile {
  pub fn new(id: Uuid, admin_name: String, email: String) -> Self {
    Self {
      id,
      admin_name,
      username: email,
      role: DEFAULT_ADMIN_ROLE.to_owned(),
      status: AccountStatus::Active,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfessorProfile {
  pub id:             Uuid,
  pub professor_name: String,
  pub email:          String,
  pub department:     String,
  pub status:         AccountStatus,
  pub archived:       bool,
}

impl ProfessorProfile {
  /// A new professor with the default flags: active and not archived.
  pub fn new(
    id: Uuid,
    professor_name: String,
    email: String,
    department: String,
  ) -> Self {
    Self {
      id,
      professor_name,
      email,
      department,
      status: AccountStatus::Active,
      archived: false,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
  pub id:             Uuid,
  pub first_name:     String,
  pub middle_name:    Option<String>,
  pub last_name:      String,
  pub student_number: String,
  /// Contact address. Distinct from the synthetic login email of the
  /// student's identity.
  pub email:          String,
  pub department:     String,
  pub program:        String,
  pub year_level:     String,
  pub section:        String,
  pub status:         AccountStatus,
  pub archived:       bool,
}

impl StudentProfile {
  pub fn full_name(&self) -> String {
    match self.middle_name.as_deref() {
      Some(m) if !m.is_empty() => {
        format!("{} {} {}", self.first_name, m, self.last_name)
      }
      _ => format!("{} {}", self.first_name, self.last_name),
    }
  }
}

/// Any profile row, tagged by role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "user_type", rename_all = "lowercase")]
pub enum Profile {
  Admin(AdminProfile),
  Professor(ProfessorProfile),
  Student(StudentProfile),
}

impl Profile {
  pub fn id(&self) -> Uuid {
    match self {
      Profile::Admin(p) => p.id,
      Profile::Professor(p) => p.id,
      Profile::Student(p) => p.id,
    }
  }

  pub fn user_type(&self) -> UserType {
    match self {
      Profile::Admin(_) => UserType::Admin,
      Profile::Professor(_) => UserType::Professor,
      Profile::Student(_) => UserType::Student,
    }
  }
}
