//! Request bodies and the cheap local validation run before any external
//! call.
//!
//! Every field deserialises as optional so that a missing field surfaces as
//! a `validate` failure naming the field, rather than as a parse error.

use attendly_core::role::UserType;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ProvisionError;

/// Minimum password length accepted by the identity provider.
pub const MIN_PASSWORD_LEN: usize = 6;

// ─── Field helpers ───────────────────────────────────────────────────────────

fn trimmed(value: &Option<String>) -> Option<String> {
  value
    .as_deref()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_owned)
}

fn required(name: &str, value: &Option<String>) -> Result<String, ProvisionError> {
  trimmed(value).ok_or_else(|| ProvisionError::validate(format!("{name} is required")))
}

fn email(name: &str, value: &Option<String>) -> Result<String, ProvisionError> {
  let v = required(name, value)?;
  let valid = !v.contains(char::is_whitespace)
    && match v.split_once('@') {
      Some((local, domain)) => {
        !local.is_empty() && !domain.contains('@') && domain.contains('.')
      }
      None => false,
    };
  if !valid {
    return Err(ProvisionError::validate(format!("{name} is not a valid email address")));
  }
  Ok(v.to_lowercase())
}

/// Trimmed only for the presence check; the stored secret is what the user
/// typed.
fn password(name: &str, value: &Option<String>) -> Result<String, ProvisionError> {
  let v = value
    .as_deref()
    .filter(|s| !s.trim().is_empty())
    .ok_or_else(|| ProvisionError::validate(format!("{name} is required")))?;
  if v.chars().count() < MIN_PASSWORD_LEN {
    return Err(ProvisionError::validate(format!(
      "{name} must be at least {MIN_PASSWORD_LEN} characters"
    )));
  }
  Ok(v.to_owned())
}

/// The student number becomes the local part of the login address.
fn student_number(value: &Option<String>) -> Result<String, ProvisionError> {
  let v = required("student_number", value)?;
  if v.contains(|c: char| c.is_whitespace() || c == '@') {
    return Err(ProvisionError::validate(
      "student_number must not contain spaces or '@'",
    ));
  }
  Ok(v)
}

pub(crate) fn full_name(first: &str, middle: Option<&str>, last: &str) -> String {
  match middle {
    Some(m) => format!("{first} {m} {last}"),
    None => format!("{first} {last}"),
  }
}

// ─── Admin ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAdminRequest {
  #[serde(default)]
  pub first_name:    Option<String>,
  #[serde(default)]
  pub last_name:     Option<String>,
  #[serde(default)]
  pub email:         Option<String>,
  #[serde(default)]
  pub temp_password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewAdmin {
  pub first_name:    String,
  pub last_name:     String,
  pub email:         String,
  pub temp_password: String,
}

impl NewAdmin {
  pub fn full_name(&self) -> String { full_name(&self.first_name, None, &self.last_name) }
}

impl CreateAdminRequest {
  pub fn validate(&self) -> Result<NewAdmin, ProvisionError> {
    Ok(NewAdmin {
      first_name:    required("first_name", &self.first_name)?,
      last_name:     required("last_name", &self.last_name)?,
      email:         email("email", &self.email)?,
      temp_password: password("temp_password", &self.temp_password)?,
    })
  }
}

// ─── Professor ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateProfessorRequest {
  #[serde(default)]
  pub first_name: Option<String>,
  #[serde(default)]
  pub last_name:  Option<String>,
  #[serde(default)]
  pub email:      Option<String>,
  #[serde(default)]
  pub department: Option<String>,
  #[serde(default)]
  pub password:   Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewProfessor {
  pub first_name: String,
  pub last_name:  String,
  pub email:      String,
  pub department: String,
  pub password:   String,
}

impl NewProfessor {
  pub fn full_name(&self) -> String { full_name(&self.first_name, None, &self.last_name) }
}

impl CreateProfessorRequest {
  pub fn validate(&self) -> Result<NewProfessor, ProvisionError> {
    Ok(NewProfessor {
      first_name: required("first_name", &self.first_name)?,
      last_name:  required("last_name", &self.last_name)?,
      email:      email("email", &self.email)?,
      department: required("department", &self.department)?,
      password:   password("password", &self.password)?,
    })
  }
}

// ─── Student ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateStudentRequest {
  #[serde(default)]
  pub student_number: Option<String>,
  /// Contact address; the credentials email goes here.
  #[serde(default)]
  pub student_email:  Option<String>,
  #[serde(default)]
  pub first_name:     Option<String>,
  #[serde(default)]
  pub middle_name:    Option<String>,
  #[serde(default)]
  pub last_name:      Option<String>,
  #[serde(default)]
  pub department:     Option<String>,
  #[serde(default)]
  pub program:        Option<String>,
  #[serde(default)]
  pub year_level:     Option<String>,
  #[serde(default)]
  pub section:        Option<String>,
  /// Defaults to the upper-cased last name followed by the student number.
  #[serde(default)]
  pub login_password: Option<String>,
}

/// The role-specific part of a student, shared by the direct and the
/// invitation paths.
#[derive(Debug, Clone)]
pub struct StudentDetails {
  pub student_number: String,
  pub first_name:     String,
  pub middle_name:    Option<String>,
  pub last_name:      String,
  pub department:     String,
  pub program:        String,
  pub year_level:     String,
  pub section:        String,
}

impl StudentDetails {
  pub fn full_name(&self) -> String {
    full_name(&self.first_name, self.middle_name.as_deref(), &self.last_name)
  }

  /// The password issued when the operator does not choose one.
  pub fn default_password(&self) -> String {
    let last: String = self.last_name.split_whitespace().collect();
    format!("{}{}", last.to_uppercase(), self.student_number)
  }
}

#[derive(Debug, Clone)]
pub struct NewStudent {
  pub details:        StudentDetails,
  pub contact_email:  String,
  pub login_password: String,
}

impl CreateStudentRequest {
  pub fn validate(&self) -> Result<NewStudent, ProvisionError> {
    let details = StudentDetails {
      student_number: student_number(&self.student_number)?,
      first_name:     required("first_name", &self.first_name)?,
      middle_name:    trimmed(&self.middle_name),
      last_name:      required("last_name", &self.last_name)?,
      department:     required("department", &self.department)?,
      program:        required("program", &self.program)?,
      year_level:     required("year_level", &self.year_level)?,
      section:        required("section", &self.section)?,
    };
    let contact_email = email("student_email", &self.student_email)?;
    let login_password = match trimmed(&self.login_password) {
      Some(_) => password("login_password", &self.login_password)?,
      None => details.default_password(),
    };
    Ok(NewStudent { details, contact_email, login_password })
  }
}

// ─── Invited registration ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterInvitedRequest {
  #[serde(default)]
  pub token:          Option<String>,
  #[serde(default)]
  pub user_type:      Option<String>,
  /// Optional; when present it must match the invitation's address.
  #[serde(default)]
  pub email:          Option<String>,
  #[serde(default)]
  pub password:       Option<String>,
  #[serde(default)]
  pub first_name:     Option<String>,
  #[serde(default)]
  pub middle_name:    Option<String>,
  #[serde(default)]
  pub last_name:      Option<String>,
  #[serde(default)]
  pub department:     Option<String>,
  #[serde(default)]
  pub student_number: Option<String>,
  #[serde(default)]
  pub program:        Option<String>,
  #[serde(default)]
  pub year_level:     Option<String>,
  #[serde(default)]
  pub section:        Option<String>,
}

/// Role-specific profile input for an invited registration.
#[derive(Debug, Clone)]
pub enum InvitedProfile {
  Admin { first_name: String, last_name: String },
  Professor { first_name: String, last_name: String, department: String },
  Student(StudentDetails),
}

impl InvitedProfile {
  pub fn user_type(&self) -> UserType {
    match self {
      InvitedProfile::Admin { .. } => UserType::Admin,
      InvitedProfile::Professor { .. } => UserType::Professor,
      InvitedProfile::Student(_) => UserType::Student,
    }
  }

  pub fn full_name(&self) -> String {
    match self {
      InvitedProfile::Admin { first_name, last_name }
      | InvitedProfile::Professor { first_name, last_name, .. } => {
        full_name(first_name, None, last_name)
      }
      InvitedProfile::Student(d) => d.full_name(),
    }
  }
}

#[derive(Debug, Clone)]
pub struct InvitedRegistration {
  pub token:    String,
  pub email:    Option<String>,
  pub password: String,
  pub profile:  InvitedProfile,
}

impl RegisterInvitedRequest {
  pub fn validate(&self) -> Result<InvitedRegistration, ProvisionError> {
    let token = required("token", &self.token)?;
    let user_type = UserType::parse(&required("user_type", &self.user_type)?)
      .map_err(|_| {
        ProvisionError::validate("user_type must be one of admin, professor, student")
      })?;
    let email = match trimmed(&self.email) {
      Some(_) => Some(email("email", &self.email)?),
      None => None,
    };
    let first_name = required("first_name", &self.first_name)?;
    let last_name = required("last_name", &self.last_name)?;

    let profile = match user_type {
      UserType::Admin => InvitedProfile::Admin { first_name, last_name },
      UserType::Professor => InvitedProfile::Professor {
        first_name,
        last_name,
        department: required("department", &self.department)?,
      },
      UserType::Student => InvitedProfile::Student(StudentDetails {
        student_number: student_number(&self.student_number)?,
        first_name,
        middle_name: trimmed(&self.middle_name),
        last_name,
        department: required("department", &self.department)?,
        program: required("program", &self.program)?,
        year_level: required("year_level", &self.year_level)?,
        section: required("section", &self.section)?,
      }),
    };

    Ok(InvitedRegistration {
      token,
      email,
      password: password("password", &self.password)?,
      profile,
    })
  }
}

// ─── Delete account ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteAccountRequest {
  #[serde(default, alias = "userId")]
  pub user_id: Option<String>,
}

impl DeleteAccountRequest {
  pub fn validate(&self) -> Result<Uuid, ProvisionError> {
    let raw = required("user_id", &self.user_id)?;
    Uuid::parse_str(&raw)
      .map_err(|_| ProvisionError::validate("user_id is not a valid id"))
  }
}

#[cfg(test)]
mod tests {
  use crate::error::Step;

  use super::*;

  fn some(s: &str) -> Option<String> { Some(s.to_owned()) }

  #[test]
  fn blank_fields_are_missing() {
    let req = CreateAdminRequest {
      first_name:    some("Jane"),
      last_name:     some("   "),
      email:         some("jane@x.com"),
      temp_password: some("Secret123"),
    };
    let err = req.validate().unwrap_err();
    assert_eq!(err.step, Step::Validate);
    assert_eq!(err.message, "last_name is required");
  }

  #[test]
  fn admin_fields_are_trimmed_and_email_lowercased() {
    let req = CreateAdminRequest {
      first_name:    some(" Jane "),
      last_name:     some("Doe"),
      email:         some(" Jane@X.com "),
      temp_password: some("Secret123"),
    };
    let admin = req.validate().unwrap();
    assert_eq!(admin.full_name(), "Jane Doe");
    assert_eq!(admin.email, "jane@x.com");
  }

  #[test]
  fn malformed_email_is_rejected() {
    let req = CreateProfessorRequest {
      first_name: some("Ada"),
      last_name:  some("Lovelace"),
      email:      some("ada-at-x"),
      department: some("CS"),
      password:   some("secret1"),
    };
    assert_eq!(
      req.validate().unwrap_err().message,
      "email is not a valid email address"
    );
  }

  #[test]
  fn email_with_two_ats_or_spaces_is_rejected() {
    for bad in ["a@b@c.com", "ja ne@x.com"] {
      let req = CreateAdminRequest {
        first_name:    some("Jane"),
        last_name:     some("Doe"),
        email:         some(bad),
        temp_password: some("Secret123"),
      };
      assert_eq!(
        req.validate().unwrap_err().message,
        "email is not a valid email address",
        "{bad}"
      );
    }
  }

  #[test]
  fn password_keeps_surrounding_whitespace() {
    let req = CreateProfessorRequest {
      first_name: some("Ada"),
      last_name:  some("Lovelace"),
      email:      some("ada@x.com"),
      department: some("CS"),
      password:   some("  my pass phrase  "),
    };
    assert_eq!(req.validate().unwrap().password, "  my pass phrase  ");

    let blank = CreateProfessorRequest { password: some("       "), ..req };
    assert_eq!(blank.validate().unwrap_err().message, "password is required");
  }

  #[test]
  fn short_password_is_rejected() {
    let req = CreateProfessorRequest {
      first_name: some("Ada"),
      last_name:  some("Lovelace"),
      email:      some("ada@x.com"),
      department: some("CS"),
      password:   some("12345"),
    };
    assert!(req.validate().unwrap_err().message.contains("at least 6"));
  }

  #[test]
  fn student_password_defaults_from_last_name_and_number() {
    let req = CreateStudentRequest {
      student_number: some("2021-0001"),
      student_email:  some("john@gmail.com"),
      first_name:     some("John"),
      middle_name:    some(""),
      last_name:      some("Dela Cruz"),
      department:     some("CCS"),
      program:        some("BSCS"),
      year_level:     some("1"),
      section:        some("A"),
      login_password: None,
    };
    let s = req.validate().unwrap();
    assert_eq!(s.login_password, "DELACRUZ2021-0001");
    assert_eq!(s.details.middle_name, None);
  }

  #[test]
  fn student_number_with_spaces_is_rejected() {
    let req = CreateStudentRequest {
      student_number: some("2021 0001"),
      student_email:  some("john@gmail.com"),
      first_name:     some("John"),
      last_name:      some("Doe"),
      department:     some("CCS"),
      program:        some("BSCS"),
      year_level:     some("1"),
      section:        some("A"),
      ..Default::default()
    };
    let err = req.validate().unwrap_err();
    assert_eq!(err.step, Step::Validate);
    assert!(err.message.starts_with("student_number"));

    let invited = RegisterInvitedRequest {
      token:          some("tok"),
      user_type:      some("student"),
      password:       some("secret1"),
      first_name:     some("John"),
      last_name:      some("Doe"),
      department:     some("CCS"),
      student_number: some("x@y"),
      program:        some("BSCS"),
      year_level:     some("1"),
      section:        some("A"),
      ..Default::default()
    };
    assert!(invited.validate().unwrap_err().message.starts_with("student_number"));
  }

  #[test]
  fn invited_student_needs_student_fields() {
    let req = RegisterInvitedRequest {
      token:      some("tok"),
      user_type:  some("student"),
      password:   some("secret1"),
      first_name: some("John"),
      last_name:  some("Doe"),
      department: some("CCS"),
      ..Default::default()
    };
    assert_eq!(req.validate().unwrap_err().message, "student_number is required");
  }

  #[test]
  fn unknown_user_type_is_a_validation_error() {
    let req = RegisterInvitedRequest {
      token:     some("tok"),
      user_type: some("dean"),
      ..Default::default()
    };
    let err = req.validate().unwrap_err();
    assert_eq!(err.step, Step::Validate);
    assert!(err.message.starts_with("user_type"));
  }

  #[test]
  fn delete_requires_a_uuid() {
    let bad = DeleteAccountRequest { user_id: some("42") };
    assert_eq!(bad.validate().unwrap_err().step, Step::Validate);

    let id = Uuid::new_v4();
    let ok: DeleteAccountRequest =
      serde_json::from_value(serde_json::json!({ "userId": id })).unwrap();
    assert_eq!(ok.validate().unwrap(), id);
  }
}
