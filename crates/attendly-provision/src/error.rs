//! Step-tagged provisioning errors.

use serde::Serialize;
use serde_json::Value;
use strum::{AsRefStr, Display};
use thiserror::Error;

/// The point in a provisioning saga at which it failed. The serialised
/// names are part of the wire contract with the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
pub enum Step {
  #[serde(rename = "method")]
  #[strum(serialize = "method")]
  Method,
  #[serde(rename = "validate")]
  #[strum(serialize = "validate")]
  Validate,
  #[serde(rename = "env")]
  #[strum(serialize = "env")]
  Env,
  #[serde(rename = "invite")]
  #[strum(serialize = "invite")]
  Invite,
  #[serde(rename = "createUser")]
  #[strum(serialize = "createUser")]
  CreateUser,
  #[serde(rename = "insert_profile")]
  #[strum(serialize = "insert_profile")]
  InsertProfile,
  #[serde(rename = "insert_admin")]
  #[strum(serialize = "insert_admin")]
  InsertAdmin,
  #[serde(rename = "insert_professor")]
  #[strum(serialize = "insert_professor")]
  InsertProfessor,
  #[serde(rename = "upsert_student")]
  #[strum(serialize = "upsert_student")]
  UpsertStudent,
  #[serde(rename = "update_invite")]
  #[strum(serialize = "update_invite")]
  UpdateInvite,
  #[serde(rename = "brevo_send")]
  #[strum(serialize = "brevo_send")]
  BrevoSend,
  #[serde(rename = "delete_profile")]
  #[strum(serialize = "delete_profile")]
  DeleteProfile,
  #[serde(rename = "deleteUser")]
  #[strum(serialize = "deleteUser")]
  DeleteUser,
  #[serde(rename = "catch")]
  #[strum(serialize = "catch")]
  Catch,
}

/// A failed provisioning call.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{step}: {message}")]
pub struct ProvisionError {
  pub step:    Step,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details: Option<Value>,
}

impl ProvisionError {
  pub fn new(step: Step, message: impl Into<String>) -> Self {
    Self { step, message: message.into(), details: None }
  }

  /// Wrap a collaborator error, keeping its message verbatim.
  pub fn from_source(step: Step, source: &dyn std::error::Error) -> Self {
    Self::new(step, source.to_string())
  }

  pub fn with_details(mut self, details: Value) -> Self {
    self.details = Some(details);
    self
  }

  pub fn validate(message: impl Into<String>) -> Self {
    Self::new(Step::Validate, message)
  }

  pub fn invite(message: impl Into<String>) -> Self {
    Self::new(Step::Invite, message)
  }
}
