//! The three account roles an identity can be provisioned into.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result};

/// The role a provisioned identity belongs to. Every identity owns exactly
/// one profile row, in the table for its role.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserType {
  Admin,
  Professor,
  Student,
}

impl UserType {
  pub const ALL: [UserType; 3] =
    [UserType::Admin, UserType::Professor, UserType::Student];

  /// Parse the lowercase wire form, trimming surrounding whitespace.
  pub fn parse(s: &str) -> Result<Self> {
    s.trim()
      .to_ascii_lowercase()
      .parse()
      .map_err(|_| Error::UnknownUserType(s.to_owned()))
  }

  /// Name of the relational table holding this role's profile rows.
  pub fn profile_table(self) -> &'static str {
    match self {
      UserType::Admin => "admins",
      UserType::Professor => "professors",
      UserType::Student => "students",
    }
  }
}
