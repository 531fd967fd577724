//! Error types for `attendly-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown user type: {0:?}")]
  UnknownUserType(String),

  #[error("unknown invite scheme: {0:?}")]
  UnknownInviteScheme(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
