//! Error type for `attendly-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] attendly_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("decode error: {0}")]
  Decode(String),

  #[error("a user with this email address has already been registered")]
  EmailTaken(String),

  /// A natural-key uniqueness constraint rejected the write.
  #[error("duplicate key value violates unique constraint: {0}")]
  Duplicate(String),

  #[error("user not found: {0}")]
  IdentityNotFound(uuid::Uuid),

  #[error("password hashing failed: {0}")]
  PasswordHash(String),
}

impl Error {
  /// Classify a write failure, separating uniqueness violations from other
  /// database errors.
  pub(crate) fn from_write(e: tokio_rusqlite::Error) -> Self {
    match &e {
      tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(f, msg))
        if f.code == rusqlite::ErrorCode::ConstraintViolation =>
      {
        Error::Duplicate(msg.clone().unwrap_or_else(|| f.to_string()))
      }
      _ => Error::Database(e),
    }
  }

  pub fn is_duplicate(&self) -> bool {
    matches!(self, Error::Duplicate(_) | Error::EmailTaken(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
