//! [`SqliteIdentities`]: a local stand-in for the hosted identity provider.
//!
//! Passwords are stored as argon2 PHC strings and never read back out.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use attendly_core::{
  identity::{Identity, NewIdentity},
  store::IdentityAdmin,
};
use chrono::Utc;
use rand_core::OsRng;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  encode::{RawIdentity, encode_dt, encode_uuid},
  Error, Result,
};

/// Identity records in the `identities` table.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteIdentities {
  conn: tokio_rusqlite::Connection,
}

impl SqliteIdentities {
  pub(crate) fn new(conn: tokio_rusqlite::Connection) -> Self { Self { conn } }

  /// Check a password against the stored hash for `email`. Returns the
  /// identity on success and `None` on any mismatch.
  pub async fn verify_password(
    &self,
    email: &str,
    password: &str,
  ) -> Result<Option<Identity>> {
    let email = email.to_owned();
    let row: Option<(RawIdentity, String)> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT id, email, email_verified, created_at, password_hash
             FROM identities WHERE email = ?1",
            rusqlite::params![email],
            |row| {
              Ok((
                RawIdentity {
                  id:             row.get(0)?,
                  email:          row.get(1)?,
                  email_verified: row.get(2)?,
                  created_at:     row.get(3)?,
                },
                row.get(4)?,
              ))
            },
          )
          .optional()?)
      })
      .await?;

    let Some((raw, phc)) = row else {
      return Ok(None);
    };

    let password = password.to_owned();
    let matches = tokio::task::spawn_blocking(move || {
      PasswordHash::new(&phc)
        .map(|parsed| {
          Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
        })
        .unwrap_or(false)
    })
    .await
    .map_err(|e| Error::PasswordHash(e.to_string()))?;

    if matches { raw.into_identity().map(Some) } else { Ok(None) }
  }
}

async fn hash_password(password: String) -> Result<String> {
  tokio::task::spawn_blocking(move || {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map(|h| h.to_string())
      .map_err(|e| Error::PasswordHash(e.to_string()))
  })
  .await
  .map_err(|e| Error::PasswordHash(e.to_string()))?
}

impl IdentityAdmin for SqliteIdentities {
  type Error = Error;

  async fn create_user(&self, input: NewIdentity) -> Result<Identity> {
    let identity = Identity {
      id:             Uuid::new_v4(),
      email:          input.email.clone(),
      email_verified: input.email_verified,
      created_at:     Utc::now(),
    };

    let phc          = hash_password(input.password).await?;
    let id_str       = encode_uuid(identity.id);
    let email        = input.email;
    let verified     = input.email_verified;
    let user_type    = input.user_type.to_string();
    let display_name = input.display_name;
    let at_str       = encode_dt(identity.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO identities (
             id, email, password_hash, email_verified, user_type, display_name, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str, email, phc, verified, user_type, display_name, at_str
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| match Error::from_write(e) {
        Error::Duplicate(_) => Error::EmailTaken(identity.email.clone()),
        other => other,
      })?;

    tracing::debug!(identity_id = %identity.id, "created local identity");
    Ok(identity)
  }

  async fn delete_user(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM identities WHERE id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if removed == 0 {
      return Err(Error::IdentityNotFound(id));
    }
    Ok(())
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<Identity>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT id, email, email_verified, created_at FROM identities WHERE id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawIdentity {
                id:             row.get(0)?,
                email:          row.get(1)?,
                email_verified: row.get(2)?,
                created_at:     row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }
}
