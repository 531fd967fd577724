//! Identities: authentication credentials owned by the identity provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::UserType;

/// An authentication identity as reported back by the provider.
///
/// The password credential never leaves the provider, so it has no field here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
  /// Provider-assigned id; doubles as the primary key of the profile row.
  pub id:             Uuid,
  pub email:          String,
  pub email_verified: bool,
  pub created_at:     DateTime<Utc>,
}

/// Input for [`IdentityAdmin::create_user`](crate::store::IdentityAdmin::create_user).
#[derive(Debug, Clone)]
pub struct NewIdentity {
  pub email:          String,
  pub password:       String,
  /// Admin-issued and invite-issued credentials are treated as already
  /// trusted, so the provisioning flows always set this.
  pub email_verified: bool,
  /// Stored as provider-side user metadata.
  pub user_type:      UserType,
  pub display_name:   String,
}

impl NewIdentity {
  /// A pre-verified identity for `user_type`.
  pub fn verified(
    email: impl Into<String>,
    password: impl Into<String>,
    user_type: UserType,
    display_name: impl Into<String>,
  ) -> Self {
    Self {
      email: email.into(),
      password: password.into(),
      email_verified: true,
      user_type,
      display_name: display_name.into(),
    }
  }
}
