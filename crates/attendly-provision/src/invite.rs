//! Invitation verification.
//!
//! Two invitation schemes are live at once: the `invites` table for every
//! role, and the older admin-only table. Each is a separate
//! [`InviteStrategy`]; [`InviteVerification`] tries them in order and
//! accepts the first redeemable match.

use attendly_core::{
  invite::{Invite, InviteRejection, InviteScheme},
  role::UserType,
  store::AccountStore,
};
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::error::ProvisionError;

/// Outcome of checking one strategy.
#[derive(Debug, Clone)]
pub enum Verdict {
  Valid(Invite),
  Rejected(InviteRejection),
  NotFound,
}

/// One way of looking an invitation token up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteStrategy {
  /// The `invites` table.
  InviteTable,
  /// The older `admin_invites` table; consulted for admins only.
  LegacyAdminInvites,
}

impl InviteStrategy {
  pub fn scheme(self) -> InviteScheme {
    match self {
      InviteStrategy::InviteTable => InviteScheme::Primary,
      InviteStrategy::LegacyAdminInvites => InviteScheme::LegacyAdmin,
    }
  }

  pub fn applies_to(self, role: UserType) -> bool {
    match self {
      InviteStrategy::InviteTable => true,
      InviteStrategy::LegacyAdminInvites => role == UserType::Admin,
    }
  }

  /// Look `token` up in this strategy's table and check it against `role`.
  pub async fn verify<S: AccountStore>(
    self,
    store: &S,
    token: &str,
    role: UserType,
    now: DateTime<Utc>,
  ) -> Result<Verdict, S::Error> {
    let Some(invite) = store.find_invite(self.scheme(), token).await? else {
      return Ok(Verdict::NotFound);
    };
    Ok(match invite.check(role, now) {
      Ok(()) => Verdict::Valid(invite),
      Err(reason) => Verdict::Rejected(reason),
    })
  }
}

/// An ordered list of strategies.
#[derive(Debug, Clone)]
pub struct InviteVerification {
  strategies: Vec<InviteStrategy>,
}

impl Default for InviteVerification {
  fn default() -> Self {
    Self::new(vec![
      InviteStrategy::InviteTable,
      InviteStrategy::LegacyAdminInvites,
    ])
  }
}

impl InviteVerification {
  pub fn new(strategies: Vec<InviteStrategy>) -> Self { Self { strategies } }

  /// Return the first redeemable invitation for `token` and `role`.
  ///
  /// A strategy whose lookup errors is logged and skipped; the next one is
  /// still consulted. If nothing matches, the error carries the most
  /// specific rejection reason seen (if a row was found at all).
  pub async fn verify<S: AccountStore>(
    &self,
    store: &S,
    token: &str,
    role: UserType,
    now: DateTime<Utc>,
  ) -> Result<Invite, ProvisionError> {
    let mut rejection = None;
    let mut lookup_failed = false;

    for strategy in self.strategies.iter().copied().filter(|s| s.applies_to(role)) {
      match strategy.verify(store, token, role, now).await {
        Ok(Verdict::Valid(invite)) => {
          tracing::debug!(?strategy, invite_id = %invite.id, "invite verified");
          return Ok(invite);
        }
        Ok(Verdict::Rejected(reason)) => {
          tracing::debug!(?strategy, %reason, "invite rejected");
          rejection = Some(reason);
        }
        Ok(Verdict::NotFound) => {}
        Err(e) => {
          tracing::warn!(?strategy, error = %e, "invite lookup failed");
          lookup_failed = true;
        }
      }
    }

    let err = ProvisionError::invite("invalid or expired invitation");
    Err(match (rejection, lookup_failed) {
      (Some(reason), _) => err.with_details(json!({ "reason": reason.to_string() })),
      (None, true) => err.with_details(json!({ "reason": "lookup_failed" })),
      (None, false) => err,
    })
  }
}
