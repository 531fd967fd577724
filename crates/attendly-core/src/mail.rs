//! Outgoing transactional email and the provider's reply.

use serde::{Deserialize, Serialize};

/// A sender or recipient mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mailbox {
  pub email: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name:  Option<String>,
}

impl Mailbox {
  pub fn new(email: impl Into<String>, name: Option<String>) -> Self {
    Self { email: email.into(), name }
  }
}

/// A single HTML email. The sender identity is supplied by the [`Mailer`]
/// implementation, not by the caller.
///
/// [`Mailer`]: crate::store::Mailer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
  pub to:        Mailbox,
  pub subject:   String,
  pub html_body: String,
}

/// What the provider answered to an accepted send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailReceipt {
  pub status: u16,
  /// Provider response body; JSON when the provider returns JSON, otherwise
  /// a JSON string holding the raw text.
  pub body:   serde_json::Value,
}

impl MailReceipt {
  /// Build a receipt from a raw response body.
  pub fn from_body(status: u16, raw: &str) -> Self {
    let body = serde_json::from_str(raw)
      .unwrap_or_else(|_| serde_json::Value::String(raw.to_owned()));
    Self { status, body }
  }
}
