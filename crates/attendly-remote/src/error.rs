//! Error type for `attendly-remote`.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The remote API answered with a non-success status. `Display` is the
  /// provider's own message, so it can be surfaced verbatim.
  #[error("{message}")]
  Api { status: u16, message: String },

  #[error("core error: {0}")]
  Core(#[from] attendly_core::Error),

  #[error("unexpected response: {0}")]
  UnexpectedResponse(String),

  #[error("invalid configuration: {0}")]
  Config(String),
}

impl Error {
  /// Build an [`Error::Api`] from a failed response body.
  pub(crate) fn api(status: u16, body: &str) -> Self {
    Error::Api { status, message: provider_message(status, body) }
  }

  pub fn status(&self) -> Option<u16> {
    match self {
      Error::Api { status, .. } => Some(*status),
      Error::Http(e) => e.status().map(|s| s.as_u16()),
      _ => None,
    }
  }
}

/// Extract the human-readable message from a provider error body.
///
/// The identity API uses `msg` or `error_description`, PostgREST and Brevo
/// use `message`. Falls back to the raw body, then to the status code.
pub fn provider_message(status: u16, body: &str) -> String {
  if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
    for key in ["msg", "message", "error_description", "error"] {
      if let Some(Value::String(m)) = map.get(key)
        && !m.is_empty()
      {
        return m.clone();
      }
    }
  }
  let trimmed = body.trim();
  if trimmed.is_empty() {
    format!("request failed with status {status}")
  } else {
    trimmed.to_owned()
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
