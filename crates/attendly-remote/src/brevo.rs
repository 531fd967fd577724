//! [`Mailer`] over the Brevo transactional email API.

use std::time::Duration;

use attendly_core::{
  mail::{MailReceipt, Mailbox, OutgoingEmail},
  store::Mailer,
};
use reqwest::Client;
use serde::Serialize;

use crate::{Error, Result};

pub const DEFAULT_ENDPOINT: &str = "https://api.brevo.com/v3/smtp/email";

/// Sender identity and credentials for Brevo.
#[derive(Debug, Clone)]
pub struct BrevoConfig {
  pub api_key:      String,
  pub sender_email: String,
  pub sender_name:  Option<String>,
  /// Overridable for testing against a local double.
  pub endpoint:     String,
}

impl BrevoConfig {
  /// Build a config from the optional settings, returning `None` unless both
  /// the API key and the sender address are present and non-blank.
  pub fn from_parts(
    api_key: Option<&str>,
    sender_email: Option<&str>,
    sender_name: Option<&str>,
  ) -> Option<Self> {
    let non_blank = |v: Option<&str>| {
      v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned)
    };
    Some(Self {
      api_key:      non_blank(api_key)?,
      sender_email: non_blank(sender_email)?,
      sender_name:  non_blank(sender_name),
      endpoint:     DEFAULT_ENDPOINT.to_owned(),
    })
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailBody<'a> {
  sender:       &'a Mailbox,
  to:           [&'a Mailbox; 1],
  subject:      &'a str,
  html_content: &'a str,
}

/// Sends one email per call. No retry: a failure is reported to the caller,
/// who decides what to do with it.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct BrevoMailer {
  http:     Client,
  sender:   Mailbox,
  api_key:  String,
  endpoint: String,
}

impl BrevoMailer {
  pub fn new(config: BrevoConfig) -> Result<Self> {
    let http = Client::builder()
      .timeout(Duration::from_secs(30))
      .user_agent(concat!("attendly/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self {
      http,
      sender: Mailbox::new(config.sender_email, config.sender_name),
      api_key: config.api_key,
      endpoint: config.endpoint,
    })
  }

  fn body<'a>(&'a self, email: &'a OutgoingEmail) -> SendEmailBody<'a> {
    SendEmailBody {
      sender:       &self.sender,
      to:           [&email.to],
      subject:      &email.subject,
      html_content: &email.html_body,
    }
  }
}

impl Mailer for BrevoMailer {
  type Error = Error;

  async fn send<'a>(&'a self, email: &'a OutgoingEmail) -> Result<MailReceipt> {
    let resp = self
      .http
      .post(&self.endpoint)
      .header("api-key", &self.api_key)
      .header(reqwest::header::ACCEPT, "application/json")
      .json(&self.body(email))
      .send()
      .await?;

    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    if !(200..=299).contains(&status) {
      tracing::warn!(status, to = %email.to.email, "brevo rejected send");
      return Err(Error::api(status, &text));
    }
    Ok(MailReceipt::from_body(status, &text))
  }
}
