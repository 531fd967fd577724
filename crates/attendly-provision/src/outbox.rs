//! The credentials-email outbox.
//!
//! Sending is the last step of the direct provisioning paths and runs after
//! the identity and profile already exist. It is attempted once. A failure is
//! reported to the caller with the created ids attached, and never rolls
//! anything back: the account stays usable, only the notification is lost.

use attendly_core::{
  mail::{MailReceipt, Mailbox, OutgoingEmail},
  role::UserType,
  store::Mailer,
};
use serde_json::json;
use uuid::Uuid;

use crate::error::{ProvisionError, Step};

/// What a credentials email says.
#[derive(Debug, Clone)]
pub struct Credentials<'a> {
  pub recipient:   Mailbox,
  pub user_type:   UserType,
  pub login_email: &'a str,
  pub password:    &'a str,
}

pub struct Outbox<M> {
  mailer:    M,
  app_name:  String,
  login_url: Option<String>,
}

impl<M: Mailer> Outbox<M> {
  pub fn new(mailer: M, app_name: impl Into<String>, login_url: Option<String>) -> Self {
    Self { mailer, app_name: app_name.into(), login_url }
  }

  /// Render the welcome email carrying a new account's sign-in details.
  pub fn render(&self, c: &Credentials<'_>) -> OutgoingEmail {
    let app = escape_html(&self.app_name);
    let greeting = c
      .recipient
      .name
      .as_deref()
      .map(escape_html)
      .unwrap_or_else(|| "there".to_owned());
    let role = match c.user_type {
      UserType::Admin => "an administrator",
      UserType::Professor => "a professor",
      UserType::Student => "a student",
    };
    let sign_in = match self.login_url.as_deref() {
      Some(url) => {
        let url = escape_html(url);
        format!(r#"<p><a href="{url}">Sign in to {app}</a></p>"#)
      }
      None => String::new(),
    };

    let html_body = format!(
      "<p>Hi {greeting},</p>\
       <p>An account has been created for you on {app} as {role}.</p>\
       <p>Email: <strong>{login}</strong><br>\
       Temporary password: <strong>{password}</strong></p>\
       {sign_in}\
       <p>Please change your password after signing in.</p>",
      login = escape_html(c.login_email),
      password = escape_html(c.password),
    );

    OutgoingEmail {
      to: c.recipient.clone(),
      subject: format!("Your {} account", self.app_name),
      html_body,
    }
  }

  /// Render and send. `identity_id` is attached to the failure details so an
  /// operator can find the account whose notification was lost.
  pub async fn deliver(
    &self,
    credentials: &Credentials<'_>,
    identity_id: Uuid,
  ) -> Result<MailReceipt, ProvisionError> {
    let email = self.render(credentials);
    match self.mailer.send(&email).await {
      Ok(receipt) => {
        tracing::info!(%identity_id, to = %email.to.email, "credentials email sent");
        Ok(receipt)
      }
      Err(e) => {
        tracing::error!(
          %identity_id,
          to = %email.to.email,
          error = %e,
          "credentials email failed; account was created"
        );
        Err(
          ProvisionError::from_source(Step::BrevoSend, &e).with_details(json!({
            "user_id": identity_id,
            "account_created": true,
          })),
        )
      }
    }
  }
}

/// Escape the five HTML-significant characters.
pub fn escape_html(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for ch in s.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      c => out.push(c),
    }
  }
  out
}
