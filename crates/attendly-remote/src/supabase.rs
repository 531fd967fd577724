//! Privileged client for the hosted backend, and the identity admin API.

use std::time::Duration;

use attendly_core::{
  identity::{Identity, NewIdentity},
  store::IdentityAdmin,
};
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, postgrest::PostgrestStore};

/// Connection settings for the hosted backend project.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
  /// Project base URL, e.g. `https://abcd.supabase.co`.
  pub url:              String,
  /// The service-role key. Bypasses row-level security.
  pub service_role_key: String,
}

/// Shared HTTP plumbing for the admin and REST APIs.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct SupabaseClient {
  http:     Client,
  base_url: String,
  key:      String,
}

impl SupabaseClient {
  pub fn new(config: SupabaseConfig) -> Result<Self> {
    let base_url = config.url.trim().trim_end_matches('/').to_owned();
    if base_url.is_empty() {
      return Err(Error::Config("SUPABASE_URL is empty".into()));
    }
    if config.service_role_key.trim().is_empty() {
      return Err(Error::Config("SUPABASE_SERVICE_ROLE_KEY is empty".into()));
    }
    let http = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?;
    Ok(Self { http, base_url, key: config.service_role_key })
  }

  pub(crate) fn endpoint(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  /// A request carrying both privileged-key headers.
  pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
    self
      .http
      .request(method, self.endpoint(path))
      .header("apikey", &self.key)
      .bearer_auth(&self.key)
  }

  /// The identity admin API.
  pub fn auth(&self) -> SupabaseAuth { SupabaseAuth { client: self.clone() } }

  /// The relational tables.
  pub fn rest(&self) -> PostgrestStore { PostgrestStore::new(self.clone()) }
}

/// Read a response, turning non-success statuses into [`Error::Api`].
pub(crate) async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body = resp.text().await.unwrap_or_default();
  Err(Error::api(status.as_u16(), &body))
}

// ─── Identity admin API ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CreateUserBody<'a> {
  email:         &'a str,
  password:      &'a str,
  email_confirm: bool,
  user_metadata: UserMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct UserMetadata<'a> {
  user_type: &'a str,
  full_name: &'a str,
}

/// The subset of the provider's user object this crate reads.
#[derive(Debug, Deserialize)]
pub(crate) struct RemoteUser {
  id:                 Uuid,
  #[serde(default)]
  email:              Option<String>,
  #[serde(default)]
  email_confirmed_at: Option<DateTime<Utc>>,
  created_at:         DateTime<Utc>,
}

impl From<RemoteUser> for Identity {
  fn from(u: RemoteUser) -> Self {
    Identity {
      id:             u.id,
      email:          u.email.unwrap_or_default(),
      email_verified: u.email_confirmed_at.is_some(),
      created_at:     u.created_at,
    }
  }
}

/// [`IdentityAdmin`] over `/auth/v1/admin/users`.
#[derive(Clone)]
pub struct SupabaseAuth {
  client: SupabaseClient,
}

impl IdentityAdmin for SupabaseAuth {
  type Error = Error;

  async fn create_user(&self, input: NewIdentity) -> Result<Identity> {
    let user_type = input.user_type.to_string();
    let body = CreateUserBody {
      email:         &input.email,
      password:      &input.password,
      email_confirm: input.email_verified,
      user_metadata: UserMetadata {
        user_type: &user_type,
        full_name: &input.display_name,
      },
    };

    let resp = self
      .client
      .request(Method::POST, "/auth/v1/admin/users")
      .json(&body)
      .send()
      .await?;
    let user: RemoteUser = check(resp).await?.json().await?;
    Ok(user.into())
  }

  async fn delete_user(&self, id: Uuid) -> Result<()> {
    let resp = self
      .client
      .request(Method::DELETE, &format!("/auth/v1/admin/users/{id}"))
      .send()
      .await?;
    check(resp).await?;
    Ok(())
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<Identity>> {
    let resp = self
      .client
      .request(Method::GET, &format!("/auth/v1/admin/users/{id}"))
      .send()
      .await?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    let user: RemoteUser = check(resp).await?.json().await?;
    Ok(Some(user.into()))
  }
}
