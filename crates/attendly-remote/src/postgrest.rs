//! [`AccountStore`] over the hosted REST interface to the relational tables.
//!
//! Filters use the `column=op.value` query syntax. Every write asks for
//! `Prefer: return=representation` so the affected rows come back and can be
//! counted; that count is what makes the conditional invitation updates
//! atomic claims rather than read-then-write pairs.

use attendly_core::{
  invite::{Invite, InviteScheme},
  profile::{AdminProfile, ProfessorProfile, Profile, StudentProfile},
  role::UserType,
  store::AccountStore,
};
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{Error, Result, supabase::{SupabaseClient, check}};

const RETURN_REPRESENTATION: &str = "return=representation";
const UPSERT_REPRESENTATION: &str = "resolution=merge-duplicates,return=representation";

/// An invitation row as the REST API returns it. Legacy admin rows have no
/// `user_type` column.
#[derive(Debug, Deserialize)]
struct RemoteInvite {
  id:         Uuid,
  token:      String,
  email:      String,
  #[serde(default)]
  user_type:  Option<String>,
  expires_at: DateTime<Utc>,
  used_at:    Option<DateTime<Utc>>,
  is_active:  bool,
}

impl RemoteInvite {
  fn into_invite(self, scheme: InviteScheme) -> Result<Invite> {
    let user_type = match (scheme, self.user_type.as_deref()) {
      (InviteScheme::LegacyAdmin, _) => UserType::Admin,
      (InviteScheme::Primary, Some(t)) => UserType::parse(t)?,
      (InviteScheme::Primary, None) => {
        return Err(Error::UnexpectedResponse(format!(
          "invite {} has no user_type",
          self.id
        )));
      }
    };
    Ok(Invite {
      id: self.id,
      token: self.token,
      email: self.email,
      user_type,
      expires_at: self.expires_at,
      used_at: self.used_at,
      is_active: self.is_active,
      scheme,
    })
  }
}

/// The profile and invitation tables of the hosted project.
#[derive(Clone)]
pub struct PostgrestStore {
  client: SupabaseClient,
}

impl PostgrestStore {
  pub fn new(client: SupabaseClient) -> Self { Self { client } }

  fn table(&self, method: Method, table: &str) -> reqwest::RequestBuilder {
    self.client.request(method, &format!("/rest/v1/{table}"))
  }

  /// Insert one row and return the stored representation.
  async fn insert_one<T>(&self, table: &str, row: &T, prefer: &str) -> Result<T>
  where
    T: Serialize + DeserializeOwned,
  {
    let mut req = self
      .table(Method::POST, table)
      .header("Prefer", prefer)
      .json(row);
    if prefer == UPSERT_REPRESENTATION {
      req = req.query(&[("on_conflict", "id")]);
    }
    let rows: Vec<T> = check(req.send().await?).await?.json().await?;
    rows
      .into_iter()
      .next()
      .ok_or_else(|| Error::UnexpectedResponse(format!("insert into {table} returned no rows")))
  }

  async fn select_by_id<T: DeserializeOwned>(
    &self,
    table: &str,
    id: Uuid,
  ) -> Result<Option<T>> {
    let resp = self
      .table(Method::GET, table)
      .query(&[("id", format!("eq.{id}")), ("select", "*".to_owned())])
      .send()
      .await?;
    let rows: Vec<T> = check(resp).await?.json().await?;
    Ok(rows.into_iter().next())
  }

  /// Apply `patch` to the rows matching `filters`; returns how many changed.
  async fn patch(
    &self,
    table: &str,
    filters: &[(&str, String)],
    patch: Value,
  ) -> Result<usize> {
    let resp = self
      .table(Method::PATCH, table)
      .header("Prefer", RETURN_REPRESENTATION)
      .query(filters)
      .json(&patch)
      .send()
      .await?;
    let rows: Vec<Value> = check(resp).await?.json().await?;
    Ok(rows.len())
  }
}

impl AccountStore for PostgrestStore {
  type Error = Error;

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn insert_admin(&self, profile: AdminProfile) -> Result<AdminProfile> {
    self.insert_one("admins", &profile, RETURN_REPRESENTATION).await
  }

  async fn insert_professor(
    &self,
    profile: ProfessorProfile,
  ) -> Result<ProfessorProfile> {
    self.insert_one("professors", &profile, RETURN_REPRESENTATION).await
  }

  async fn upsert_student(&self, profile: StudentProfile) -> Result<StudentProfile> {
    self.insert_one("students", &profile, UPSERT_REPRESENTATION).await
  }

  async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
    if let Some(a) = self.select_by_id::<AdminProfile>("admins", id).await? {
      return Ok(Some(Profile::Admin(a)));
    }
    if let Some(p) = self.select_by_id::<ProfessorProfile>("professors", id).await? {
      return Ok(Some(Profile::Professor(p)));
    }
    Ok(
      self
        .select_by_id::<StudentProfile>("students", id)
        .await?
        .map(Profile::Student),
    )
  }

  async fn delete_profiles(&self, id: Uuid) -> Result<u64> {
    let mut removed = 0u64;
    for user_type in UserType::ALL {
      let resp = self
        .table(Method::DELETE, user_type.profile_table())
        .header("Prefer", RETURN_REPRESENTATION)
        .query(&[("id", format!("eq.{id}"))])
        .send()
        .await?;
      let rows: Vec<Value> = check(resp).await?.json().await?;
      removed += rows.len() as u64;
    }
    Ok(removed)
  }

  // ── Invitations ───────────────────────────────────────────────────────────

  async fn find_invite<'a>(
    &'a self,
    scheme: InviteScheme,
    token: &'a str,
  ) -> Result<Option<Invite>> {
    let resp = self
      .table(Method::GET, scheme.table())
      .query(&[
        ("token", format!("eq.{token}")),
        ("select", "*".to_owned()),
        ("limit", "1".to_owned()),
      ])
      .send()
      .await?;
    let rows: Vec<RemoteInvite> = check(resp).await?.json().await?;
    rows
      .into_iter()
      .next()
      .map(|r| r.into_invite(scheme))
      .transpose()
  }

  async fn reserve_invite(&self, scheme: InviteScheme, id: Uuid) -> Result<bool> {
    let changed = self
      .patch(
        scheme.table(),
        &[
          ("id", format!("eq.{id}")),
          ("is_active", "eq.true".to_owned()),
          ("used_at", "is.null".to_owned()),
        ],
        json!({ "is_active": false }),
      )
      .await?;
    Ok(changed == 1)
  }

  async fn release_invite(&self, scheme: InviteScheme, id: Uuid) -> Result<()> {
    self
      .patch(
        scheme.table(),
        &[("id", format!("eq.{id}")), ("used_at", "is.null".to_owned())],
        json!({ "is_active": true }),
      )
      .await?;
    Ok(())
  }

  async fn mark_invite_used(
    &self,
    scheme: InviteScheme,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> Result<bool> {
    let changed = self
      .patch(
        scheme.table(),
        &[("id", format!("eq.{id}")), ("used_at", "is.null".to_owned())],
        json!({ "used_at": at, "is_active": false }),
      )
      .await?;
    Ok(changed == 1)
  }
}
