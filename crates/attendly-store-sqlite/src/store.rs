//! [`SqliteStore`]: the SQLite implementation of [`AccountStore`].

use std::path::Path;

use attendly_core::{
  invite::{Invite, InviteScheme},
  profile::{AdminProfile, ProfessorProfile, Profile, StudentProfile},
  store::AccountStore,
};
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  encode::{
    RawAdmin, RawInvite, RawProfessor, RawStudent, encode_dt, encode_status,
    encode_uuid,
  },
  identity::SqliteIdentities,
  schema::SCHEMA,
  Error, Result,
};

// ─── Row readers ─────────────────────────────────────────────────────────────

const ADMIN_COLUMNS: &str = "id, admin_name, username, role, status";

fn read_admin(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAdmin> {
  Ok(RawAdmin {
    id:         row.get(0)?,
    admin_name: row.get(1)?,
    username:   row.get(2)?,
    role:       row.get(3)?,
    status:     row.get(4)?,
  })
}

const PROFESSOR_COLUMNS: &str =
  "id, professor_name, email, department, status, archived";

fn read_professor(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawProfessor> {
  Ok(RawProfessor {
    id:             row.get(0)?,
    professor_name: row.get(1)?,
    email:          row.get(2)?,
    department:     row.get(3)?,
    status:         row.get(4)?,
    archived:       row.get(5)?,
  })
}

const STUDENT_COLUMNS: &str = "id, first_name, middle_name, last_name, \
  student_number, email, department, program, year_level, section, status, \
  archived";

fn read_student(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawStudent> {
  Ok(RawStudent {
    id:             row.get(0)?,
    first_name:     row.get(1)?,
    middle_name:    row.get(2)?,
    last_name:      row.get(3)?,
    student_number: row.get(4)?,
    email:          row.get(5)?,
    department:     row.get(6)?,
    program:        row.get(7)?,
    year_level:     row.get(8)?,
    section:        row.get(9)?,
    status:         row.get(10)?,
    archived:       row.get(11)?,
  })
}

fn invite_select(scheme: InviteScheme) -> &'static str {
  match scheme {
    InviteScheme::Primary => {
      "SELECT id, token, email, user_type, expires_at, used_at, is_active
       FROM invites WHERE token = ?1"
    }
    InviteScheme::LegacyAdmin => {
      "SELECT id, token, email, NULL, expires_at, used_at, is_active
       FROM admin_invites WHERE token = ?1"
    }
  }
}

fn read_invite(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawInvite> {
  Ok(RawInvite {
    id:         row.get(0)?,
    token:      row.get(1)?,
    email:      row.get(2)?,
    user_type:  row.get(3)?,
    expires_at: row.get(4)?,
    used_at:    row.get(5)?,
    is_active:  row.get(6)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// The profile and invitation tables backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// The identity table living in the same database file.
  pub fn identities(&self) -> SqliteIdentities {
    SqliteIdentities::new(self.conn.clone())
  }

  /// Persist an invitation. Invitations are issued outside the provisioning
  /// workflow; this is how they enter a local store.
  pub async fn insert_invite(&self, invite: &Invite) -> Result<()> {
    let id_str      = encode_uuid(invite.id);
    let token       = invite.token.clone();
    let email       = invite.email.clone();
    let user_type   = invite.user_type.to_string();
    let expires_str = encode_dt(invite.expires_at);
    let used_str    = invite.used_at.map(encode_dt);
    let is_active   = invite.is_active;
    let scheme      = invite.scheme;

    self
      .conn
      .call(move |conn| {
        match scheme {
          InviteScheme::Primary => conn.execute(
            "INSERT INTO invites (id, token, email, user_type, expires_at, used_at, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
              id_str, token, email, user_type, expires_str, used_str, is_active
            ],
          )?,
          InviteScheme::LegacyAdmin => conn.execute(
            "INSERT INTO admin_invites (id, token, email, expires_at, used_at, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![id_str, token, email, expires_str, used_str, is_active],
          )?,
        };
        Ok(())
      })
      .await
      .map_err(Error::from_write)?;
    Ok(())
  }
}

// ─── AccountStore impl ───────────────────────────────────────────────────────

impl AccountStore for SqliteStore {
  type Error = Error;

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn insert_admin(&self, profile: AdminProfile) -> Result<AdminProfile> {
    let id_str     = encode_uuid(profile.id);
    let name       = profile.admin_name.clone();
    let username   = profile.username.clone();
    let role       = profile.role.clone();
    let status_str = encode_status(profile.status);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO admins (id, admin_name, username, role, status)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, name, username, role, status_str],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::from_write)?;

    Ok(profile)
  }

  async fn insert_professor(
    &self,
    profile: ProfessorProfile,
  ) -> Result<ProfessorProfile> {
    let id_str     = encode_uuid(profile.id);
    let name       = profile.professor_name.clone();
    let email      = profile.email.clone();
    let department = profile.department.clone();
    let status_str = encode_status(profile.status);
    let archived   = profile.archived;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO professors (id, professor_name, email, department, status, archived)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, name, email, department, status_str, archived],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::from_write)?;

    Ok(profile)
  }

  async fn upsert_student(&self, profile: StudentProfile) -> Result<StudentProfile> {
    let p          = profile.clone();
    let id_str     = encode_uuid(p.id);
    let status_str = encode_status(p.status);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO students (
             id, first_name, middle_name, last_name, student_number, email,
             department, program, year_level, section, status, archived
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
           ON CONFLICT(id) DO UPDATE SET
             first_name     = excluded.first_name,
             middle_name    = excluded.middle_name,
             last_name      = excluded.last_name,
             student_number = excluded.student_number,
             email          = excluded.email,
             department     = excluded.department,
             program        = excluded.program,
             year_level     = excluded.year_level,
             section        = excluded.section,
             status         = excluded.status,
             archived       = excluded.archived",
          rusqlite::params![
            id_str,
            p.first_name,
            p.middle_name,
            p.last_name,
            p.student_number,
            p.email,
            p.department,
            p.program,
            p.year_level,
            p.section,
            status_str,
            p.archived,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::from_write)?;

    Ok(profile)
  }

  async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
    let id_str = encode_uuid(id);

    let (admin, professor, student) = self
      .conn
      .call(move |conn| {
        let admin = conn
          .query_row(
            &format!("SELECT {ADMIN_COLUMNS} FROM admins WHERE id = ?1"),
            rusqlite::params![id_str],
            read_admin,
          )
          .optional()?;
        let professor = conn
          .query_row(
            &format!("SELECT {PROFESSOR_COLUMNS} FROM professors WHERE id = ?1"),
            rusqlite::params![id_str],
            read_professor,
          )
          .optional()?;
        let student = conn
          .query_row(
            &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"),
            rusqlite::params![id_str],
            read_student,
          )
          .optional()?;
        Ok((admin, professor, student))
      })
      .await?;

    if let Some(raw) = admin {
      return Ok(Some(Profile::Admin(raw.into_profile()?)));
    }
    if let Some(raw) = professor {
      return Ok(Some(Profile::Professor(raw.into_profile()?)));
    }
    student
      .map(|raw| raw.into_profile().map(Profile::Student))
      .transpose()
  }

  async fn delete_profiles(&self, id: Uuid) -> Result<u64> {
    let id_str = encode_uuid(id);

    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut removed = 0usize;
        for table in ["admins", "professors", "students"] {
          removed += tx.execute(
            &format!("DELETE FROM {table} WHERE id = ?1"),
            rusqlite::params![id_str],
          )?;
        }
        tx.commit()?;
        Ok(removed)
      })
      .await?;

    Ok(removed as u64)
  }

  // ── Invitations ───────────────────────────────────────────────────────────

  async fn find_invite<'a>(
    &'a self,
    scheme: InviteScheme,
    token: &'a str,
  ) -> Result<Option<Invite>> {
    let token = token.to_owned();

    let raw: Option<RawInvite> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(invite_select(scheme), rusqlite::params![token], read_invite)
          .optional()?)
      })
      .await?;

    raw.map(|r| r.into_invite(scheme)).transpose()
  }

  async fn reserve_invite(&self, scheme: InviteScheme, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let table  = scheme.table();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          &format!(
            "UPDATE {table} SET is_active = 0
             WHERE id = ?1 AND is_active = 1 AND used_at IS NULL"
          ),
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }

  async fn release_invite(&self, scheme: InviteScheme, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    let table  = scheme.table();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!("UPDATE {table} SET is_active = 1 WHERE id = ?1 AND used_at IS NULL"),
          rusqlite::params![id_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(())
  }

  async fn mark_invite_used(
    &self,
    scheme: InviteScheme,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> Result<bool> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(at);
    let table  = scheme.table();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          &format!(
            "UPDATE {table} SET used_at = ?2, is_active = 0
             WHERE id = ?1 AND used_at IS NULL"
          ),
          rusqlite::params![id_str, at_str],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }
}
