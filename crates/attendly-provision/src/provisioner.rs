//! [`Provisioner`]: the provisioning sagas.
//!
//! Writes happen in a fixed order: identity, then profile, then invitation
//! consumption or notification. A profile row is therefore never created
//! without an identity. The reverse can happen transiently, and is undone by
//! deleting the identity when the profile insert fails.

use std::future::Future;

use attendly_core::{
  identity::{Identity, NewIdentity},
  invite::Invite,
  mail::{MailReceipt, Mailbox},
  profile::{AccountStatus, AdminProfile, ProfessorProfile, Profile, StudentProfile},
  role::UserType,
  store::{AccountStore, IdentityAdmin, Mailer},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
  error::{ProvisionError, Step},
  invite::InviteVerification,
  outbox::{Credentials, Outbox},
  request::{
    CreateAdminRequest, CreateProfessorRequest, CreateStudentRequest,
    DeleteAccountRequest, InvitedProfile, RegisterInvitedRequest, StudentDetails,
  },
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Settings the sagas need. Built once at startup.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
  /// Domain of the synthetic login addresses given to students,
  /// `<student_number>@<domain>`.
  pub student_login_domain: String,
  /// Product name used in notification emails.
  pub app_name:             String,
  /// Sign-in page linked from notification emails.
  pub login_url:            Option<String>,
}

impl Default for ProvisionConfig {
  fn default() -> Self {
    Self {
      student_login_domain: "students.attendly.app".to_owned(),
      app_name:             "Attendly".to_owned(),
      login_url:            None,
    }
  }
}

impl ProvisionConfig {
  /// The identity email a student signs in with.
  pub fn student_login_email(&self, student_number: &str) -> String {
    format!(
      "{}@{}",
      student_number.trim().to_lowercase(),
      self.student_login_domain.trim_start_matches('@')
    )
  }
}

// ─── Outputs ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct AdminCreated {
  pub admin_id: Uuid,
  pub admin:    AdminProfile,
  pub brevo:    MailReceipt,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfessorCreated {
  pub professor_id: Uuid,
  pub professor:    ProfessorProfile,
  pub brevo:        MailReceipt,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentCreated {
  pub student_id:  Uuid,
  /// The synthetic identity email, distinct from `student.email`.
  pub login_email: String,
  pub student:     StudentProfile,
  pub brevo:       MailReceipt,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvitedUserRegistered {
  pub user_id:   Uuid,
  pub user_type: UserType,
  pub profile:   Profile,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountDeleted {
  pub user_id:          Uuid,
  pub profiles_deleted: u64,
}

// ─── Provisioner ─────────────────────────────────────────────────────────────

/// Runs the provisioning sagas against an identity provider `I`, a
/// relational store `S` and an optional mail sender `M`.
///
/// Holds no mutable state; share it behind an `Arc`.
pub struct Provisioner<I, S, M> {
  identities: I,
  store:      S,
  outbox:     Option<Outbox<M>>,
  invites:    InviteVerification,
  config:     ProvisionConfig,
}

impl<I, S, M> Provisioner<I, S, M>
where
  I: IdentityAdmin,
  S: AccountStore,
  M: Mailer,
{
  /// Without a mailer the direct creation paths fail at the `env` step,
  /// before touching anything external.
  pub fn new(identities: I, store: S, mailer: Option<M>, config: ProvisionConfig) -> Self {
    let outbox = mailer
      .map(|m| Outbox::new(m, config.app_name.clone(), config.login_url.clone()));
    Self {
      identities,
      store,
      outbox,
      invites: InviteVerification::default(),
      config,
    }
  }

  pub fn with_invite_verification(mut self, invites: InviteVerification) -> Self {
    self.invites = invites;
    self
  }

  pub fn identities(&self) -> &I { &self.identities }

  pub fn store(&self) -> &S { &self.store }

  pub fn config(&self) -> &ProvisionConfig { &self.config }

  fn outbox(&self) -> Result<&Outbox<M>, ProvisionError> {
    self.outbox.as_ref().ok_or_else(|| {
      ProvisionError::new(
        Step::Env,
        "email provider is not configured (BREVO_API_KEY, BREVO_SENDER_EMAIL)",
      )
    })
  }

  // ── Create admin ──────────────────────────────────────────────────────────

  pub async fn create_admin(
    &self,
    req: &CreateAdminRequest,
  ) -> Result<AdminCreated, ProvisionError> {
    let admin = req.validate()?;
    let outbox = self.outbox()?;
    let name = admin.full_name();

    let identity = self
      .create_identity(NewIdentity::verified(
        &admin.email,
        &admin.temp_password,
        UserType::Admin,
        &name,
      ))
      .await?;

    let profile = self
      .insert_or_compensate(
        Step::InsertAdmin,
        &identity,
        None,
        self.store.insert_admin(AdminProfile::new(identity.id, name.clone(), admin.email.clone())),
      )
      .await?;

    let brevo = outbox
      .deliver(
        &Credentials {
          recipient:   Mailbox::new(&admin.email, Some(name)),
          user_type:   UserType::Admin,
          login_email: &admin.email,
          password:    &admin.temp_password,
        },
        identity.id,
      )
      .await?;

    tracing::info!(identity_id = %identity.id, user_type = "admin", "account provisioned");
    Ok(AdminCreated { admin_id: identity.id, admin: profile, brevo })
  }

  // ── Create professor ──────────────────────────────────────────────────────

  pub async fn create_professor(
    &self,
    req: &CreateProfessorRequest,
  ) -> Result<ProfessorCreated, ProvisionError> {
    let prof = req.validate()?;
    let outbox = self.outbox()?;
    let name = prof.full_name();

    let identity = self
      .create_identity(NewIdentity::verified(
        &prof.email,
        &prof.password,
        UserType::Professor,
        &name,
      ))
      .await?;

    let profile = self
      .insert_or_compensate(
        Step::InsertProfessor,
        &identity,
        None,
        self.store.insert_professor(ProfessorProfile::new(
          identity.id,
          name.clone(),
          prof.email.clone(),
          prof.department.clone(),
        )),
      )
      .await?;

    let brevo = outbox
      .deliver(
        &Credentials {
          recipient:   Mailbox::new(&prof.email, Some(name)),
          user_type:   UserType::Professor,
          login_email: &prof.email,
          password:    &prof.password,
        },
        identity.id,
      )
      .await?;

    tracing::info!(identity_id = %identity.id, user_type = "professor", "account provisioned");
    Ok(ProfessorCreated { professor_id: identity.id, professor: profile, brevo })
  }

  // ── Create student ────────────────────────────────────────────────────────

  pub async fn create_student(
    &self,
    req: &CreateStudentRequest,
  ) -> Result<StudentCreated, ProvisionError> {
    let student = req.validate()?;
    let outbox = self.outbox()?;
    let name = student.details.full_name();
    let login_email = self.config.student_login_email(&student.details.student_number);

    let identity = self
      .create_identity(NewIdentity::verified(
        &login_email,
        &student.login_password,
        UserType::Student,
        &name,
      ))
      .await?;

    let row = student_row(identity.id, &student.details, &student.contact_email);
    let profile = self
      .insert_or_compensate(
        Step::UpsertStudent,
        &identity,
        None,
        self.store.upsert_student(row),
      )
      .await?;

    let brevo = outbox
      .deliver(
        &Credentials {
          recipient:   Mailbox::new(&student.contact_email, Some(name)),
          user_type:   UserType::Student,
          login_email: &login_email,
          password:    &student.login_password,
        },
        identity.id,
      )
      .await?;

    tracing::info!(identity_id = %identity.id, user_type = "student", "account provisioned");
    Ok(StudentCreated { student_id: identity.id, login_email, student: profile, brevo })
  }

  // ── Register invited user ─────────────────────────────────────────────────

  pub async fn register_invited_user(
    &self,
    req: &RegisterInvitedRequest,
  ) -> Result<InvitedUserRegistered, ProvisionError> {
    let reg = req.validate()?;
    let user_type = reg.profile.user_type();

    let invite = self
      .invites
      .verify(&self.store, &reg.token, user_type, Utc::now())
      .await?;

    if let Some(email) = &reg.email {
      if !email.eq_ignore_ascii_case(&invite.email) {
        return Err(ProvisionError::invite("email does not match the invitation"));
      }
    }

    // Claim before creating anything: of two concurrent redemptions only
    // one can win this conditional update.
    match self.store.reserve_invite(invite.scheme, invite.id).await {
      Ok(true) => {}
      Ok(false) => {
        tracing::info!(invite_id = %invite.id, "invite claimed concurrently");
        return Err(ProvisionError::invite("invitation has already been used"));
      }
      Err(e) => return Err(ProvisionError::from_source(Step::Invite, &e)),
    }

    let contact_email = invite.email.to_lowercase();
    let login_email = match &reg.profile {
      InvitedProfile::Student(d) => self.config.student_login_email(&d.student_number),
      _ => contact_email.clone(),
    };

    let identity = match self
      .create_identity(NewIdentity::verified(
        &login_email,
        &reg.password,
        user_type,
        reg.profile.full_name(),
      ))
      .await
    {
      Ok(identity) => identity,
      Err(e) => {
        self.release(&invite).await;
        return Err(e);
      }
    };

    let profile = match &reg.profile {
      InvitedProfile::Admin { .. } => Profile::Admin(
        self
          .insert_or_compensate(
            Step::InsertProfile,
            &identity,
            Some(&invite),
            self.store.insert_admin(AdminProfile::new(
              identity.id,
              reg.profile.full_name(),
              contact_email.clone(),
            )),
          )
          .await?,
      ),
      InvitedProfile::Professor { department, .. } => Profile::Professor(
        self
          .insert_or_compensate(
            Step::InsertProfile,
            &identity,
            Some(&invite),
            self.store.insert_professor(ProfessorProfile::new(
              identity.id,
              reg.profile.full_name(),
              contact_email.clone(),
              department.clone(),
            )),
          )
          .await?,
      ),
      InvitedProfile::Student(details) => Profile::Student(
        self
          .insert_or_compensate(
            Step::InsertProfile,
            &identity,
            Some(&invite),
            self.store.upsert_student(student_row(identity.id, details, &contact_email)),
          )
          .await?,
      ),
    };

    // Known non-atomic window: the account exists and the invite is
    // reserved (so it cannot be redeemed again) but `used_at` is unset.
    let marked = self
      .store
      .mark_invite_used(invite.scheme, invite.id, Utc::now())
      .await;
    match marked {
      Ok(true) => {}
      Ok(false) => {
        tracing::error!(invite_id = %invite.id, identity_id = %identity.id, "invite row vanished before it was marked used");
        return Err(
          ProvisionError::new(Step::UpdateInvite, "invitation could not be marked as used")
            .with_details(json!({ "user_id": identity.id, "account_created": true })),
        );
      }
      Err(e) => {
        tracing::error!(invite_id = %invite.id, identity_id = %identity.id, error = %e, "failed to mark invite used");
        return Err(
          ProvisionError::from_source(Step::UpdateInvite, &e)
            .with_details(json!({ "user_id": identity.id, "account_created": true })),
        );
      }
    }

    tracing::info!(
      identity_id = %identity.id,
      %user_type,
      scheme = %invite.scheme,
      "invited account registered"
    );
    Ok(InvitedUserRegistered { user_id: identity.id, user_type, profile })
  }

  // ── Delete account ────────────────────────────────────────────────────────

  /// Delete every profile row for the id, then the identity itself.
  pub async fn delete_account(
    &self,
    req: &DeleteAccountRequest,
  ) -> Result<AccountDeleted, ProvisionError> {
    let user_id = req.validate()?;

    let profiles_deleted = self
      .store
      .delete_profiles(user_id)
      .await
      .map_err(|e| ProvisionError::from_source(Step::DeleteProfile, &e))?;

    if let Err(e) = self.identities.delete_user(user_id).await {
      tracing::warn!(%user_id, profiles_deleted, error = %e, "identity deletion failed");
      return Err(
        ProvisionError::from_source(Step::DeleteUser, &e)
          .with_details(json!({ "profiles_deleted": profiles_deleted })),
      );
    }

    tracing::info!(%user_id, profiles_deleted, "account deleted");
    Ok(AccountDeleted { user_id, profiles_deleted })
  }

  // ── Saga steps ────────────────────────────────────────────────────────────

  async fn create_identity(&self, input: NewIdentity) -> Result<Identity, ProvisionError> {
    let user_type = input.user_type;
    self.identities.create_user(input).await.map_err(|e| {
      tracing::warn!(%user_type, error = %e, "identity creation rejected");
      ProvisionError::from_source(Step::CreateUser, &e)
    })
  }

  /// Await a profile write; if it fails, delete the identity created for it
  /// and release any invitation reservation before reporting `step`.
  async fn insert_or_compensate<T>(
    &self,
    step: Step,
    identity: &Identity,
    reservation: Option<&Invite>,
    insert: impl Future<Output = Result<T, S::Error>>,
  ) -> Result<T, ProvisionError> {
    let source = match insert.await {
      Ok(row) => return Ok(row),
      Err(e) => e,
    };
    tracing::warn!(%step, identity_id = %identity.id, error = %source, "profile write failed; compensating");

    let mut err = ProvisionError::from_source(step, &source);
    match self.identities.delete_user(identity.id).await {
      Ok(()) => {
        err = err.with_details(json!({ "identity_deleted": true }));
      }
      Err(cleanup) => {
        tracing::error!(
          identity_id = %identity.id,
          error = %cleanup,
          "compensating identity delete failed; identity is orphaned"
        );
        err = err.with_details(json!({
          "identity_deleted": false,
          "orphaned_identity": identity.id,
          "cleanup_error": cleanup.to_string(),
        }));
      }
    }
    if let Some(invite) = reservation {
      self.release(invite).await;
    }
    Err(err)
  }

  async fn release(&self, invite: &Invite) {
    if let Err(e) = self.store.release_invite(invite.scheme, invite.id).await {
      tracing::error!(invite_id = %invite.id, error = %e, "failed to release invite reservation");
    }
  }
}

fn student_row(id: Uuid, d: &StudentDetails, contact_email: &str) -> StudentProfile {
  StudentProfile {
    id,
    first_name:     d.first_name.clone(),
    middle_name:    d.middle_name.clone(),
    last_name:      d.last_name.clone(),
    student_number: d.student_number.clone(),
    email:          contact_email.to_owned(),
    department:     d.department.clone(),
    program:        d.program.clone(),
    year_level:     d.year_level.clone(),
    section:        d.section.clone(),
    status:         AccountStatus::Active,
    archived:       false,
  }
}
