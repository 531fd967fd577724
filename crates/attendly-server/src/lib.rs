//! Server wiring: configuration, backend selection and the HTTP listener.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use attendly_core::store::{AccountStore, IdentityAdmin, Mailer};
use attendly_provision::{ProvisionConfig, Provisioner};
use attendly_remote::{BrevoConfig, SupabaseConfig};
use axum::Router;
use config::{ConfigBuilder, ConfigError, builder::DefaultState};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Where identities and profiles live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
  /// The hosted identity provider and its REST tables.
  Supabase,
  /// A local SQLite file holding both.
  #[default]
  Sqlite,
}

/// Runtime server configuration, deserialised from `attendly.toml` and the
/// environment.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                      String,
  pub port:                      u16,
  pub backend:                   Backend,
  pub store_path:                PathBuf,
  pub supabase_url:              Option<String>,
  pub supabase_service_role_key: Option<String>,
  pub brevo_api_key:             Option<String>,
  pub brevo_sender_email:        Option<String>,
  pub brevo_sender_name:         Option<String>,
  pub student_login_domain:      String,
  pub app_name:                  String,
  pub login_url:                 Option<String>,
}

/// Unprefixed variables shared with the hosted deployment, and the key each
/// one overrides.
const WELL_KNOWN_ENV: &[(&str, &str)] = &[
  ("SUPABASE_URL", "supabase_url"),
  ("SUPABASE_SERVICE_ROLE_KEY", "supabase_service_role_key"),
  ("BREVO_API_KEY", "brevo_api_key"),
  ("BREVO_SENDER_EMAIL", "brevo_sender_email"),
  ("BREVO_SENDER_NAME", "brevo_sender_name"),
  ("PORT", "port"),
];

impl ServerConfig {
  /// Read `path` (optional), then `ATTENDLY_*` variables, then the
  /// well-known variables.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let builder = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("ATTENDLY"));
    Self::build(builder, |name| std::env::var(name).ok())
  }

  /// Apply defaults and the well-known overrides to `builder`.
  pub fn build(
    builder: ConfigBuilder<DefaultState>,
    env: impl Fn(&str) -> Option<String>,
  ) -> Result<Self, ConfigError> {
    let mut builder = builder
      .set_default("host", "0.0.0.0")?
      .set_default("port", 8080)?
      .set_default("backend", "sqlite")?
      .set_default("store_path", "attendly.db")?
      .set_default("student_login_domain", "students.attendly.app")?
      .set_default("app_name", "Attendly")?;
    for (var, key) in WELL_KNOWN_ENV {
      builder = builder.set_override_option(*key, env(var).filter(|v| !v.trim().is_empty()))?;
    }
    builder.build()?.try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  /// `None` unless both the URL and the key are set.
  pub fn supabase(&self) -> Option<SupabaseConfig> {
    Some(SupabaseConfig {
      url:              self.supabase_url.clone()?,
      service_role_key: self.supabase_service_role_key.clone()?,
    })
  }

  pub fn brevo(&self) -> Option<BrevoConfig> {
    BrevoConfig::from_parts(
      self.brevo_api_key.as_deref(),
      self.brevo_sender_email.as_deref(),
      self.brevo_sender_name.as_deref(),
    )
  }

  pub fn provision(&self) -> ProvisionConfig {
    ProvisionConfig {
      student_login_domain: self.student_login_domain.clone(),
      app_name:             self.app_name.clone(),
      login_url:            self.login_url.clone(),
    }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/") {
    if let Ok(home) = std::env::var("HOME") {
      return PathBuf::from(home).join(rest);
    }
  }
  path.to_path_buf()
}

// ─── Serving ──────────────────────────────────────────────────────────────────

/// The API router with request tracing.
pub fn app<I, S, M>(provisioner: Arc<Provisioner<I, S, M>>) -> Router
where
  I: IdentityAdmin + 'static,
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  attendly_api::api_router(provisioner).layer(TraceLayer::new_for_http())
}

/// Bind `address` and serve until Ctrl-C.
pub async fn serve<I, S, M>(
  address: &str,
  provisioner: Provisioner<I, S, M>,
) -> std::io::Result<()>
where
  I: IdentityAdmin + 'static,
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let app = app(Arc::new(provisioner));
  let listener = TcpListener::bind(address).await?;
  tracing::info!("Listening on http://{address}");

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  tracing::info!("server stopped");
  Ok(())
}

async fn shutdown_signal() {
  match tokio::signal::ctrl_c().await {
    Ok(()) => tracing::info!("received Ctrl-C, shutting down"),
    Err(e) => tracing::error!(error = %e, "failed to listen for Ctrl-C"),
  }
}
