//! attendly-server binary.
//!
//! Reads `attendly.toml` (or the path given with `--config`) plus the
//! environment, builds the provisioning backends once, and serves the JSON
//! API over HTTP.
//!
//! # Seeding an invitation
//!
//! With the SQLite backend, an invitation can be created from the shell:
//!
//! ```
//! cargo run -p attendly-server -- invite --email ada@uni.edu --user-type professor
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use attendly_core::{
  invite::{Invite, InviteScheme},
  role::UserType,
  store::{AccountStore, IdentityAdmin},
};
use attendly_provision::Provisioner;
use attendly_remote::{BrevoMailer, SupabaseClient};
use attendly_server::{Backend, ServerConfig, expand_tilde, serve};
use attendly_store_sqlite::SqliteStore;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Attendly account provisioning server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "attendly.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Create an invitation in the SQLite store and print its token.
  Invite {
    #[arg(long)]
    email:     String,
    /// admin, professor or student.
    #[arg(long, value_parser = parse_user_type)]
    user_type: UserType,
    /// Days until the invitation expires.
    #[arg(long, default_value_t = 7)]
    days:      i64,
    /// Write to the legacy admin-only invitation table.
    #[arg(long)]
    legacy:    bool,
  },
}

fn parse_user_type(s: &str) -> Result<UserType, String> {
  UserType::parse(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => run(cfg).await,
    Command::Invite { email, user_type, days, legacy } => {
      seed_invite(&cfg, email, user_type, days, legacy).await
    }
  }
}

async fn run(cfg: ServerConfig) -> anyhow::Result<()> {
  let mailer = match cfg.brevo() {
    Some(brevo) => Some(BrevoMailer::new(brevo).context("failed to build email client")?),
    None => {
      tracing::warn!(
        "BREVO_API_KEY or BREVO_SENDER_EMAIL not set; account creation endpoints will fail with step \"env\""
      );
      None
    }
  };
  let address = cfg.address();

  match cfg.backend {
    Backend::Supabase => {
      let supabase = cfg
        .supabase()
        .context("backend = \"supabase\" requires SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY")?;
      let client = SupabaseClient::new(supabase).context("invalid Supabase configuration")?;
      tracing::info!(url = ?cfg.supabase_url, "using hosted backend");
      start(&address, Provisioner::new(client.auth(), client.rest(), mailer, cfg.provision())).await
    }
    Backend::Sqlite => {
      let store = open_store(&cfg).await?;
      start(&address, Provisioner::new(store.identities(), store, mailer, cfg.provision())).await
    }
  }
}

async fn start<I, S>(
  address: &str,
  provisioner: Provisioner<I, S, BrevoMailer>,
) -> anyhow::Result<()>
where
  I: IdentityAdmin + 'static,
  S: AccountStore + 'static,
{
  serve(address, provisioner)
    .await
    .with_context(|| format!("server error on {address}"))
}

async fn open_store(cfg: &ServerConfig) -> anyhow::Result<SqliteStore> {
  let store_path = expand_tilde(&cfg.store_path);
  tracing::info!(path = ?store_path, "using SQLite backend");
  SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))
}

async fn seed_invite(
  cfg: &ServerConfig,
  email: String,
  user_type: UserType,
  days: i64,
  legacy: bool,
) -> anyhow::Result<()> {
  anyhow::ensure!(
    cfg.backend == Backend::Sqlite,
    "invitations can only be seeded into the SQLite backend"
  );
  anyhow::ensure!(
    !legacy || user_type == UserType::Admin,
    "legacy invitations are admin-only"
  );

  let store = open_store(cfg).await?;
  let invite = Invite {
    id: Uuid::new_v4(),
    token: Uuid::new_v4().simple().to_string(),
    email: email.trim().to_lowercase(),
    user_type,
    expires_at: Utc::now() + Duration::days(days),
    used_at: None,
    is_active: true,
    scheme: if legacy { InviteScheme::LegacyAdmin } else { InviteScheme::Primary },
  };
  store
    .insert_invite(&invite)
    .await
    .context("failed to insert invitation")?;

  tracing::info!(invite_id = %invite.id, %user_type, "invitation created");
  println!("{}", invite.token);
  Ok(())
}
