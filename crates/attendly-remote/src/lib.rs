//! Hosted backends for Attendly provisioning, spoken to over HTTPS.
//!
//! - [`SupabaseAuth`]: the identity provider's admin API (`/auth/v1/admin`).
//! - [`PostgrestStore`]: the profile and invitation tables (`/rest/v1`).
//! - [`BrevoMailer`]: the transactional email API.
//!
//! All three authenticate with a privileged key and must only ever run
//! server-side.

pub mod brevo;
pub mod error;
pub mod postgrest;
pub mod supabase;

pub use brevo::{BrevoConfig, BrevoMailer};
pub use error::{Error, Result};
pub use postgrest::PostgrestStore;
pub use supabase::{SupabaseAuth, SupabaseClient, SupabaseConfig};
