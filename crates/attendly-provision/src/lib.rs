//! The account provisioning workflow.
//!
//! Each operation is a short, stateless saga over three independently
//! failing collaborators (see [`attendly_core::store`]): validate locally,
//! optionally claim an invitation, create the identity, insert the profile,
//! then consume the invitation or send the credentials email. A failed
//! profile insert always deletes the identity it orphaned. Every failure is
//! tagged with the [`Step`] it happened at.

pub mod error;
pub mod invite;
pub mod outbox;
pub mod provisioner;
pub mod request;

pub use error::{ProvisionError, Step};
pub use invite::{InviteStrategy, InviteVerification};
pub use outbox::Outbox;
pub use provisioner::{ProvisionConfig, Provisioner};

#[cfg(test)]
mod tests;
