//! Authentication: the signed-in session and everything that mutates it.
//!
//! This module provides:
//! - `Session`: the cached identity, balance and bearer token
//! - `SessionStore`: sole owner of the session, with persistence and
//!   background balance reconciliation
//! - `SentinelRule`: detection of placeholder identities that must never be
//!   treated as signed in
//! - `CredentialStore`: optional OS-level password storage via keyring

pub mod credentials;
pub mod sentinel;
pub mod session;
pub mod store;

pub use credentials::CredentialStore;
pub use sentinel::SentinelRule;
pub use session::{IdentityPayload, IncompletePayload, ProfileUpdate, Role, Session, SignupRequest};
pub use store::{AuthError, SessionStore, StoreOptions, DEFAULT_SYNC_INTERVAL, SESSION_KEY};
