//! REST API client module for the storefront server.
//!
//! This module provides the `ApiClient` for communicating with the
//! storefront API: authentication, catalog, orders, deposits, payment
//! gateways, site settings, and user administration.
//!
//! Authenticated endpoints take a bearer token obtained from login or
//! signup and held by the `SessionStore`.

pub mod client;
pub mod error;

pub use client::{ApiClient, DEFAULT_BASE_URL};
pub use error::{failure_message, is_invalid_credential, ApiError};
