//! Storefront client core.
//!
//! Client library for the storefront REST API. It owns the signed-in
//! session (`auth::SessionStore`), keeps the cached account balance in step
//! with the server, and provides the cart, checkout and back-office calls
//! built on top of it.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod shop;
pub mod storage;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, ProfileUpdate, Role, Session, SessionStore, SignupRequest, StoreOptions};
pub use config::Config;
pub use shop::{Cart, Checkout, CheckoutError, CheckoutRequest};
pub use storage::{FileStore, MemoryStore, Storage};
