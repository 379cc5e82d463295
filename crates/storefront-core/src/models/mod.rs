//! Data models for storefront entities.
//!
//! This module contains the wire types exchanged with the API server:
//!
//! - `Product`: catalog entries
//! - `Order`, `OrderStatus`, `NewOrder`: placed orders and their lifecycle
//! - `Deposit`, `DepositStatus`, `DepositRequest`: manual balance top-ups
//! - `PaymentMethod`: payment gateways configured by admins
//! - `StoreSettings`: site-wide settings (COD charge, support contacts)
//! - `UserSummary`: admin view of registered accounts
//! - `Dashboard`: back-office figures derived from the admin listings
//!
//! The authenticated identity itself lives in `auth::Session`.

pub mod dashboard;
pub mod deposit;
pub mod order;
pub mod payment;
pub mod product;
pub mod settings;
pub mod user;

pub use dashboard::Dashboard;
pub use deposit::{Deposit, DepositRequest, DepositStatus};
pub use order::{CustomerDetails, NewOrder, Order, OrderItem, OrderStatus, PaymentOption};
pub use payment::PaymentMethod;
pub use product::Product;
pub use settings::{SocialLinks, StoreSettings, DEFAULT_COD_CHARGE};
pub use user::UserSummary;
