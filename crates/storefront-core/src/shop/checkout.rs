//! Order submission with a client-side balance pre-check.
//!
//! The server stays authoritative for balances. The pre-check only avoids
//! submitting an order the cached balance obviously cannot cover; the server
//! may still reject if the balance was spent elsewhere in the meantime.

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::api;
use crate::auth::SessionStore;
use crate::models::{CustomerDetails, NewOrder, Order, OrderStatus, PaymentOption, StoreSettings};

use super::Cart;

const FAILURE_FALLBACK: &str = "Failed to place order";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Sign in to place an order")]
    NotSignedIn,

    #[error("{0}")]
    InvalidDetails(String),

    /// The cached balance cannot cover the order. Top up with a deposit.
    #[error("Your balance (${balance:.2}) is lower than the order total (${total:.2}). Top up with a deposit first.")]
    InsufficientBalance { balance: f64, total: f64 },

    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub customer: CustomerDetails,
    pub payment: PaymentOption,
}

/// Price breakdown for a cart under a payment option.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub subtotal: f64,
    pub cod_charge: f64,
    pub total: f64,
}

impl Quote {
    pub fn new(cart: &Cart, payment: PaymentOption, settings: &StoreSettings) -> Self {
        let subtotal = cart.total();
        let cod_charge = match payment {
            PaymentOption::Cod => settings.cod_charge(),
            PaymentOption::Balance => 0.0,
        };
        Self {
            subtotal,
            cod_charge,
            total: subtotal + cod_charge,
        }
    }
}

pub struct Checkout {
    store: SessionStore,
}

impl Checkout {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    /// Place an order for everything in `cart`.
    ///
    /// For balance payments the balance is read from the store at this
    /// moment, not from any earlier snapshot. On success the balance is
    /// resynced and the cart cleared.
    pub async fn submit(
        &self,
        cart: &mut Cart,
        request: CheckoutRequest,
        settings: &StoreSettings,
    ) -> Result<Order, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        validate_customer(&request.customer)?;

        let session = self.store.current().ok_or(CheckoutError::NotSignedIn)?;
        let quote = Quote::new(cart, request.payment, settings);

        if request.payment == PaymentOption::Balance && session.balance < quote.total {
            info!(balance = session.balance, total = quote.total, "Insufficient balance for order");
            return Err(CheckoutError::InsufficientBalance {
                balance: session.balance,
                total: quote.total,
            });
        }

        let order = NewOrder {
            customer: request.customer,
            items: cart.to_order_items(),
            total_amount: quote.total,
            payment_method: request.payment,
            cod_charge: quote.cod_charge,
            status: OrderStatus::Pending,
            date: Utc::now(),
        };

        let client = self.store.authorized_client().ok_or(CheckoutError::NotSignedIn)?;
        let created = client.create_order(&order).await.map_err(|e| {
            warn!(error = %e, "Order submission failed");
            CheckoutError::Rejected(api::failure_message(&e, FAILURE_FALLBACK))
        })?;

        info!(order_id = %created.id, total = quote.total, payment = %request.payment, "Order placed");
        self.store.sync_balance().await;
        cart.clear();
        Ok(created)
    }
}

fn validate_customer(customer: &CustomerDetails) -> Result<(), CheckoutError> {
    let required = [
        ("Full name", &customer.full_name),
        ("Phone", &customer.phone),
        ("Address", &customer.address),
    ];
    for (label, value) in required {
        if value.trim().is_empty() {
            return Err(CheckoutError::InvalidDetails(format!("{} is required", label)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Product;

    fn cart_of(price: f64, quantity: i64) -> Cart {
        let mut cart = Cart::new();
        cart.add(&Product {
            id: "p1".to_string(),
            name: "Backpack".to_string(),
            price,
            category: None,
            image: None,
            description: None,
            stock: None,
        });
        cart.update_quantity("p1", quantity - 1);
        cart
    }

    #[test]
    fn test_quote_adds_cod_charge() {
        let cart = cart_of(100.0, 2);
        let settings = StoreSettings::default();

        let balance = Quote::new(&cart, PaymentOption::Balance, &settings);
        assert_eq!(balance.total, 200.0);
        assert_eq!(balance.cod_charge, 0.0);

        let cod = Quote::new(&cart, PaymentOption::Cod, &settings);
        assert_eq!(cod.cod_charge, 50.0);
        assert_eq!(cod.total, 250.0);

        let custom = StoreSettings {
            cod_charge: Some(80.0),
            ..Default::default()
        };
        assert_eq!(Quote::new(&cart, PaymentOption::Cod, &custom).total, 280.0);
    }

    #[test]
    fn test_validate_customer() {
        let mut customer = CustomerDetails {
            full_name: "Jane Doe".to_string(),
            phone: "01700000000".to_string(),
            address: "12 Main St".to_string(),
            ..Default::default()
        };
        assert!(validate_customer(&customer).is_ok());

        customer.address = "  ".to_string();
        assert_eq!(
            validate_customer(&customer),
            Err(CheckoutError::InvalidDetails("Address is required".to_string()))
        );
    }

    #[test]
    fn test_insufficient_balance_message() {
        let err = CheckoutError::InsufficientBalance {
            balance: 20.0,
            total: 1250.5,
        };
        assert_eq!(
            err.to_string(),
            "Your balance ($20.00) is lower than the order total ($1250.50). Top up with a deposit first."
        );
    }
}
