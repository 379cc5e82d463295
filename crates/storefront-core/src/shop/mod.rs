//! Shopping cart and checkout.
//!
//! The cart is plain client state. `Checkout` reads the signed-in session
//! through a `SessionStore` handle and never writes to it directly; after a
//! successful order it asks the store to resync the balance.

pub mod cart;
pub mod checkout;

pub use cart::{Cart, CartItem};
pub use checkout::{Checkout, CheckoutError, CheckoutRequest, Quote};
