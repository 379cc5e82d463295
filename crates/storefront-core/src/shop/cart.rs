use serde::{Deserialize, Serialize};

use crate::models::{OrderItem, Product};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    pub fn line_total(&self) -> f64 {
        self.product.price * f64::from(self.quantity)
    }
}

impl From<&CartItem> for OrderItem {
    fn from(item: &CartItem) -> Self {
        OrderItem {
            product_id: item.product.id.clone(),
            name: item.product.name.clone(),
            price: item.product.price,
            quantity: item.quantity,
            image: item.product.image.clone(),
        }
    }
}

/// Lines keyed by product id, in the order they were first added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one unit of `product`, incrementing the line if it already exists.
    pub fn add(&mut self, product: &Product) {
        match self.items.iter_mut().find(|i| i.product.id == product.id) {
            Some(item) => item.quantity = item.quantity.saturating_add(1),
            None => self.items.push(CartItem {
                product: product.clone(),
                quantity: 1,
            }),
        }
    }

    pub fn remove(&mut self, product_id: &str) {
        self.items.retain(|i| i.product.id != product_id);
    }

    /// Adjust a line's quantity by `delta`. Quantity never drops below one;
    /// use `remove` to drop a line.
    pub fn update_quantity(&mut self, product_id: &str, delta: i64) {
        if let Some(item) = self.items.iter_mut().find(|i| i.product.id == product_id) {
            let next = i64::from(item.quantity)
                .saturating_add(delta)
                .clamp(1, i64::from(u32::MAX));
            item.quantity = next as u32;
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of line totals, before any delivery charge.
    pub fn total(&self) -> f64 {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Number of units across all lines.
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |count, i| count.saturating_add(i.quantity))
    }

    pub fn to_order_items(&self) -> Vec<OrderItem> {
        self.items.iter().map(OrderItem::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, price: f64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            price,
            category: None,
            image: None,
            description: None,
            stock: None,
        }
    }

    #[test]
    fn test_add_increments_existing_line() {
        let mut cart = Cart::new();
        let headphones = product("p1", 129.99);
        cart.add(&headphones);
        cart.add(&headphones);
        cart.add(&product("p2", 10.0));

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.item_count(), 3);
        assert!((cart.total() - 269.98).abs() < 1e-9);
    }

    #[test]
    fn test_update_quantity_floor() {
        let mut cart = Cart::new();
        cart.add(&product("p1", 5.0));
        cart.update_quantity("p1", 3);
        assert_eq!(cart.item_count(), 4);

        cart.update_quantity("p1", -10);
        assert_eq!(cart.item_count(), 1);

        cart.update_quantity("missing", 1);
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn test_quantities_saturate_at_max() {
        let mut cart = Cart::new();
        cart.add(&product("p1", 1.0));
        cart.add(&product("p2", 1.0));
        cart.update_quantity("p1", i64::MAX);
        assert_eq!(cart.items()[0].quantity, u32::MAX);

        cart.add(&product("p1", 1.0));
        assert_eq!(cart.items()[0].quantity, u32::MAX);
        assert_eq!(cart.item_count(), u32::MAX);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new();
        cart.add(&product("p1", 5.0));
        cart.add(&product("p2", 7.0));
        cart.remove("p1");
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.total(), 7.0);

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), 0.0);
    }

    #[test]
    fn test_order_items_use_product_id() {
        let mut cart = Cart::new();
        cart.add(&product("p9", 3.5));
        let items = cart.to_order_items();
        assert_eq!(items[0].product_id, "p9");
        assert_eq!(items[0].quantity, 1);
        assert_eq!(items[0].line_total(), 3.5);
    }
}
