use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Approved,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(OrderStatus::Pending),
            "approved" => Some(OrderStatus::Approved),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" | "canceled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Orders the back office counts as revenue.
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, OrderStatus::Approved | OrderStatus::Shipped | OrderStatus::Delivered)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Approved => write!(f, "approved"),
            OrderStatus::Shipped => write!(f, "shipped"),
            OrderStatus::Delivered => write!(f, "delivered"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// How an order is paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOption {
    /// Paid from the account's stored balance
    Balance,
    /// Cash on delivery, carries the configured COD charge
    Cod,
}

impl std::fmt::Display for PaymentOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentOption::Balance => write!(f, "balance"),
            PaymentOption::Cod => write!(f, "cod"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub contact_platform: Option<String>,
    #[serde(default)]
    pub contact_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(rename = "id", default)]
    pub product_id: String,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl OrderItem {
    pub fn line_total(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

/// Request body for `POST /orders`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub customer: CustomerDetails,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub payment_method: PaymentOption,
    pub cod_charge: f64,
    pub status: OrderStatus,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    /// Either a user id or a populated user object, depending on the endpoint.
    #[serde(default)]
    pub user: Option<serde_json::Value>,
    #[serde(default)]
    pub customer: Option<CustomerDetails>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub cod_charge: Option<f64>,
    pub status: OrderStatus,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_order() {
        let json = r#"{
            "_id": "o1",
            "user": "u1",
            "customer": {"fullName": "Jane Doe", "email": "jane@shop.test", "phone": "01700000000", "address": "1 Road", "city": "Dhaka", "zipCode": "1200", "contactPlatform": "WhatsApp"},
            "items": [{"id": "p1", "name": "Headphones", "price": 129.99, "quantity": 2}],
            "totalAmount": 259.98,
            "paymentMethod": "balance",
            "codCharge": 0,
            "status": "pending",
            "createdAt": "2024-05-01T10:00:00Z"
        }"#;
        let order: Order = serde_json::from_str(json).expect("Failed to parse order JSON");
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.item_count(), 2);
        assert_eq!(order.customer.as_ref().map(|c| c.city.as_str()), Some("Dhaka"));
        assert!(order.created_at.is_some());
    }

    #[test]
    fn test_order_status_parse() {
        assert_eq!(OrderStatus::parse("Shipped"), Some(OrderStatus::Shipped));
        assert_eq!(OrderStatus::parse("canceled"), Some(OrderStatus::Cancelled));
        assert_eq!(OrderStatus::parse("lost"), None);
        assert!(OrderStatus::Delivered.is_fulfilled());
        assert!(!OrderStatus::Pending.is_fulfilled());
    }

    #[test]
    fn test_new_order_wire_names() {
        let order = NewOrder {
            customer: CustomerDetails::default(),
            items: vec![],
            total_amount: 50.0,
            payment_method: PaymentOption::Cod,
            cod_charge: 50.0,
            status: OrderStatus::Pending,
            date: Utc::now(),
        };
        let value = serde_json::to_value(&order).expect("serialize order");
        assert_eq!(value["paymentMethod"], "cod");
        assert_eq!(value["totalAmount"], 50.0);
        assert_eq!(value["status"], "pending");
        assert!(value["customer"].get("fullName").is_some());
    }
}
