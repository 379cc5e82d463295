use super::{Deposit, DepositStatus, Order, OrderStatus, Product, UserSummary};

/// Back-office headline figures, derived from full admin listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dashboard {
    pub product_count: usize,
    pub user_count: usize,
    /// Sum of totals over approved, shipped and delivered orders
    pub revenue: f64,
    pub fulfilled_orders: usize,
    pub pending_orders: usize,
    pub pending_deposits: usize,
    pub approved_deposit_total: f64,
    pub approved_deposits: usize,
}

impl Dashboard {
    pub fn summarize(
        products: &[Product],
        users: &[UserSummary],
        orders: &[Order],
        deposits: &[Deposit],
    ) -> Self {
        let fulfilled: Vec<&Order> = orders.iter().filter(|o| o.status.is_fulfilled()).collect();
        let approved: Vec<&Deposit> = deposits
            .iter()
            .filter(|d| d.status == DepositStatus::Approved)
            .collect();

        Self {
            product_count: products.len(),
            user_count: users.len(),
            revenue: fulfilled.iter().map(|o| o.total_amount).sum(),
            fulfilled_orders: fulfilled.len(),
            pending_orders: orders.iter().filter(|o| o.status == OrderStatus::Pending).count(),
            pending_deposits: deposits
                .iter()
                .filter(|d| d.status == DepositStatus::Pending)
                .count(),
            approved_deposit_total: approved.iter().map(|d| d.amount).sum(),
            approved_deposits: approved.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(status: &str, total: f64) -> Order {
        serde_json::from_value(serde_json::json!({
            "_id": format!("o-{}-{}", status, total),
            "totalAmount": total,
            "status": status,
        }))
        .expect("Failed to build order")
    }

    fn deposit(status: &str, amount: f64) -> Deposit {
        serde_json::from_value(serde_json::json!({
            "_id": format!("d-{}-{}", status, amount),
            "method": "bKash",
            "amount": amount,
            "status": status,
        }))
        .expect("Failed to build deposit")
    }

    #[test]
    fn test_summarize() {
        let orders = vec![
            order("pending", 10.0),
            order("approved", 100.0),
            order("delivered", 50.0),
            order("cancelled", 999.0),
        ];
        let deposits = vec![deposit("pending", 5.0), deposit("approved", 200.0), deposit("rejected", 1.0)];

        let dashboard = Dashboard::summarize(&[], &[], &orders, &deposits);
        assert_eq!(dashboard.revenue, 150.0);
        assert_eq!(dashboard.fulfilled_orders, 2);
        assert_eq!(dashboard.pending_orders, 1);
        assert_eq!(dashboard.pending_deposits, 1);
        assert_eq!(dashboard.approved_deposits, 1);
        assert_eq!(dashboard.approved_deposit_total, 200.0);
    }
}
