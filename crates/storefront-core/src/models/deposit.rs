use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum length for the sender's wallet/phone number on a deposit request.
pub const MIN_SENDER_NUMBER_LENGTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepositStatus {
    Pending,
    Approved,
    Rejected,
}

impl DepositStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(DepositStatus::Pending),
            "approved" | "approve" => Some(DepositStatus::Approved),
            "rejected" | "reject" => Some(DepositStatus::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for DepositStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DepositStatus::Pending => write!(f, "pending"),
            DepositStatus::Approved => write!(f, "approved"),
            DepositStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Request body for `POST /deposits`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub method: String,
    pub amount: f64,
    pub transaction_id: String,
    pub sender_number: String,
}

impl DepositRequest {
    /// Client-side checks before the request is sent.
    pub fn validate(&self) -> Result<(), String> {
        if self.method.trim().is_empty() {
            return Err("Please select a payment method".to_string());
        }
        if self.amount.is_nan() || self.amount <= 0.0 {
            return Err("Invalid amount".to_string());
        }
        if self.sender_number.trim().len() < MIN_SENDER_NUMBER_LENGTH {
            return Err("Invalid sender number".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deposit {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    /// Either a user id or a populated user object, depending on the endpoint.
    #[serde(default)]
    pub user: Option<serde_json::Value>,
    pub method: String,
    pub amount: f64,
    #[serde(rename = "transactionId", default)]
    pub transaction_id: Option<String>,
    #[serde(rename = "senderNumber", default)]
    pub sender_number: Option<String>,
    pub status: DepositStatus,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Deposit {
    /// Display name of the requesting user when the server populated it.
    pub fn user_display(&self) -> String {
        match &self.user {
            Some(serde_json::Value::Object(map)) => map
                .get("name")
                .or_else(|| map.get("email"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string(),
            Some(serde_json::Value::String(id)) => id.clone(),
            _ => "unknown".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(amount: f64, sender: &str) -> DepositRequest {
        DepositRequest {
            method: "bKash".to_string(),
            amount,
            transaction_id: "TX1".to_string(),
            sender_number: sender.to_string(),
        }
    }

    #[test]
    fn test_validate_deposit_request() {
        assert!(request(100.0, "01712345678").validate().is_ok());
        assert_eq!(request(0.0, "01712345678").validate(), Err("Invalid amount".to_string()));
        assert_eq!(request(f64::NAN, "01712345678").validate(), Err("Invalid amount".to_string()));
        assert_eq!(request(10.0, "0171").validate(), Err("Invalid sender number".to_string()));
    }

    #[test]
    fn test_user_display() {
        let json = r#"{"_id":"d1","user":{"_id":"u1","name":"Jane"},"method":"Nagad","amount":500,"status":"pending"}"#;
        let deposit: Deposit = serde_json::from_str(json).expect("Failed to parse deposit JSON");
        assert_eq!(deposit.user_display(), "Jane");

        let json = r#"{"_id":"d2","user":"u9","method":"Nagad","amount":5,"status":"approved"}"#;
        let deposit: Deposit = serde_json::from_str(json).expect("Failed to parse deposit JSON");
        assert_eq!(deposit.user_display(), "u9");
        assert_eq!(deposit.status, DepositStatus::Approved);
    }
}
