use serde::{Deserialize, Serialize};

/// A manual payment gateway (mobile wallet, bank account) that customers
/// send deposits to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    /// Empty for a gateway that has not been saved yet.
    #[serde(rename = "_id", alias = "id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    pub number: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl PaymentMethod {
    pub fn new(name: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            number: number.into(),
            instructions: None,
            image: None,
            is_active: true,
        }
    }
}
