use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id", alias = "id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stock: Option<i64>,
}

impl Product {
    pub fn category_display(&self) -> &str {
        self.category.as_deref().unwrap_or("Uncategorized")
    }

    pub fn in_stock(&self) -> bool {
        self.stock.map(|s| s > 0).unwrap_or(true)
    }

    /// Case-insensitive match against name and category, used by catalog search.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return true;
        }
        crate::utils::contains_ignore_case(&self.name, query)
            || self
                .category
                .as_deref()
                .map(|c| crate::utils::contains_ignore_case(c, query))
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mongo_style_product() {
        let json = r#"{"_id":"p1","name":"Smart Watch Series 7","price":299.99,"category":"Electronics","stock":0,"__v":0}"#;
        let product: Product = serde_json::from_str(json).expect("Failed to parse product JSON");
        assert_eq!(product.id, "p1");
        assert_eq!(product.category_display(), "Electronics");
        assert!(!product.in_stock());
    }

    #[test]
    fn test_matches() {
        let product = Product {
            id: "1".into(),
            name: "Classic Leather Backpack".into(),
            price: 79.99,
            category: Some("Fashion".into()),
            image: None,
            description: None,
            stock: None,
        };
        assert!(product.matches("leather"));
        assert!(product.matches("FASHION"));
        assert!(product.matches("  "));
        assert!(!product.matches("headphones"));
        assert!(product.in_stock());
    }
}
