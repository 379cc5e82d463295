use serde::{Deserialize, Serialize};

/// Cash-on-delivery surcharge used when the server has no setting.
pub const DEFAULT_COD_CHARGE: f64 = 50.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialLinks {
    #[serde(default)]
    pub facebook: String,
    #[serde(default)]
    pub twitter: String,
    #[serde(default)]
    pub instagram: String,
    #[serde(default)]
    pub linkedin: String,
    #[serde(default)]
    pub youtube: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSettings {
    #[serde(default)]
    pub cod_charge: Option<f64>,
    #[serde(default)]
    pub support_email: Option<String>,
    #[serde(default)]
    pub support_phone: Option<String>,
    #[serde(default)]
    pub social_links: SocialLinks,
    #[serde(default)]
    pub auth_images: Vec<String>,
}

impl StoreSettings {
    pub fn cod_charge(&self) -> f64 {
        self.cod_charge.unwrap_or(DEFAULT_COD_CHARGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cod_charge_default() {
        assert_eq!(StoreSettings::default().cod_charge(), DEFAULT_COD_CHARGE);

        let settings: StoreSettings = serde_json::from_str(r#"{"codCharge": 80, "socialLinks": {"facebook": "fb"}}"#)
            .expect("Failed to parse settings JSON");
        assert_eq!(settings.cod_charge(), 80.0);
        assert_eq!(settings.social_links.facebook, "fb");
        assert!(settings.auth_images.is_empty());
    }
}
