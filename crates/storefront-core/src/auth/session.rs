use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    #[serde(alias = "user")]
    Customer,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// The authenticated identity plus its bearer credential.
///
/// Display fields and `balance` mirror the server and are refreshed by
/// reconciliation. `user_id` and `role` are fixed for the lifetime of the
/// session; `token` only changes when the server issues a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(rename = "profilePicture", default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub balance: f64,
    pub token: String,
}

/// Identity payload as returned by the auth endpoints.
///
/// Every field is optional: `/auth/me` and `/auth/profile` may return any
/// subset. Unknown fields are ignored, so nothing outside this list can end
/// up in a `Session`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IdentityPayload {
    #[serde(rename = "userId", alias = "_id", alias = "id", default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(rename = "profilePicture", alias = "profilePic", default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub balance: Option<f64>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Why an auth response could not become a `Session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncompletePayload {
    MissingUserId,
    MissingToken,
}

impl Session {
    /// Build a fresh session from a login or signup response.
    pub fn from_payload(payload: IdentityPayload) -> Result<Self, IncompletePayload> {
        let user_id = payload
            .user_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(IncompletePayload::MissingUserId)?;
        let token = payload
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or(IncompletePayload::MissingToken)?;

        Ok(Self {
            user_id,
            name: payload.name.unwrap_or_default(),
            email: payload.email.unwrap_or_default(),
            phone: payload.phone,
            profile_picture: payload.profile_picture,
            address: payload.address,
            city: payload.city,
            country: payload.country,
            role: payload.role.unwrap_or_default(),
            balance: payload.balance.unwrap_or(0.0),
            token,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Merge server-mirrored fields from `payload` into this session.
    ///
    /// Only the named display fields and `balance` are considered; a field
    /// absent from the payload keeps its cached value. `user_id`, `role` and
    /// `token` are never touched here. Returns true if anything changed.
    pub fn reconcile(&mut self, payload: &IdentityPayload) -> bool {
        let mut changed = false;

        changed |= merge_value(&mut self.name, payload.name.as_ref());
        changed |= merge_value(&mut self.email, payload.email.as_ref());
        changed |= merge_optional(&mut self.phone, payload.phone.as_ref());
        changed |= merge_optional(&mut self.profile_picture, payload.profile_picture.as_ref());
        changed |= merge_optional(&mut self.address, payload.address.as_ref());
        changed |= merge_optional(&mut self.city, payload.city.as_ref());
        changed |= merge_optional(&mut self.country, payload.country.as_ref());

        if let Some(balance) = payload.balance {
            if balance.is_finite() && balance != self.balance {
                self.balance = balance;
                changed = true;
            }
        }

        changed
    }

    /// Merge a profile-update response: `reconcile` plus adopting a new
    /// token when the server explicitly issued one.
    pub fn apply_profile_update(&mut self, payload: &IdentityPayload) -> bool {
        let mut changed = self.reconcile(payload);
        if let Some(token) = payload.token.as_deref().filter(|t| !t.trim().is_empty()) {
            if token != self.token {
                self.token = token.to_string();
                changed = true;
            }
        }
        changed
    }
}

fn merge_value<T: Clone + PartialEq>(current: &mut T, incoming: Option<&T>) -> bool {
    match incoming {
        Some(value) if value != current => {
            *current = value.clone();
            true
        }
        _ => false,
    }
}

fn merge_optional<T: Clone + PartialEq>(current: &mut Option<T>, incoming: Option<&T>) -> bool {
    match incoming {
        Some(value) if current.as_ref() != Some(value) => {
            *current = Some(value.clone());
            true
        }
        _ => false,
    }
}

/// Request body for `POST /auth/signup`.
#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
}

/// Partial profile fields for `PUT /auth/profile`. `None` fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "profilePicture", skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            user_id: "u1".to_string(),
            name: "Jane".to_string(),
            email: "jane@shop.test".to_string(),
            phone: None,
            profile_picture: None,
            address: None,
            city: None,
            country: None,
            role: Role::Customer,
            balance: 100.0,
            token: "t1".to_string(),
        }
    }

    #[test]
    fn test_from_payload_requires_id_and_token() {
        let payload: IdentityPayload =
            serde_json::from_str(r#"{"_id":"u1","name":"Jane","role":"admin","balance":100,"token":"t1"}"#)
                .expect("Failed to parse payload");
        let s = Session::from_payload(payload.clone()).expect("complete payload");
        assert_eq!(s.user_id, "u1");
        assert!(s.is_admin());
        assert_eq!(s.balance, 100.0);

        let no_token = IdentityPayload { token: None, ..payload.clone() };
        assert_eq!(Session::from_payload(no_token), Err(IncompletePayload::MissingToken));

        let blank_id = IdentityPayload { user_id: Some("  ".into()), ..payload };
        assert_eq!(Session::from_payload(blank_id), Err(IncompletePayload::MissingUserId));
    }

    #[test]
    fn test_reconcile_keeps_token_and_identity() {
        let mut s = session();
        let payload = IdentityPayload {
            user_id: Some("someone-else".into()),
            role: Some(Role::Admin),
            token: Some("stray".into()),
            balance: Some(150.0),
            ..Default::default()
        };
        assert!(s.reconcile(&payload));
        assert_eq!(s.balance, 150.0);
        assert_eq!(s.token, "t1");
        assert_eq!(s.user_id, "u1");
        assert_eq!(s.role, Role::Customer);
    }

    #[test]
    fn test_reconcile_reports_no_change_for_identical_payload() {
        let mut s = session();
        let payload = IdentityPayload {
            name: Some("Jane".into()),
            balance: Some(100.0),
            ..Default::default()
        };
        assert!(!s.reconcile(&payload));
        assert_eq!(s, session());
    }

    #[test]
    fn test_reconcile_ignores_non_finite_balance() {
        let mut s = session();
        let payload = IdentityPayload { balance: Some(f64::NAN), ..Default::default() };
        assert!(!s.reconcile(&payload));
        assert_eq!(s.balance, 100.0);
    }

    #[test]
    fn test_profile_update_adopts_explicit_token_only() {
        let mut s = session();
        let renamed = IdentityPayload { name: Some("New Name".into()), ..Default::default() };
        assert!(s.apply_profile_update(&renamed));
        assert_eq!(s.name, "New Name");
        assert_eq!(s.token, "t1");

        let blank = IdentityPayload { token: Some(String::new()), ..Default::default() };
        assert!(!s.apply_profile_update(&blank));
        assert_eq!(s.token, "t1");

        let rotated = IdentityPayload { token: Some("t2".into()), ..Default::default() };
        assert!(s.apply_profile_update(&rotated));
        assert_eq!(s.token, "t2");
    }

    #[test]
    fn test_profile_picture_alias() {
        let payload: IdentityPayload = serde_json::from_str(r#"{"profilePic":"data:image/png;base64,AAA"}"#)
            .expect("Failed to parse payload");
        assert_eq!(payload.profile_picture.as_deref(), Some("data:image/png;base64,AAA"));
    }

    #[test]
    fn test_role_accepts_user_alias() {
        let role: Role = serde_json::from_str(r#""user""#).expect("parse role");
        assert_eq!(role, Role::Customer);
    }

    #[test]
    fn test_profile_update_omits_unset_fields() {
        let update = ProfileUpdate { name: Some("New Name".into()), ..Default::default() };
        let json = serde_json::to_value(&update).expect("serialize update");
        assert_eq!(json, serde_json::json!({"name": "New Name"}));
        assert!(ProfileUpdate::default().is_empty());
    }
}
