//! Detection of placeholder ("ghost") identities.
//!
//! Seeded fixture accounts must never be treated as a signed-in user. A
//! session is a ghost when any of these hold:
//!
//! - its user id is blank or starts with a reserved prefix (`ghost`)
//! - its name is a reserved fixture name (`Test User`, case-insensitive)
//! - its email is a reserved fixture address
//! - its token is blank
//!
//! The rule is applied when a session is restored from storage, when the
//! server returns a new identity, and after every reconciliation.

use super::Session;

const RESERVED_ID_PREFIXES: &[&str] = &["ghost"];
const RESERVED_NAMES: &[&str] = &["test user"];
const RESERVED_EMAILS: &[&str] = &["test@example.com", "test@test.com"];

#[derive(Debug, Clone)]
pub struct SentinelRule {
    id_prefixes: Vec<String>,
    names: Vec<String>,
    emails: Vec<String>,
}

impl Default for SentinelRule {
    fn default() -> Self {
        Self {
            id_prefixes: RESERVED_ID_PREFIXES.iter().map(|s| s.to_string()).collect(),
            names: RESERVED_NAMES.iter().map(|s| s.to_string()).collect(),
            emails: RESERVED_EMAILS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SentinelRule {
    /// A rule that only rejects structurally broken sessions.
    pub fn empty() -> Self {
        Self {
            id_prefixes: Vec::new(),
            names: Vec::new(),
            emails: Vec::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.emails.push(email.into().trim().to_lowercase());
        self
    }

    pub fn is_sentinel(&self, session: &Session) -> bool {
        let user_id = session.user_id.trim().to_lowercase();
        if user_id.is_empty() || session.token.trim().is_empty() {
            return true;
        }
        if self.id_prefixes.iter().any(|p| user_id.starts_with(p.as_str())) {
            return true;
        }

        let name = session.name.trim().to_lowercase();
        if self.names.iter().any(|n| *n == name) {
            return true;
        }

        let email = session.email.trim().to_lowercase();
        !email.is_empty() && self.emails.iter().any(|e| *e == email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn session(user_id: &str, name: &str, email: &str, token: &str) -> Session {
        Session {
            user_id: user_id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            profile_picture: None,
            address: None,
            city: None,
            country: None,
            role: Role::Customer,
            balance: 0.0,
            token: token.to_string(),
        }
    }

    #[test]
    fn test_ghost_fixture_detected() {
        let rule = SentinelRule::default();
        assert!(rule.is_sentinel(&session("ghost1", "Test User", "", "x")));
        assert!(rule.is_sentinel(&session("u1", "  test user ", "a@b.c", "x")));
        assert!(rule.is_sentinel(&session("GHOST-7", "Jane", "a@b.c", "x")));
        assert!(rule.is_sentinel(&session("u1", "Jane", "Test@Example.com", "x")));
    }

    #[test]
    fn test_broken_sessions_detected() {
        let rule = SentinelRule::empty();
        assert!(rule.is_sentinel(&session("", "Jane", "a@b.c", "x")));
        assert!(rule.is_sentinel(&session("u1", "Jane", "a@b.c", "  ")));
    }

    #[test]
    fn test_real_user_accepted() {
        let rule = SentinelRule::default();
        assert!(!rule.is_sentinel(&session("u1", "Jane Doe", "jane@shop.test", "t1")));
        assert!(!rule.is_sentinel(&session("64f0c2", "Test Userson", "", "t1")));
    }

    #[test]
    fn test_custom_email() {
        let rule = SentinelRule::empty().with_email(" Seed@Shop.Test ");
        assert!(rule.is_sentinel(&session("u1", "Seed", "seed@shop.test", "t1")));
    }
}
