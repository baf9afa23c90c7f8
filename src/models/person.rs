use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// An account holder as stored in the `persons` table.
///
/// Secrets never serialize: the password hash and the reset token digest stay on the server.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Person {
    pub id: Uuid,
    /// Lower-cased email address. Unique across all persons.
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email_verified: bool,
    /// SHA-256 hex digest of the active reset token, if one is outstanding.
    #[serde(skip_serializing)]
    pub reset_token_hash: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values needed to insert a person. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewPerson {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

impl Person {
    pub fn new(input: NewPerson, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(&input.email),
            name: input.name,
            password_hash: input.password_hash,
            email_verified: false,
            reset_token_hash: None,
            reset_token_expires_at: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a reset token is outstanding and still inside its lifetime.
    pub fn has_active_reset_token(&self, now: DateTime<Utc>) -> bool {
        matches!(
            (&self.reset_token_hash, self.reset_token_expires_at),
            (Some(_), Some(expires_at)) if expires_at > now
        )
    }
}

/// Canonical form used for storage and lookups, making email comparison case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_person() -> Person {
        Person::new(
            NewPerson {
                email: "  Ada@Example.COM ".to_string(),
                name: "Ada".to_string(),
                password_hash: "$2b$04$hash".to_string(),
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_person_creation_normalizes_email() {
        let person = new_person();
        assert_eq!(person.email, "ada@example.com");
        assert!(!person.email_verified);
        assert_eq!(person.created_at, person.updated_at);
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let mut person = new_person();
        person.reset_token_hash = Some("digest".to_string());
        let json = serde_json::to_value(&person).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("reset_token_hash").is_none());
        assert!(json.get("reset_token_expires_at").is_none());
        assert_eq!(json["name"], "Ada");
    }

    #[test]
    fn test_active_reset_token() {
        let now = Utc::now();
        let mut person = new_person();
        assert!(!person.has_active_reset_token(now));

        person.reset_token_hash = Some("digest".to_string());
        person.reset_token_expires_at = Some(now + Duration::minutes(5));
        assert!(person.has_active_reset_token(now));
        assert!(!person.has_active_reset_token(now + Duration::minutes(6)));
    }
}
