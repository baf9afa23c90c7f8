pub mod credentials;
pub mod extractors;
pub mod guard;
pub mod password;
pub mod reset;
pub mod token;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::Person;

// Re-export necessary items
pub use credentials::{CredentialStore, ResetToken};
pub use extractors::CurrentPerson;
pub use guard::{AuthorizationGuard, OwnedResource};
pub use password::{hash_password, verify_password};
pub use token::{Claims, IssuedToken, TokenIssuer};

/// Longest display name, counted after trimming.
pub const MAX_NAME_CHARS: usize = 100;

/// Rejects values that are empty once surrounding whitespace is removed.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("must not be blank".into());
        return Err(error);
    }
    Ok(())
}

/// Rejects blank values and values longer than `max` characters once trimmed, which
/// is the form they are stored in.
pub fn trimmed_length(value: &str, max: usize) -> Result<(), ValidationError> {
    not_blank(value)?;
    if value.trim().chars().count() > max {
        let mut error = ValidationError::new("length");
        error.message = Some(format!("must be at most {} characters", max).into());
        return Err(error);
    }
    Ok(())
}

fn display_name(value: &str) -> Result<(), ValidationError> {
    trimmed_length(value, MAX_NAME_CHARS)
}

/// Represents the payload for a signup request.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    /// Email address for the new account. Compared case-insensitively.
    #[validate(email, length(max = 255))]
    pub email: String,
    /// Password for the new account. bcrypt only reads the first 72 bytes.
    #[validate(length(min = 1, max = 72))]
    pub password: String,
    /// Display name. Trimmed before storage.
    #[validate(custom = "display_name")]
    pub name: String,
}

/// Represents the payload for a login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Payload for `POST /auth/forgot_password`.
///
/// Not validated: a malformed address is treated like an unknown one.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Payload for `POST /auth/reset_password/{token}/{uidb64}`.
#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, max = 72))]
    pub password: String,
}

/// Payload for `PUT /person/me`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePersonRequest {
    #[validate(custom = "display_name")]
    pub name: String,
}

/// Response structure after a successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// The bearer token for subsequent requests.
    pub token: String,
    /// The unique identifier of the authenticated person.
    pub person_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Response to a signup: the new person, plus whether the welcome email job made it
/// onto the queue.
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    #[serde(flatten)]
    pub person: Person,
    pub welcome_email_queued: bool,
}
