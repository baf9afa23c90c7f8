use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Person, Session};
use crate::repositories::{PersonRepository, SessionRepository};

/// Represents the claims encoded within a session token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// The person the token was issued to.
    pub sub: Uuid,
    /// Session id. Matches a row in the session store.
    pub jti: Uuid,
    /// Issue timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

/// A freshly issued session token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues, validates and revokes bearer tokens.
///
/// Tokens are signed JWTs, but a signature alone is not enough: every token names a
/// session record, and validation fails once that record is revoked or gone.
#[derive(Clone)]
pub struct TokenIssuer {
    sessions: Arc<dyn SessionRepository>,
    persons: Arc<dyn PersonRepository>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    max_age: Duration,
}

impl TokenIssuer {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        persons: Arc<dyn PersonRepository>,
        secret: &str,
        max_age_secs: i64,
    ) -> Self {
        Self {
            sessions,
            persons,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            max_age: Duration::seconds(max_age_secs),
        }
    }

    /// Issues a new token for `person` and records its session.
    pub async fn issue(&self, person: &Person) -> AppResult<IssuedToken> {
        let issued_at = Utc::now();
        let expires_at = issued_at + self.max_age;
        let session = Session {
            id: Uuid::new_v4(),
            person_id: person.id,
            issued_at,
            expires_at,
            revoked_at: None,
        };

        let claims = Claims {
            sub: person.id,
            jti: session.id,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))?;

        self.sessions.insert(&session).await?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Resolves a token to its person.
    ///
    /// Unknown, tampered, expired and revoked tokens all fail with the same
    /// `Unauthorized` error.
    pub async fn validate(&self, token: &str) -> AppResult<Person> {
        let claims = self.decode(token, true)?;
        let now = Utc::now();

        let session = match self.sessions.find(claims.jti).await? {
            Some(session) => session,
            None => {
                debug!("Rejected bearer token: unknown session {}", claims.jti);
                return Err(AppError::invalid_token());
            }
        };
        if !session.is_active(now) || session.person_id != claims.sub {
            debug!("Rejected bearer token: session {} inactive", session.id);
            return Err(AppError::invalid_token());
        }

        self.persons
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(AppError::invalid_token)
    }

    /// Revokes the session behind a token.
    ///
    /// Revoking twice, revoking an expired token or passing garbage is not an error.
    pub async fn revoke(&self, token: &str) -> AppResult<()> {
        match self.decode(token, false) {
            Ok(claims) => self.sessions.revoke(claims.jti, Utc::now()).await,
            Err(_) => Ok(()),
        }
    }

    /// Revokes every session of a person, e.g. after a password reset.
    pub async fn revoke_all(&self, person_id: Uuid) -> AppResult<()> {
        self.sessions
            .revoke_all_for_person(person_id, Utc::now())
            .await
    }

    /// Drops expired and revoked sessions from the store.
    pub async fn purge_expired(&self) -> AppResult<u64> {
        let purged = self.sessions.purge_expired(Utc::now()).await?;
        if purged > 0 {
            debug!("Purged {} stale sessions", purged);
        }
        Ok(purged)
    }

    fn decode(&self, token: &str, check_expiry: bool) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = check_expiry;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)?.claims;
        Ok(claims)
    }
}
