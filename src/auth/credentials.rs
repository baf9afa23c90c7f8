use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use tokio::sync::OnceCell;
use uuid::Uuid;

use super::password::{hash_password, verify_password};
use super::reset::{generate_reset_token, hash_reset_token, is_well_formed};
use crate::error::{AppError, AppResult, INVALID_CREDENTIALS};
use crate::models::{NewPerson, Person};
use crate::repositories::PersonRepository;

/// A reset token handed out to a person. The plaintext lives only here and in the
/// outgoing email job.
#[derive(Debug, Clone)]
pub struct ResetToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Person accounts: signup, password checks, profile changes and the reset flow.
#[derive(Clone)]
pub struct CredentialStore {
    persons: Arc<dyn PersonRepository>,
    bcrypt_cost: u32,
    reset_ttl: Duration,
    /// Hash checked against when the email is unknown, so a miss costs as much as a
    /// wrong password.
    decoy_hash: Arc<OnceCell<String>>,
}

impl CredentialStore {
    pub fn new(persons: Arc<dyn PersonRepository>, bcrypt_cost: u32, reset_ttl_secs: i64) -> Self {
        Self {
            persons,
            bcrypt_cost,
            reset_ttl: Duration::seconds(reset_ttl_secs),
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Registers a person. Fails with `Conflict` if the email is taken, in any case.
    pub async fn create(&self, email: &str, password: &str, name: &str) -> AppResult<Person> {
        let password_hash = hash_password(password, self.bcrypt_cost).await?;
        let person = self
            .persons
            .insert(
                NewPerson {
                    email: email.to_string(),
                    name: name.to_string(),
                    password_hash,
                },
                Utc::now(),
            )
            .await?;
        info!("Registered person {}", person.id);
        Ok(person)
    }

    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<Person>> {
        self.persons.find_by_email(email).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Person>> {
        self.persons.find_by_id(id).await
    }

    pub async fn verify_password(&self, person: &Person, password: &str) -> AppResult<bool> {
        verify_password(password, &person.password_hash).await
    }

    /// Checks an email/password pair and records the login time.
    ///
    /// An unknown email and a wrong password fail identically.
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<Person> {
        let person = match self.persons.find_by_email(email).await? {
            Some(person) => person,
            None => {
                let decoy = self
                    .decoy_hash
                    .get_or_try_init(|| hash_password("decoy-password", self.bcrypt_cost))
                    .await?;
                verify_password(password, decoy).await?;
                debug!("Login failed: unknown email");
                return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
            }
        };
        if !self.verify_password(&person, password).await? {
            debug!("Login failed: wrong password for {}", person.id);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        }

        let now = Utc::now();
        self.persons.record_login(person.id, now).await?;
        Ok(Person {
            last_login_at: Some(now),
            ..person
        })
    }

    /// Issues a reset token for `person`, superseding any outstanding one.
    pub async fn set_reset_token(&self, person: &Person) -> AppResult<ResetToken> {
        let now = Utc::now();
        let token = generate_reset_token();
        let expires_at = now + self.reset_ttl;
        self.persons
            .set_reset_token(person.id, &hash_reset_token(&token), expires_at, now)
            .await?;
        Ok(ResetToken { token, expires_at })
    }

    /// Spends a reset token and installs a new password.
    ///
    /// Unknown, expired, superseded and already used tokens all fail with
    /// `InvalidResetToken`. Two concurrent calls with one token never both succeed.
    pub async fn consume_reset_token(
        &self,
        person_id: Uuid,
        token: &str,
        new_password: &str,
    ) -> AppResult<Person> {
        if !is_well_formed(token) {
            return Err(AppError::InvalidResetToken);
        }
        let new_hash = hash_password(new_password, self.bcrypt_cost).await?;
        self.persons
            .consume_reset_token(person_id, &hash_reset_token(token), &new_hash, Utc::now())
            .await?
            .ok_or(AppError::InvalidResetToken)
    }

    /// Replaces the display name.
    pub async fn update_profile(&self, person: &Person, name: &str) -> AppResult<Person> {
        self.persons
            .update_name(person.id, name, Utc::now())
            .await?
            .ok_or_else(|| AppError::NotFound("Person not found".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryPersonRepository;

    fn store() -> CredentialStore {
        CredentialStore::new(Arc::new(InMemoryPersonRepository::new()), 4, 3600)
    }

    #[actix_rt::test]
    async fn test_create_and_authenticate() {
        let store = store();
        let person = store.create("A@X.com", "pw", "A").await.unwrap();
        assert_eq!(person.email, "a@x.com");
        assert_ne!(person.password_hash, "pw");

        let logged_in = store.authenticate("a@x.com", "pw").await.unwrap();
        assert_eq!(logged_in.id, person.id);
        assert!(logged_in.last_login_at.is_some());

        let stored = store.find_by_id(person.id).await.unwrap().unwrap();
        assert!(stored.last_login_at.is_some());
    }

    #[actix_rt::test]
    async fn test_duplicate_email_any_case() {
        let store = store();
        store.create("a@x.com", "pw", "A").await.unwrap();
        match store.create("A@X.COM", "other", "B").await {
            Err(AppError::Conflict(_)) => {}
            other => panic!("expected conflict, got {:?}", other.map(|p| p.id)),
        }
    }

    #[actix_rt::test]
    async fn test_authentication_failures_are_indistinguishable() {
        let store = store();
        store.create("a@x.com", "pw", "A").await.unwrap();

        let wrong_password = store.authenticate("a@x.com", "nope").await.unwrap_err();
        let unknown_email = store.authenticate("b@x.com", "pw").await.unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[actix_rt::test]
    async fn test_unknown_email_pays_for_a_password_check() {
        let store = store();
        assert!(!store.decoy_hash.initialized());

        let err = store.authenticate("ghost@x.com", "pw").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        let decoy = store.decoy_hash.get().expect("unknown email runs bcrypt");
        assert!(decoy.starts_with("$2b$04$"), "decoy uses the configured cost");
    }

    #[actix_rt::test]
    async fn test_reset_token_is_single_use() {
        let store = store();
        let person = store.create("a@x.com", "old", "A").await.unwrap();
        let reset = store.set_reset_token(&person).await.unwrap();

        store
            .consume_reset_token(person.id, &reset.token, "new")
            .await
            .unwrap();
        let replay = store.consume_reset_token(person.id, &reset.token, "newer").await;
        assert!(matches!(replay, Err(AppError::InvalidResetToken)));

        let updated = store.find_by_id(person.id).await.unwrap().unwrap();
        assert!(store.verify_password(&updated, "new").await.unwrap());
        assert!(!store.verify_password(&updated, "old").await.unwrap());
    }

    #[actix_rt::test]
    async fn test_new_reset_token_supersedes_old() {
        let store = store();
        let person = store.create("a@x.com", "old", "A").await.unwrap();
        let first = store.set_reset_token(&person).await.unwrap();
        let second = store.set_reset_token(&person).await.unwrap();

        let stale = store.consume_reset_token(person.id, &first.token, "new").await;
        assert!(matches!(stale, Err(AppError::InvalidResetToken)));
        assert!(store
            .consume_reset_token(person.id, &second.token, "new")
            .await
            .is_ok());
    }

    #[actix_rt::test]
    async fn test_reset_token_bound_to_person() {
        let store = store();
        let alice = store.create("a@x.com", "pw", "A").await.unwrap();
        let bob = store.create("b@x.com", "pw", "B").await.unwrap();
        let reset = store.set_reset_token(&alice).await.unwrap();

        let wrong_person = store.consume_reset_token(bob.id, &reset.token, "new").await;
        assert!(matches!(wrong_person, Err(AppError::InvalidResetToken)));
        let malformed = store.consume_reset_token(alice.id, "short", "new").await;
        assert!(matches!(malformed, Err(AppError::InvalidResetToken)));
    }

    #[actix_rt::test]
    async fn test_expired_reset_token_is_rejected() {
        let store = CredentialStore::new(Arc::new(InMemoryPersonRepository::new()), 4, 0);
        let person = store.create("a@x.com", "old", "A").await.unwrap();
        let reset = store.set_reset_token(&person).await.unwrap();

        let result = store.consume_reset_token(person.id, &reset.token, "new").await;
        assert!(matches!(result, Err(AppError::InvalidResetToken)));
    }

    #[actix_rt::test]
    async fn test_concurrent_consumption_succeeds_once() {
        let store = store();
        let person = store.create("a@x.com", "old", "A").await.unwrap();
        let reset = store.set_reset_token(&person).await.unwrap();

        let (first, second) = futures::join!(
            store.consume_reset_token(person.id, &reset.token, "one"),
            store.consume_reset_token(person.id, &reset.token, "two"),
        );
        assert_eq!(
            [first.is_ok(), second.is_ok()]
                .iter()
                .filter(|ok| **ok)
                .count(),
            1
        );
    }

    #[actix_rt::test]
    async fn test_update_profile() {
        let store = store();
        let person = store.create("a@x.com", "pw", "A").await.unwrap();
        let updated = store.update_profile(&person, "Ada").await.unwrap();
        assert_eq!(updated.name, "Ada");
        assert!(updated.updated_at >= person.updated_at);
    }
}
