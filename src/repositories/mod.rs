//! Persistence ports.
//!
//! Each trait has a Postgres adapter used by the server and an in-memory adapter used by
//! tests and local runs. Repositories take and return plain value records; nothing is saved
//! implicitly. Callers supply the current time so that expiry and ordering checks happen
//! against one clock reading per operation.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{NewPerson, Ownership, Person, Session, Task, TaskPatch};

pub use memory::{InMemoryPersonRepository, InMemorySessionRepository, InMemoryTaskRepository};
pub use postgres::{PgPersonRepository, PgSessionRepository, PgTaskRepository};

/// Person persistence contract.
#[async_trait]
pub trait PersonRepository: Send + Sync {
    /// Stores a new person.
    ///
    /// Fails with `AppError::Conflict` when the email is already taken, compared
    /// case-insensitively.
    async fn insert(&self, person: NewPerson, now: DateTime<Utc>) -> AppResult<Person>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Person>>;

    /// Looks a person up by email, ignoring case.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Person>>;

    /// Replaces the display name. Returns `None` when the person does not exist.
    async fn update_name(
        &self,
        id: Uuid,
        name: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Person>>;

    async fn record_login(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<()>;

    /// Stores a reset token digest, superseding any earlier one.
    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Atomically checks and clears a reset token, installing the new password hash.
    ///
    /// Succeeds only when `id` holds exactly this digest and it has not expired at `now`.
    /// Of two concurrent calls with the same digest at most one returns `Some`.
    async fn consume_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Person>>;
}

/// Task persistence contract.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// All tasks of one owner, most recently changed first, ties by id descending.
    async fn list_for_owner(&self, owner_id: Uuid) -> AppResult<Vec<Task>>;

    async fn insert(&self, task: &Task) -> AppResult<Task>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Task>>;

    /// Applies a patch if, and only if, `owner_id` owns the task. The ownership check
    /// and the write happen as one step.
    async fn update_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
        patch: &TaskPatch,
        now: DateTime<Utc>,
    ) -> AppResult<Ownership<Task>>;

    /// Deletes the task if, and only if, `owner_id` owns it.
    async fn delete_owned(&self, id: Uuid, owner_id: Uuid) -> AppResult<Ownership<()>>;
}

/// Session persistence contract backing bearer-token revocation.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert(&self, session: &Session) -> AppResult<()>;

    async fn find(&self, id: Uuid) -> AppResult<Option<Session>>;

    /// Marks a session revoked. Revoking an unknown or already revoked session is a no-op.
    async fn revoke(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<()>;

    /// Revokes every live session of a person.
    async fn revoke_all_for_person(&self, person_id: Uuid, now: DateTime<Utc>) -> AppResult<()>;

    /// Deletes sessions that expired by `now` or were revoked. Returns how many went.
    async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
}
