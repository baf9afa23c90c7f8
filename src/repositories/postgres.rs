//! `PostgreSQL` adapters built on `sqlx`.
//!
//! Owner-scoped writes and reset token consumption are single conditional statements,
//! so the check and the mutation cannot be interleaved by another request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{PersonRepository, SessionRepository, TaskRepository};
use crate::error::{AppError, AppResult};
use crate::models::{normalize_email, NewPerson, Ownership, Person, Session, Task, TaskPatch};

const PERSON_COLUMNS: &str = "id, email, name, password_hash, email_verified, reset_token_hash, \
     reset_token_expires_at, last_login_at, created_at, updated_at";

const TASK_COLUMNS: &str = "id, owner_id, title, completed, created_at, changed_at";

#[derive(Debug, Clone)]
pub struct PgPersonRepository {
    pool: PgPool,
}

impl PgPersonRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PersonRepository for PgPersonRepository {
    async fn insert(&self, person: NewPerson, now: DateTime<Utc>) -> AppResult<Person> {
        let person = Person::new(person, now);
        let sql = format!(
            "INSERT INTO persons ({PERSON_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {PERSON_COLUMNS}"
        );
        sqlx::query_as::<_, Person>(&sql)
            .bind(person.id)
            .bind(&person.email)
            .bind(&person.name)
            .bind(&person.password_hash)
            .bind(person.email_verified)
            .bind(&person.reset_token_hash)
            .bind(person.reset_token_expires_at)
            .bind(person.last_login_at)
            .bind(person.created_at)
            .bind(person.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| match err {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    AppError::Conflict("Email already registered".into())
                }
                other => other.into(),
            })
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Person>> {
        let sql = format!("SELECT {PERSON_COLUMNS} FROM persons WHERE id = $1");
        Ok(sqlx::query_as::<_, Person>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Person>> {
        let sql = format!("SELECT {PERSON_COLUMNS} FROM persons WHERE LOWER(email) = $1");
        Ok(sqlx::query_as::<_, Person>(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_name(
        &self,
        id: Uuid,
        name: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Person>> {
        let sql = format!(
            "UPDATE persons SET name = $2, updated_at = $3 WHERE id = $1 \
             RETURNING {PERSON_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Person>(&sql)
            .bind(id)
            .bind(name)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn record_login(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE persons SET last_login_at = $2 WHERE id = $1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE persons \
             SET reset_token_hash = $2, reset_token_expires_at = $3, updated_at = $4 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Person>> {
        let sql = format!(
            "UPDATE persons \
             SET password_hash = $3, reset_token_hash = NULL, reset_token_expires_at = NULL, \
                 updated_at = $4 \
             WHERE id = $1 AND reset_token_hash = $2 AND reset_token_expires_at > $4 \
             RETURNING {PERSON_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Person>(&sql)
            .bind(id)
            .bind(token_hash)
            .bind(new_password_hash)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?)
    }
}

#[derive(Debug, Clone)]
pub struct PgTaskRepository {
    pool: PgPool,
}

impl PgTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Tells an absent task from somebody else's after an owner-scoped write matched nothing.
    async fn classify_miss<T>(&self, id: Uuid) -> AppResult<Ownership<T>> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tasks WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(if exists {
            Ownership::Foreign
        } else {
            Ownership::Missing
        })
    }
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn list_for_owner(&self, owner_id: Uuid) -> AppResult<Vec<Task>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = $1 \
             ORDER BY changed_at DESC, id DESC"
        );
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert(&self, task: &Task) -> AppResult<Task> {
        let sql = format!(
            "INSERT INTO tasks ({TASK_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {TASK_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(task.id)
            .bind(task.owner_id)
            .bind(&task.title)
            .bind(task.completed)
            .bind(task.created_at)
            .bind(task.changed_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
        patch: &TaskPatch,
        now: DateTime<Utc>,
    ) -> AppResult<Ownership<Task>> {
        let sql = format!(
            "UPDATE tasks \
             SET title = COALESCE($3, title), \
                 completed = COALESCE($4, completed), \
                 changed_at = GREATEST(changed_at, $5) \
             WHERE id = $1 AND owner_id = $2 \
             RETURNING {TASK_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(owner_id)
            .bind(&patch.title)
            .bind(patch.completed)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(task) => Ok(Ownership::Owned(task)),
            None => self.classify_miss(id).await,
        }
    }

    async fn delete_owned(&self, id: Uuid, owner_id: Uuid) -> AppResult<Ownership<()>> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return self.classify_miss(id).await;
        }
        Ok(Ownership::Owned(()))
    }
}

#[derive(Debug, Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn insert(&self, session: &Session) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO sessions (id, person_id, issued_at, expires_at, revoked_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(session.id)
        .bind(session.person_id)
        .bind(session.issued_at)
        .bind(session.expires_at)
        .bind(session.revoked_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Session>> {
        Ok(sqlx::query_as::<_, Session>(
            "SELECT id, person_id, issued_at, expires_at, revoked_at FROM sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn revoke(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE sessions SET revoked_at = $2 WHERE id = $1 AND revoked_at IS NULL")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_all_for_person(&self, person_id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "UPDATE sessions SET revoked_at = $2 WHERE person_id = $1 AND revoked_at IS NULL",
        )
        .bind(person_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result =
            sqlx::query("DELETE FROM sessions WHERE expires_at <= $1 OR revoked_at IS NOT NULL")
                .bind(now)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}
