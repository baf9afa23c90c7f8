//! Thread-safe in-memory adapters for the persistence ports.
//!
//! Every operation takes the lock once, so check-and-write sequences (reset token
//! consumption, owner-scoped updates) are atomic with respect to concurrent callers.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{PersonRepository, SessionRepository, TaskRepository};
use crate::error::{AppError, AppResult};
use crate::models::{normalize_email, NewPerson, Ownership, Person, Session, Task, TaskPatch};

fn poisoned(err: impl std::fmt::Display) -> AppError {
    AppError::InternalServerError(format!("in-memory store lock poisoned: {}", err))
}

/// In-memory person store keyed by id, with a lower-cased email index.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPersonRepository {
    state: Arc<RwLock<PersonState>>,
}

#[derive(Debug, Default)]
struct PersonState {
    persons: HashMap<Uuid, Person>,
    email_index: HashMap<String, Uuid>,
}

impl InMemoryPersonRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersonRepository for InMemoryPersonRepository {
    async fn insert(&self, person: NewPerson, now: DateTime<Utc>) -> AppResult<Person> {
        let mut state = self.state.write().map_err(poisoned)?;
        let person = Person::new(person, now);
        if state.email_index.contains_key(&person.email) {
            return Err(AppError::Conflict("Email already registered".into()));
        }
        state.email_index.insert(person.email.clone(), person.id);
        state.persons.insert(person.id, person.clone());
        Ok(person)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Person>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.persons.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Person>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .email_index
            .get(&normalize_email(email))
            .and_then(|id| state.persons.get(id))
            .cloned())
    }

    async fn update_name(
        &self,
        id: Uuid,
        name: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Person>> {
        let mut state = self.state.write().map_err(poisoned)?;
        Ok(state.persons.get_mut(&id).map(|person| {
            person.name = name.to_string();
            person.updated_at = now;
            person.clone()
        }))
    }

    async fn record_login(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if let Some(person) = state.persons.get_mut(&id) {
            person.last_login_at = Some(now);
        }
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if let Some(person) = state.persons.get_mut(&id) {
            person.reset_token_hash = Some(token_hash.to_string());
            person.reset_token_expires_at = Some(expires_at);
            person.updated_at = now;
        }
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Person>> {
        let mut state = self.state.write().map_err(poisoned)?;
        let person = match state.persons.get_mut(&id) {
            Some(person) => person,
            None => return Ok(None),
        };
        let matches = person.reset_token_hash.as_deref() == Some(token_hash)
            && person.has_active_reset_token(now);
        if !matches {
            return Ok(None);
        }
        person.password_hash = new_password_hash.to_string();
        person.reset_token_hash = None;
        person.reset_token_expires_at = None;
        person.updated_at = now;
        Ok(Some(person.clone()))
    }
}

/// In-memory task store keyed by id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    tasks: Arc<RwLock<HashMap<Uuid, Task>>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn list_for_owner(&self, owner_id: Uuid) -> AppResult<Vec<Task>> {
        let tasks = self.tasks.read().map_err(poisoned)?;
        let mut owned: Vec<Task> = tasks
            .values()
            .filter(|task| task.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(Task::recency_order);
        Ok(owned)
    }

    async fn insert(&self, task: &Task) -> AppResult<Task> {
        let mut tasks = self.tasks.write().map_err(poisoned)?;
        tasks.insert(task.id, task.clone());
        Ok(task.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Task>> {
        let tasks = self.tasks.read().map_err(poisoned)?;
        Ok(tasks.get(&id).cloned())
    }

    async fn update_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
        patch: &TaskPatch,
        now: DateTime<Utc>,
    ) -> AppResult<Ownership<Task>> {
        let mut tasks = self.tasks.write().map_err(poisoned)?;
        Ok(match tasks.get_mut(&id) {
            None => Ownership::Missing,
            Some(task) if task.owner_id != owner_id => Ownership::Foreign,
            Some(task) => {
                task.apply(patch, now);
                Ownership::Owned(task.clone())
            }
        })
    }

    async fn delete_owned(&self, id: Uuid, owner_id: Uuid) -> AppResult<Ownership<()>> {
        let mut tasks = self.tasks.write().map_err(poisoned)?;
        let outcome =
            Ownership::classify(tasks.get(&id), |task| task.owner_id, owner_id).map(|_| ());
        if outcome == Ownership::Owned(()) {
            tasks.remove(&id);
        }
        Ok(outcome)
    }
}

/// In-memory session store keyed by token id.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionRepository {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn insert(&self, session: &Session) -> AppResult<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> AppResult<Option<Session>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions.get(&id).cloned())
    }

    async fn revoke(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        if let Some(session) = sessions.get_mut(&id) {
            session.revoked_at.get_or_insert(now);
        }
        Ok(())
    }

    async fn revoke_all_for_person(&self, person_id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions
            .values_mut()
            .filter(|session| session.person_id == person_id)
            .for_each(|session| {
                session.revoked_at.get_or_insert(now);
            });
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        let before = sessions.len();
        sessions.retain(|_, session| session.is_active(now));
        Ok((before - sessions.len()) as u64)
    }
}
