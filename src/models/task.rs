use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    pub id: Uuid,
    /// The person who owns the task. Ownership never changes.
    pub owner_id: Uuid,
    /// Trimmed, non-empty title.
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    /// Bumped by every accepted mutation; never moves backwards.
    pub changed_at: DateTime<Utc>,
}

/// A partial update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

/// Result of an owner-scoped lookup or mutation.
///
/// `Missing` and `Foreign` stay distinct here for auditing and tests. Callers facing
/// the outside world go through the authorization guard, which folds both into one
/// not-found answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ownership<T> {
    Owned(T),
    Missing,
    Foreign,
}

impl Task {
    /// Creates a new, incomplete task. `created_at` and `changed_at` both equal `now`.
    pub fn new(owner_id: Uuid, title: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title,
            completed: false,
            created_at: now,
            changed_at: now,
        }
    }

    /// Applies a patch and bumps `changed_at` without letting it move backwards.
    pub fn apply(&mut self, patch: &TaskPatch, now: DateTime<Utc>) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        self.changed_at = self.changed_at.max(now);
    }

    /// List order: most recently changed first, ties broken by id descending.
    pub fn recency_order(a: &Task, b: &Task) -> Ordering {
        b.changed_at
            .cmp(&a.changed_at)
            .then_with(|| b.id.cmp(&a.id))
    }
}

impl<T> Ownership<T> {
    /// Classifies a row looked up by id against the acting owner.
    pub fn classify(row: Option<T>, owner_of: impl Fn(&T) -> Uuid, owner_id: Uuid) -> Self {
        match row {
            None => Ownership::Missing,
            Some(row) if owner_of(&row) == owner_id => Ownership::Owned(row),
            Some(_) => Ownership::Foreign,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Ownership<U> {
        match self {
            Ownership::Owned(value) => Ownership::Owned(f(value)),
            Ownership::Missing => Ownership::Missing,
            Ownership::Foreign => Ownership::Foreign,
        }
    }
}
