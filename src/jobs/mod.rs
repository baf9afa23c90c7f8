//! Fire-and-forget job dispatch.
//!
//! Handlers describe side effects (emails, for now) as `(event_type, payload)` pairs and
//! hand them to a [`JobDispatcher`]. A separate worker consumes the queue; nothing here
//! waits for or observes delivery.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;

pub use self::memory::InMemoryJobDispatcher;
pub use self::redis::RedisJobDispatcher;

/// Sent after a successful signup. Payload: `person_id`, `email`, `name`.
pub const WELCOME_EMAIL: &str = "welcome_email";
/// Sent after `forgot_password`. Payload: `person_id`, `email`, `name`, `token`, `uid`,
/// `expires_at`.
pub const PASSWORD_RESET_EMAIL: &str = "password_reset_email";

/// The message placed on the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub enqueued_at: DateTime<Utc>,
}

impl Job {
    pub fn new(event_type: &str, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.to_string(),
            payload,
            enqueued_at: Utc::now(),
        }
    }
}

/// Hands jobs to a transport.
///
/// `enqueue` returns once the transport has accepted the message. Callers must not hold
/// a database transaction open across the call, and a failure here never undoes the
/// data change that triggered it.
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    async fn enqueue(&self, event_type: &str, payload: serde_json::Value) -> AppResult<()>;
}
