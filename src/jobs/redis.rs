use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use redis::{AsyncCommands, Client};

use super::{Job, JobDispatcher};
use crate::error::{AppError, AppResult};

/// Pushes jobs onto a Redis list with `LPUSH`. Workers pop from the other end.
#[derive(Debug, Clone)]
pub struct RedisJobDispatcher {
    client: Client,
    queue: String,
    timeout: Duration,
}

impl RedisJobDispatcher {
    /// Creates the client. No connection is made until the first enqueue.
    pub fn new(url: &str, queue: &str, timeout: Duration) -> AppResult<Self> {
        let client = Client::open(url)?;
        info!("Job queue client initialized for list {}", queue);
        Ok(Self {
            client,
            queue: queue.to_string(),
            timeout,
        })
    }

    async fn push(&self, message: String) -> AppResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: i64 = conn.lpush(&self.queue, message).await?;
        Ok(())
    }
}

#[async_trait]
impl JobDispatcher for RedisJobDispatcher {
    async fn enqueue(&self, event_type: &str, payload: serde_json::Value) -> AppResult<()> {
        let job = Job::new(event_type, payload);
        let message = serde_json::to_string(&job)?;

        tokio::time::timeout(self.timeout, self.push(message))
            .await
            .map_err(|_| AppError::ServiceUnavailable("job queue timed out".into()))??;

        debug!("Enqueued {} job {}", job.event_type, job.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_malformed_url() {
        let result = RedisJobDispatcher::new("not a url", "jobs", Duration::from_secs(1));
        assert!(matches!(result, Err(AppError::QueueError(_))));
    }

    #[actix_rt::test]
    async fn test_unreachable_queue_fails_within_timeout() {
        // Nothing listens on port 1.
        let dispatcher = RedisJobDispatcher::new(
            "redis://127.0.0.1:1",
            "jobs",
            Duration::from_millis(500),
        )
        .unwrap();

        let result = dispatcher
            .enqueue("welcome_email", serde_json::json!({}))
            .await;
        assert!(result.is_err());
    }

    #[ignore]
    #[actix_rt::test]
    async fn test_enqueue_pushes_json_onto_list() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let queue = format!("test:jobs:{}", uuid::Uuid::new_v4());
        let dispatcher = RedisJobDispatcher::new(&url, &queue, Duration::from_secs(3)).unwrap();

        dispatcher
            .enqueue("welcome_email", serde_json::json!({ "email": "a@x.com" }))
            .await
            .unwrap();

        let client = Client::open(url).unwrap();
        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let raw: Option<String> = conn.rpop(&queue, None).await.unwrap();
        let job: Job = serde_json::from_str(&raw.unwrap()).unwrap();
        assert_eq!(job.event_type, "welcome_email");
        assert_eq!(job.payload["email"], "a@x.com");
    }
}
