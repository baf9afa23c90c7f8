use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::auth::trimmed_length;
use crate::error::{AppError, AppResult};
use crate::models::{Task, TaskPatch};
use crate::repositories::TaskRepository;

/// Longest task title, counted after trimming.
pub const MAX_TITLE_CHARS: usize = 200;

fn task_title(value: &str) -> Result<(), ValidationError> {
    trimmed_length(value, MAX_TITLE_CHARS)
}

/// Payload for `POST /tasks`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(custom = "task_title")]
    pub title: String,
}

/// Payload for `PUT /tasks/{id}`. At least one field must be present.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(custom = "task_title")]
    pub title: Option<String>,
    pub completed: Option<bool>,
}

impl UpdateTaskRequest {
    /// Validates the request and turns it into a patch with a trimmed title.
    pub fn into_patch(self) -> AppResult<TaskPatch> {
        self.validate()?;
        if self.title.is_none() && self.completed.is_none() {
            return Err(AppError::ValidationError(
                "At least one of 'title' or 'completed' must be provided".into(),
            ));
        }
        Ok(TaskPatch {
            title: self.title.map(|title| title.trim().to_string()),
            completed: self.completed,
        })
    }
}

/// Owner-scoped task reads and creation. Mutations of existing tasks go through the
/// authorization guard.
#[derive(Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskRepository>,
}

impl TaskService {
    pub fn new(tasks: Arc<dyn TaskRepository>) -> Self {
        Self { tasks }
    }

    /// Most recently changed first. An owner without tasks gets an empty list.
    pub async fn list_for_owner(&self, owner_id: Uuid) -> AppResult<Vec<Task>> {
        self.tasks.list_for_owner(owner_id).await
    }

    pub async fn create(&self, owner_id: Uuid, request: CreateTaskRequest) -> AppResult<Task> {
        request.validate()?;
        let task = Task::new(owner_id, request.title.trim().to_string(), Utc::now());
        self.tasks.insert(&task).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryTaskRepository;

    #[test]
    fn test_create_task_request_validation() {
        let cases = vec![
            ("buy milk".to_string(), true, "plain title"),
            ("".to_string(), false, "empty title"),
            ("   ".to_string(), false, "whitespace-only title"),
            ("a".repeat(200), true, "title at the limit"),
            ("a".repeat(201), false, "title over the limit"),
            (format!("  {}  ", "a".repeat(200)), true, "padded title at the limit"),
            (format!(" {} ", "é".repeat(200)), true, "limit counts characters"),
        ];

        for (title, valid, description) in cases {
            let request = CreateTaskRequest { title };
            assert_eq!(request.validate().is_ok(), valid, "{}", description);
        }
    }

    #[test]
    fn test_update_request_into_patch() {
        let patch = UpdateTaskRequest {
            title: Some("  tidy  ".to_string()),
            completed: None,
        }
        .into_patch()
        .unwrap();
        assert_eq!(patch.title.as_deref(), Some("tidy"));
        assert_eq!(patch.completed, None);

        let empty = UpdateTaskRequest::default().into_patch();
        assert!(matches!(empty, Err(AppError::ValidationError(_))));

        let blank = UpdateTaskRequest {
            title: Some(" ".to_string()),
            completed: Some(true),
        }
        .into_patch();
        assert!(matches!(blank, Err(AppError::ValidationError(_))));
    }

    #[actix_rt::test]
    async fn test_create_trims_and_lists() {
        let service = TaskService::new(Arc::new(InMemoryTaskRepository::new()));
        let owner = Uuid::new_v4();

        let task = service
            .create(
                owner,
                CreateTaskRequest {
                    title: "  buy milk ".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(task.title, "buy milk");
        assert!(!task.completed);
        assert_eq!(task.created_at, task.changed_at);

        let listed = service.list_for_owner(owner).await.unwrap();
        assert_eq!(listed, vec![task]);
        assert!(service
            .list_for_owner(Uuid::new_v4())
            .await
            .unwrap()
            .is_empty());
    }
}
