use std::sync::Arc;

use actix_web::{http::header, HttpRequest};
use chrono::Utc;
use log::info;
use uuid::Uuid;

use super::token::TokenIssuer;
use crate::error::{AppError, AppResult, MISSING_TOKEN};
use crate::models::{Ownership, Person, Task, TaskPatch};
use crate::repositories::TaskRepository;

/// What a caller may learn about a task that is not plainly theirs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnedResource<T> {
    Found(T),
    NotFoundOrForbidden,
}

impl<T> OwnedResource<T> {
    /// Folds an internal ownership outcome into the caller-facing one, logging the
    /// distinction that is about to be hidden.
    pub fn conceal(outcome: Ownership<T>, person: &Person, task_id: Uuid) -> Self {
        match outcome {
            Ownership::Owned(value) => OwnedResource::Found(value),
            Ownership::Missing => {
                info!("Task {} requested by {}: missing", task_id, person.id);
                OwnedResource::NotFoundOrForbidden
            }
            Ownership::Foreign => {
                info!("Task {} requested by {}: foreign", task_id, person.id);
                OwnedResource::NotFoundOrForbidden
            }
        }
    }

    pub fn into_result(self) -> AppResult<T> {
        match self {
            OwnedResource::Found(value) => Ok(value),
            OwnedResource::NotFoundOrForbidden => Err(AppError::task_not_found()),
        }
    }
}

/// Resolves the acting person for a request and enforces task ownership.
///
/// Every path that touches a single task goes through here, so "absent" and "owned by
/// someone else" are merged in exactly one place.
#[derive(Clone)]
pub struct AuthorizationGuard {
    tokens: TokenIssuer,
    tasks: Arc<dyn TaskRepository>,
}

impl AuthorizationGuard {
    pub fn new(tokens: TokenIssuer, tasks: Arc<dyn TaskRepository>) -> Self {
        Self { tokens, tasks }
    }

    /// Pulls the bearer token out of the `Authorization` header, if present.
    pub fn bearer_token(req: &HttpRequest) -> Option<String> {
        req.headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
    }

    pub async fn authenticate(&self, token: Option<&str>) -> AppResult<Person> {
        match token {
            Some(token) if !token.is_empty() => self.tokens.validate(token).await,
            _ => Err(AppError::Unauthorized(MISSING_TOKEN.into())),
        }
    }

    /// Loads a task `person` owns.
    pub async fn authorize_owns(&self, person: &Person, task_id: Uuid) -> AppResult<Task> {
        let row = self.tasks.find_by_id(task_id).await?;
        let outcome = Ownership::classify(row, |task: &Task| task.owner_id, person.id);
        OwnedResource::conceal(outcome, person, task_id).into_result()
    }

    /// Applies a patch to a task `person` owns. The check and the write are one step.
    pub async fn update_task(
        &self,
        person: &Person,
        task_id: Uuid,
        patch: &TaskPatch,
    ) -> AppResult<Task> {
        let outcome = self
            .tasks
            .update_owned(task_id, person.id, patch, Utc::now())
            .await?;
        OwnedResource::conceal(outcome, person, task_id).into_result()
    }

    /// Deletes a task `person` owns.
    pub async fn delete_task(&self, person: &Person, task_id: Uuid) -> AppResult<()> {
        let outcome = self.tasks.delete_owned(task_id, person.id).await?;
        OwnedResource::conceal(outcome, person, task_id).into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPerson;
    use crate::repositories::{
        InMemoryPersonRepository, InMemorySessionRepository, InMemoryTaskRepository,
        PersonRepository,
    };
    use actix_web::test as actix_test;

    struct Fixture {
        guard: AuthorizationGuard,
        tokens: TokenIssuer,
        tasks: Arc<InMemoryTaskRepository>,
        alice: Person,
        bob: Person,
    }

    async fn fixture() -> Fixture {
        let persons = Arc::new(InMemoryPersonRepository::new());
        let tasks = Arc::new(InMemoryTaskRepository::new());
        let tokens = TokenIssuer::new(
            Arc::new(InMemorySessionRepository::new()),
            persons.clone(),
            "guard_secret",
            3600,
        );
        let mut people = Vec::new();
        for email in ["alice@x.com", "bob@x.com"] {
            let person = persons
                .insert(
                    NewPerson {
                        email: email.to_string(),
                        name: email.to_string(),
                        password_hash: "hash".to_string(),
                    },
                    Utc::now(),
                )
                .await
                .unwrap();
            people.push(person);
        }
        let bob = people.pop().unwrap();
        let alice = people.pop().unwrap();
        Fixture {
            guard: AuthorizationGuard::new(tokens.clone(), tasks.clone()),
            tokens,
            tasks,
            alice,
            bob,
        }
    }

    #[test]
    fn test_bearer_token_extraction() {
        let req = actix_test::TestRequest::default()
            .insert_header(("Authorization", "Bearer abc.def"))
            .to_http_request();
        assert_eq!(AuthorizationGuard::bearer_token(&req), Some("abc.def".into()));

        let req = actix_test::TestRequest::default()
            .insert_header(("Authorization", "Basic abc"))
            .to_http_request();
        assert_eq!(AuthorizationGuard::bearer_token(&req), None);

        let req = actix_test::TestRequest::default().to_http_request();
        assert_eq!(AuthorizationGuard::bearer_token(&req), None);
    }

    #[actix_rt::test]
    async fn test_authenticate() {
        let f = fixture().await;
        let issued = f.tokens.issue(&f.alice).await.unwrap();

        let person = f.guard.authenticate(Some(&issued.token)).await.unwrap();
        assert_eq!(person.id, f.alice.id);

        match f.guard.authenticate(None).await {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, MISSING_TOKEN),
            other => panic!("expected missing token, got {:?}", other.map(|p| p.id)),
        }
        assert!(f.guard.authenticate(Some("bogus")).await.is_err());
    }

    #[actix_rt::test]
    async fn test_foreign_and_missing_tasks_look_identical() {
        let f = fixture().await;
        let task = f
            .tasks
            .insert(&Task::new(f.alice.id, "secret".into(), Utc::now()))
            .await
            .unwrap();

        let foreign = f.guard.authorize_owns(&f.bob, task.id).await.unwrap_err();
        let missing = f
            .guard
            .authorize_owns(&f.bob, Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(foreign.to_string(), missing.to_string());

        let owned = f.guard.authorize_owns(&f.alice, task.id).await.unwrap();
        assert_eq!(owned, task);
    }

    #[actix_rt::test]
    async fn test_foreign_mutations_are_rejected() {
        let f = fixture().await;
        let task = f
            .tasks
            .insert(&Task::new(f.alice.id, "secret".into(), Utc::now()))
            .await
            .unwrap();
        let patch = TaskPatch {
            title: Some("pwned".into()),
            completed: None,
        };

        let update = f.guard.update_task(&f.bob, task.id, &patch).await;
        assert!(matches!(update, Err(AppError::NotFound(_))));
        let delete = f.guard.delete_task(&f.bob, task.id).await;
        assert!(matches!(delete, Err(AppError::NotFound(_))));

        let stored = f.guard.authorize_owns(&f.alice, task.id).await.unwrap();
        assert_eq!(stored.title, "secret");
    }

    #[test]
    fn test_conceal_keeps_owned_values() {
        let person = Person::new(
            NewPerson {
                email: "a@x.com".into(),
                name: "A".into(),
                password_hash: "hash".into(),
            },
            Utc::now(),
        );
        let id = Uuid::new_v4();
        assert_eq!(
            OwnedResource::conceal(Ownership::Owned(7), &person, id),
            OwnedResource::Found(7)
        );
        assert_eq!(
            OwnedResource::conceal(Ownership::<i32>::Foreign, &person, id),
            OwnedResource::conceal(Ownership::<i32>::Missing, &person, id)
        );
    }
}
