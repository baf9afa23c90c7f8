use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::{AuthorizationGuard, CredentialStore, TokenIssuer};
use crate::config::Config;
use crate::jobs::JobDispatcher;
use crate::repositories::{
    InMemoryPersonRepository, InMemorySessionRepository, InMemoryTaskRepository,
    PgPersonRepository, PgSessionRepository, PgTaskRepository, PersonRepository,
    SessionRepository, TaskRepository,
};
use crate::tasks::TaskService;

/// Everything a handler needs, shared across workers through `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub credentials: CredentialStore,
    pub tokens: TokenIssuer,
    pub tasks: TaskService,
    pub guard: AuthorizationGuard,
    pub jobs: Arc<dyn JobDispatcher>,
}

impl AppState {
    pub fn new(
        persons: Arc<dyn PersonRepository>,
        sessions: Arc<dyn SessionRepository>,
        tasks: Arc<dyn TaskRepository>,
        jobs: Arc<dyn JobDispatcher>,
        config: &Config,
    ) -> Self {
        let tokens = TokenIssuer::new(
            sessions,
            persons.clone(),
            &config.jwt_secret,
            config.token_max_age_secs,
        );
        Self {
            credentials: CredentialStore::new(
                persons,
                config.bcrypt_cost,
                config.reset_token_ttl_secs,
            ),
            guard: AuthorizationGuard::new(tokens.clone(), tasks.clone()),
            tokens,
            tasks: TaskService::new(tasks),
            jobs,
        }
    }

    /// State backed by Postgres.
    pub fn postgres(pool: PgPool, jobs: Arc<dyn JobDispatcher>, config: &Config) -> Self {
        Self::new(
            Arc::new(PgPersonRepository::new(pool.clone())),
            Arc::new(PgSessionRepository::new(pool.clone())),
            Arc::new(PgTaskRepository::new(pool)),
            jobs,
            config,
        )
    }

    /// State backed by in-memory stores. Nothing survives a restart.
    pub fn in_memory(jobs: Arc<dyn JobDispatcher>, config: &Config) -> Self {
        Self::new(
            Arc::new(InMemoryPersonRepository::new()),
            Arc::new(InMemorySessionRepository::new()),
            Arc::new(InMemoryTaskRepository::new()),
            jobs,
            config,
        )
    }
}
