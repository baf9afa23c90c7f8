#![allow(dead_code)]

use std::sync::Arc;

use actix_web::{http::header, test, web};
use serde_json::json;
use todo_backend::auth::AuthResponse;
use todo_backend::config::Config;
use todo_backend::jobs::InMemoryJobDispatcher;
use todo_backend::AppState;
use uuid::Uuid;

/// Helper struct to hold auth details
pub struct TestPerson {
    pub id: Uuid,
    pub token: String,
}

impl TestPerson {
    pub fn bearer(&self) -> (header::HeaderName, String) {
        (header::AUTHORIZATION, format!("Bearer {}", self.token))
    }
}

/// In-memory state plus a handle on the job dispatcher it uses.
pub fn test_state() -> (web::Data<AppState>, InMemoryJobDispatcher) {
    let jobs = InMemoryJobDispatcher::new();
    let state = web::Data::new(AppState::in_memory(
        Arc::new(jobs.clone()),
        &Config::for_tests(),
    ));
    (state, jobs)
}

pub async fn signup(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
    >,
    email: &str,
    password: &str,
    name: &str,
) -> Result<serde_json::Value, String> {
    let req = test::TestRequest::post()
        .uri("/auth/signup")
        .set_json(&json!({ "email": email, "password": password, "name": name }))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;

    if status != actix_web::http::StatusCode::CREATED {
        return Err(format!(
            "Failed to sign up. Status: {}. Body: {}",
            status,
            String::from_utf8_lossy(&body)
        ));
    }
    serde_json::from_slice(&body).map_err(|e| format!("Failed to parse signup response: {}", e))
}

pub async fn login(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
    >,
    email: &str,
    password: &str,
) -> Result<TestPerson, String> {
    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(&json!({ "email": email, "password": password }))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;

    if !status.is_success() {
        return Err(format!(
            "Failed to log in. Status: {}. Body: {}",
            status,
            String::from_utf8_lossy(&body)
        ));
    }
    let auth: AuthResponse =
        serde_json::from_slice(&body).map_err(|e| format!("Failed to parse login response: {}", e))?;
    Ok(TestPerson {
        id: auth.person_id,
        token: auth.token,
    })
}

pub async fn signup_and_login(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
    >,
    email: &str,
    password: &str,
) -> TestPerson {
    signup(app, email, password, "Tester")
        .await
        .expect("signup failed");
    login(app, email, password).await.expect("login failed")
}
