use crate::{
    auth::{
        reset::{decode_uid, encode_uid},
        AuthResponse, CurrentPerson, ForgotPasswordRequest, LoginRequest, ResetPasswordRequest,
        SignupRequest, SignupResponse,
    },
    error::AppError,
    jobs::{PASSWORD_RESET_EMAIL, WELCOME_EMAIL},
    state::AppState,
};
use actix_web::{post, web, HttpResponse, Responder};
use log::{debug, error, info};
use serde_json::json;
use validator::Validate;

/// Message returned by `forgot_password` whether or not the email is known.
pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists for that email, a password reset link has been sent.";

/// Register a new person
///
/// Creates the account and enqueues a welcome email job. The account is committed
/// before the job is dispatched; a queue failure does not undo it.
///
/// ## Request Body:
/// - `email`: Unique email address, compared case-insensitively.
/// - `password`: Plaintext password, 1 to 72 characters.
/// - `name`: Display name, trimmed, not blank.
///
/// ## Responses:
/// - `201 Created`: The new person plus `welcome_email_queued`.
/// - `409 Conflict`: If the email is already registered in any letter case.
/// - `422 Unprocessable Entity`: If validation fails.
#[post("/signup")]
pub async fn signup(
    state: web::Data<AppState>,
    signup_data: web::Json<SignupRequest>,
) -> Result<impl Responder, AppError> {
    signup_data.validate()?;

    let person = state
        .credentials
        .create(
            &signup_data.email,
            &signup_data.password,
            signup_data.name.trim(),
        )
        .await?;

    let welcome_email_queued = match state
        .jobs
        .enqueue(
            WELCOME_EMAIL,
            json!({
                "person_id": person.id,
                "email": person.email,
                "name": person.name,
            }),
        )
        .await
    {
        Ok(()) => true,
        Err(e) => {
            error!("Failed to enqueue welcome email for {}: {}", person.id, e);
            false
        }
    };

    Ok(HttpResponse::Created().json(SignupResponse {
        person,
        welcome_email_queued,
    }))
}

/// Login
///
/// Checks the credentials and issues a bearer token.
///
/// ## Responses:
/// - `200 OK`: `AuthResponse` with the token and its expiry.
/// - `401 Unauthorized`: Unknown email or wrong password (indistinguishable).
/// - `422 Unprocessable Entity`: If validation fails.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let person = state
        .credentials
        .authenticate(&login_data.email, &login_data.password)
        .await?;
    let issued = state.tokens.issue(&person).await?;
    info!("Person {} logged in", person.id);

    Ok(HttpResponse::Ok().json(AuthResponse {
        token: issued.token,
        person_id: person.id,
        expires_at: issued.expires_at,
    }))
}

/// Logout
///
/// Revokes the presented token. The token stops working immediately.
///
/// ## Responses:
/// - `204 No Content`: The session is revoked.
/// - `401 Unauthorized`: If the token is missing, invalid, expired or already revoked.
#[post("/logout")]
pub async fn logout(
    state: web::Data<AppState>,
    current: CurrentPerson,
) -> Result<impl Responder, AppError> {
    state.tokens.revoke(&current.token).await?;
    info!("Person {} logged out", current.person.id);
    Ok(HttpResponse::NoContent().finish())
}

/// Forgot password
///
/// Issues a reset token for a known email and enqueues a reset email job carrying it.
/// The response never reveals whether the email is registered, and a queue failure is
/// only logged.
///
/// ## Responses:
/// - `202 Accepted`: Always.
#[post("/forgot_password")]
pub async fn forgot_password(
    state: web::Data<AppState>,
    forgot_data: web::Json<ForgotPasswordRequest>,
) -> Result<impl Responder, AppError> {
    let accepted = HttpResponse::Accepted().json(json!({ "message": FORGOT_PASSWORD_MESSAGE }));

    let person = match state.credentials.find_by_email(&forgot_data.email).await? {
        Some(person) => person,
        None => {
            debug!("Password reset requested for an unknown email");
            return Ok(accepted);
        }
    };

    let reset = state.credentials.set_reset_token(&person).await?;
    let dispatched = state
        .jobs
        .enqueue(
            PASSWORD_RESET_EMAIL,
            json!({
                "person_id": person.id,
                "email": person.email,
                "name": person.name,
                "token": reset.token,
                "uid": encode_uid(person.id),
                "expires_at": reset.expires_at,
            }),
        )
        .await;
    if let Err(e) = dispatched {
        error!("Failed to enqueue password reset email for {}: {}", person.id, e);
    }

    Ok(accepted)
}

/// Reset password
///
/// Spends a reset token and sets a new password. Every session of the person is
/// revoked afterwards. The password change stands even if revoking the sessions fails.
///
/// ## Path Parameters:
/// - `token`: The token from the reset email.
/// - `uidb64`: The person id the token was issued to, URL-safe base64 without padding.
///
/// ## Responses:
/// - `200 OK`: The password was changed.
/// - `400 Bad Request`: The token is unknown, expired, already used or not bound to `uidb64`.
/// - `422 Unprocessable Entity`: If the new password fails validation.
#[post("/reset_password/{token}/{uidb64}")]
pub async fn reset_password(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    reset_data: web::Json<ResetPasswordRequest>,
) -> Result<impl Responder, AppError> {
    reset_data.validate()?;
    let (token, uidb64) = path.into_inner();
    let person_id = decode_uid(&uidb64).ok_or(AppError::InvalidResetToken)?;

    let person = state
        .credentials
        .consume_reset_token(person_id, &token, &reset_data.password)
        .await?;
    info!("Password reset for person {}", person.id);
    if let Err(e) = state.tokens.revoke_all(person.id).await {
        error!("Failed to revoke sessions of {} after reset: {}", person.id, e);
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Password has been reset." })))
}
