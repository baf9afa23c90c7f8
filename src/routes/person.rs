use crate::{
    auth::{CurrentPerson, UpdatePersonRequest},
    error::AppError,
    state::AppState,
};
use actix_web::{get, put, web, HttpResponse, Responder};
use validator::Validate;

/// Returns the authenticated person's profile.
///
/// ## Responses:
/// - `200 OK`: The person as JSON. Secrets are never serialized.
/// - `401 Unauthorized`: If the request lacks a valid token.
#[get("/me")]
pub async fn get_me(current: CurrentPerson) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(current.person))
}

/// Updates the authenticated person's display name.
///
/// ## Request Body:
/// - `name`: New display name. Trimmed; must not be blank.
///
/// ## Responses:
/// - `200 OK`: The updated person.
/// - `401 Unauthorized`: If the request lacks a valid token.
/// - `422 Unprocessable Entity`: If the name is blank or too long.
#[put("/me")]
pub async fn update_me(
    state: web::Data<AppState>,
    current: CurrentPerson,
    person_data: web::Json<UpdatePersonRequest>,
) -> Result<impl Responder, AppError> {
    person_data.validate()?;

    let person = state
        .credentials
        .update_profile(&current.person, person_data.name.trim())
        .await?;

    Ok(HttpResponse::Ok().json(person))
}
