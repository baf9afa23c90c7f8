use crate::{
    auth::CurrentPerson,
    error::AppError,
    state::AppState,
    tasks::{CreateTaskRequest, UpdateTaskRequest},
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use uuid::Uuid;

/// Retrieves the authenticated person's tasks.
///
/// Tasks are ordered by `changed_at` descending, so the most recently created or
/// modified task comes first. Ties are broken by id, descending.
///
/// ## Responses:
/// - `200 OK`: Returns a JSON array of `Task` objects, possibly empty.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `500 Internal Server Error`: For database errors or other unexpected issues.
#[get("")]
pub async fn get_tasks(
    state: web::Data<AppState>,
    current: CurrentPerson,
) -> Result<impl Responder, AppError> {
    let tasks = state.tasks.list_for_owner(current.person.id).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a new task for the authenticated person.
///
/// ## Request Body:
/// - `title`: The title of the task. Trimmed; must not be blank; at most 200 characters.
///
/// ## Responses:
/// - `201 Created`: Returns the newly created, incomplete `Task`.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `422 Unprocessable Entity`: If the title is empty, blank or too long.
#[post("")]
pub async fn create_task(
    state: web::Data<AppState>,
    current: CurrentPerson,
    task_data: web::Json<CreateTaskRequest>,
) -> Result<impl Responder, AppError> {
    let task = state
        .tasks
        .create(current.person.id, task_data.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(task))
}

/// Retrieves a specific task by its ID.
///
/// ## Path Parameters:
/// - `id`: The UUID of the task to retrieve.
///
/// ## Responses:
/// - `200 OK`: Returns the `Task` if it is owned by the caller.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `404 Not Found`: If the task does not exist or belongs to someone else.
#[get("/{id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    current: CurrentPerson,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = state
        .guard
        .authorize_owns(&current.person, task_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Updates the title and/or completion flag of an owned task.
///
/// ## Path Parameters:
/// - `id`: The UUID of the task to update.
///
/// ## Request Body:
/// - `title` (optional): New title. Trimmed; must not be blank.
/// - `completed` (optional): New completion flag.
///
/// At least one field must be present.
///
/// ## Responses:
/// - `200 OK`: Returns the updated `Task`.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `404 Not Found`: If the task does not exist or belongs to someone else.
/// - `422 Unprocessable Entity`: If the body is empty or the title is blank.
#[put("/{id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    current: CurrentPerson,
    task_id: web::Path<Uuid>,
    task_data: web::Json<UpdateTaskRequest>,
) -> Result<impl Responder, AppError> {
    let patch = task_data.into_inner().into_patch()?;
    let task = state
        .guard
        .update_task(&current.person, task_id.into_inner(), &patch)
        .await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Deletes an owned task. Deletion is immediate and permanent.
///
/// ## Path Parameters:
/// - `id`: The UUID of the task to delete.
///
/// ## Responses:
/// - `204 No Content`: On successful deletion.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `404 Not Found`: If the task does not exist or belongs to someone else.
#[delete("/{id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    current: CurrentPerson,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    state
        .guard
        .delete_task(&current.person, task_id.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
