pub mod auth;
pub mod health;
pub mod person;
pub mod tasks;

use actix_web::web;

use crate::error::AppError;

/// Mounts every route. Bodies that fail to parse are a 400 and path segments that fail to
/// parse are a 404, both with the same JSON error shape as every other failure.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::NotFound(err.to_string()).into()),
    )
    .service(health::health)
    .service(
        web::scope("/auth")
            .service(auth::signup)
            .service(auth::login)
            .service(auth::logout)
            .service(auth::forgot_password)
            .service(auth::reset_password),
    )
    .service(
        web::scope("/person")
            .service(person::get_me)
            .service(person::update_me),
    )
    .service(
        web::scope("/tasks")
            .service(tasks::get_tasks)
            .service(tasks::create_task)
            .service(tasks::get_task)
            .service(tasks::update_task)
            .service(tasks::delete_task),
    );
}
