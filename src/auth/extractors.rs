use actix_web::dev::Payload;
use actix_web::{web, Error as ActixError, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;

use super::guard::AuthorizationGuard;
use crate::error::AppError;
use crate::models::Person;
use crate::state::AppState;

/// The authenticated person behind a request, together with the token they presented.
///
/// Resolved once per request and handed to the handler explicitly. Extraction fails with
/// 401 when the `Authorization` header is missing or the token does not resolve to a
/// live session.
#[derive(Debug, Clone)]
pub struct CurrentPerson {
    pub person: Person,
    pub token: String,
}

impl FromRequest for CurrentPerson {
    type Error = ActixError; // AppError converts via ResponseError
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = AuthorizationGuard::bearer_token(req);

        Box::pin(async move {
            let state = state.ok_or_else(|| {
                AppError::InternalServerError("Application state not configured".into())
            })?;
            let person = state.guard.authenticate(token.as_deref()).await?;
            Ok(CurrentPerson {
                person,
                token: token.unwrap_or_default(),
            })
        })
    }
}
