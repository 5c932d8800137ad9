//! Request extractors

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ApiError;

/// JSON body that has passed its `validator` rules
///
/// Malformed JSON is a 400; well-formed JSON of the wrong shape and failed
/// validation rules are both 422.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_to_error)?;
        value.validate()?;
        Ok(Self(value))
    }
}

pub(crate) fn rejection_to_error(rejection: JsonRejection) -> ApiError {
    if rejection.status() == StatusCode::UNPROCESSABLE_ENTITY {
        ApiError::InvalidInput {
            message: "request body has the wrong shape".to_string(),
            details: vec![rejection.body_text()],
        }
    } else {
        ApiError::BadRequest(rejection.body_text())
    }
}
