pub mod consent;
pub mod health;
pub mod tax;
pub mod verify;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use fin_verify_core::VerifyError;

use crate::error::AppError;

/// Unwrap a JSON body, reporting malformed input in the standard error shape.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| VerifyError::validation(rejection.body_text()).into())
}
