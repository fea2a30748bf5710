use axum::{http::StatusCode, Json};
use serde::Serialize;

use crate::ApiResponse;

pub type Created<T> = (StatusCode, Json<ApiResponse<T>>);

/// Standard created response
pub fn created<T: Serialize>(data: T) -> Created<T> {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}
