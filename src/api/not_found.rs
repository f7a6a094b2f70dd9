use crate::error::MessageResponse;
use axum::{http::StatusCode, Json};

pub const NOT_FOUND_MESSAGE: &str = "Rota não encontrada";

pub async fn not_found() -> (StatusCode, Json<MessageResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(MessageResponse::new(NOT_FOUND_MESSAGE)),
    )
}
