use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use merx_core::CoreError;
use serde_json::{json, Value};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Core(err) => match err {
                CoreError::InvalidOrder(_) | CoreError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
                CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                CoreError::InsufficientStock { .. }
                | CoreError::InvalidTransition { .. }
                | CoreError::DeletionRestricted { .. } => StatusCode::CONFLICT,
                CoreError::StockUnderflow { .. } | CoreError::Storage(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::Core(err) => err.kind(),
        }
    }

    fn details(&self) -> Value {
        let AppError::Core(err) = self else {
            return json!({});
        };

        match err {
            CoreError::InsufficientStock {
                product_id,
                product_name,
                requested,
                available,
            } => json!({
                "product_id": product_id,
                "product_name": product_name,
                "requested": requested,
                "available": available,
            }),
            CoreError::StockUnderflow { product_id, .. } => json!({ "product_id": product_id }),
            CoreError::InvalidTransition { from, to } => json!({ "from": from, "to": to }),
            CoreError::NotFound { entity, id } => json!({ "entity": entity, "id": id }),
            CoreError::DeletionRestricted { order_id, .. } => json!({ "order_id": order_id }),
            CoreError::InvalidAmount(amount) => json!({ "amount": amount }),
            CoreError::InvalidOrder(_) | CoreError::Storage(_) => json!({}),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal Server Error: {}", self);
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": message,
            "code": self.code(),
            "details": self.details(),
        }));

        (status, body).into_response()
    }
}
