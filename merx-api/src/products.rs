use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use merx_core::StockRecord;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/products/{id}/stock", get(get_stock))
}

async fn get_stock(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<StockRecord>, AppError> {
    Ok(Json(state.engine.get_stock(product_id).await?))
}
