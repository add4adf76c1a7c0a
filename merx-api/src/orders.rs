use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use merx_core::{Order, OrderFilter, OrderStatus};
use merx_order::{CreateOrderRequest, DeletionOutcome};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: OrderStatus,
}

/// `?status=` on listing endpoints
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

impl StatusQuery {
    pub fn filter(&self) -> Result<OrderFilter, AppError> {
        match self.status.as_deref() {
            None | Some("") => Ok(OrderFilter::default()),
            Some(raw) => raw
                .parse::<OrderStatus>()
                .map(OrderFilter::status)
                .map_err(|e| AppError::BadRequest(e.to_string())),
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/orders", post(create_order))
        .route("/v1/orders/{id}", get(get_order).delete(delete_order))
        .route("/v1/orders/{id}/status", post(transition_order))
        .route("/v1/shops/{shop_id}/orders", get(list_shop_orders))
}

/// POST /v1/orders
async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let Json(request) = payload?;
    let order = state.engine.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /v1/orders/{id}
async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.engine.get_order(order_id).await?))
}

/// POST /v1/orders/{id}/status
async fn transition_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    payload: Result<Json<TransitionRequest>, JsonRejection>,
) -> Result<Json<Order>, AppError> {
    let Json(request) = payload?;
    let order = state.engine.transition_order(order_id, request.status).await?;
    Ok(Json(order))
}

/// DELETE /v1/orders/{id}
async fn delete_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<DeletionOutcome>, AppError> {
    Ok(Json(state.engine.delete_order(order_id).await?))
}

/// GET /v1/shops/{shop_id}/orders
async fn list_shop_orders(
    State(state): State<AppState>,
    Path(shop_id): Path<Uuid>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = state.engine.list_shop_orders(shop_id, query.filter()?).await?;
    Ok(Json(orders))
}
