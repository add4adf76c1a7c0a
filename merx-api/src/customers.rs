use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use merx_core::Order;
use merx_order::{CustomerSummary, SettlementResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::orders::StatusQuery;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreditRequest {
    pub amount: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub customer_id: Uuid,
    pub balance: Decimal,
    pub currency: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/customers/{id}/orders", get(list_customer_orders))
        .route("/v1/customers/{id}/balance", get(get_balance))
        .route("/v1/customers/{id}/summary", get(get_summary))
        .route("/v1/customers/{id}/credits", post(apply_credit))
        .route("/v1/customers/{id}/payments", post(apply_payment))
}

async fn list_customer_orders(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = state
        .engine
        .list_customer_orders(customer_id, query.filter()?)
        .await?;
    Ok(Json(orders))
}

async fn get_balance(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<BalanceResponse>, AppError> {
    let balance = state.engine.get_debt_balance(customer_id).await?;
    Ok(Json(BalanceResponse {
        customer_id,
        balance,
        currency: state.engine.currency().to_string(),
    }))
}

async fn get_summary(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<CustomerSummary>, AppError> {
    Ok(Json(state.engine.customer_summary(customer_id).await?))
}

/// Record money the customer owes
async fn apply_credit(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    payload: Result<Json<CreditRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let Json(request) = payload?;
    let order = state
        .engine
        .apply_credit(customer_id, request.amount, request.description)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Settle pending orders oldest first
async fn apply_payment(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    payload: Result<Json<PaymentRequest>, JsonRejection>,
) -> Result<Json<SettlementResult>, AppError> {
    let Json(request) = payload?;
    let result = state.engine.apply_payment(customer_id, request.amount).await?;
    Ok(Json(result))
}
