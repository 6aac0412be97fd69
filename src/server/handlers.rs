//! HTTP handlers for order operations

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinError;

use crate::core::auth::Principal;
use crate::core::error::{CrmError, CrmResult, StorageError, ValidationError};
use crate::core::order::{CreateOrderRequest, OrderWithItems};
use crate::core::service::OrderService;

/// Application state shared across order handlers
#[derive(Clone)]
pub struct OrderApiState {
    pub service: OrderService,
}

/// Response for delete endpoint
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> CrmResult<Value> {
    body.map(|Json(value)| value).map_err(|rejection| {
        ValidationError::InvalidJson {
            message: rejection.body_text(),
        }
        .into()
    })
}

/// The creation task panicked or was cancelled; its transaction never committed
fn task_failure(err: JoinError) -> CrmError {
    StorageError::Transaction {
        message: format!("order creation task failed: {}", err),
    }
    .into()
}

/// GET /api/orders
pub async fn list_orders(
    State(state): State<OrderApiState>,
) -> CrmResult<Json<Vec<OrderWithItems>>> {
    Ok(Json(state.service.list_orders().await?))
}

/// GET /api/orders/{id}
pub async fn get_order(
    State(state): State<OrderApiState>,
    Path(id): Path<String>,
) -> CrmResult<Json<OrderWithItems>> {
    Ok(Json(state.service.get_order(&id).await?))
}

/// POST /api/orders
///
/// The transaction runs in its own task so that a client hanging up does not
/// cancel it halfway.
pub async fn create_order(
    State(state): State<OrderApiState>,
    Extension(principal): Extension<Principal>,
    body: Result<Json<Value>, JsonRejection>,
) -> CrmResult<impl IntoResponse> {
    let request: CreateOrderRequest = serde_json::from_value(json_body(body)?)?;

    tracing::debug!(
        user_id = %principal.id,
        order_id = request.id.as_deref().unwrap_or_default(),
        "create order requested"
    );

    let service = state.service.clone();
    let created = tokio::spawn(async move { service.create_order(request).await })
        .await
        .map_err(task_failure)??;

    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/orders/{id}
pub async fn update_order(
    State(state): State<OrderApiState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> CrmResult<Json<OrderWithItems>> {
    let body = json_body(body)?;
    let Value::Object(payload) = body else {
        return Err(ValidationError::InvalidJson {
            message: "expected a JSON object".to_string(),
        }
        .into());
    };

    Ok(Json(state.service.update_order(&id, &payload).await?))
}

/// DELETE /api/orders/{id}
pub async fn delete_order(
    State(state): State<OrderApiState>,
    Path(id): Path<String>,
) -> CrmResult<Json<DeleteResponse>> {
    state.service.delete_order(&id).await?;
    Ok(Json(DeleteResponse {
        success: true,
        message: "Order deleted".to_string(),
    }))
}
