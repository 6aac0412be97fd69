//! Route table

use super::auth::{PageGuard, require_page};
use super::handlers::{
    OrderApiState, create_order, delete_order, get_order, list_orders, update_order,
};
use axum::{Json, Router, middleware, routing::get};
use serde_json::{Value, json};

/// Build the order routes
///
/// - GET /api/orders - List orders with their line items
/// - POST /api/orders - Create an order
/// - GET /api/orders/{id} - Get one order
/// - PUT /api/orders/{id} - Update order header fields
/// - DELETE /api/orders/{id} - Delete an order
///
/// Every route requires access to the page named by `guard`.
pub fn build_order_routes(state: OrderApiState, guard: PageGuard) -> Router {
    Router::new()
        .route("/api/orders", get(list_orders).post(create_order))
        .route(
            "/api/orders/{id}",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route_layer(middleware::from_fn_with_state(guard, require_page))
        .with_state(state)
}

/// Build health check routes
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_check))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "renuga-crm"
    }))
}
