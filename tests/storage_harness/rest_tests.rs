//! REST integration test macro for storage backends.
//!
//! The `rest_integration_tests!` macro generates HTTP-level tests that go
//! through the full stack: JSON → page guard → handler → OrderService →
//! storage → JSON response.

/// Generate a REST integration test suite for a storage backend.
///
/// `$factory` must evaluate to a fresh [`Fixture`](super::Fixture).
///
/// # Generated Tests
///
/// - `test_rest_create` - POST 201 with the stored order
/// - `test_rest_create_validation` - POST 400 listing the missing fields
/// - `test_rest_create_malformed_json` - POST 400 on a broken body
/// - `test_rest_create_shortage` - POST 500 naming the product
/// - `test_rest_get_and_list` - GET 200, GET unknown 404
/// - `test_rest_update` - PUT 200, empty PUT 400, unknown PUT 404
/// - `test_rest_delete` - DELETE 200 `{success, message}`, then 404
/// - `test_rest_requires_principal` - 401 without identity headers
/// - `test_rest_requires_orders_page` - 403 without the Orders page
/// - `test_rest_health` - GET /health is public
#[macro_export]
macro_rules! rest_integration_tests {
    ($factory:expr) => {
        mod rest_integration_tests {
            use super::*;
            use axum::http::{HeaderName, HeaderValue, StatusCode};
            use axum_test::{TestRequest, TestServer};
            use crm::server::ServerBuilder;
            use serde_json::{Value, json};

            async fn make_server(fixture: &Fixture) -> TestServer {
                let router = ServerBuilder::new()
                    .with_shared_storage(fixture.storage.clone())
                    .build()
                    .unwrap();
                TestServer::try_new(router).unwrap()
            }

            fn as_user(request: TestRequest, role: &'static str, pages: &'static str) -> TestRequest {
                request
                    .add_header(
                        HeaderName::from_static("x-user-id"),
                        HeaderValue::from_static("u-1"),
                    )
                    .add_header(
                        HeaderName::from_static("x-user-role"),
                        HeaderValue::from_static(role),
                    )
                    .add_header(
                        HeaderName::from_static("x-page-access"),
                        HeaderValue::from_static(pages),
                    )
            }

            fn as_sales(request: TestRequest) -> TestRequest {
                as_user(request, "Sales", "Leads,Orders")
            }

            // ==============================================================
            // Create
            // ==============================================================

            #[tokio::test]
            async fn test_rest_create() {
                let fixture = $factory.with_stock(&[("P1", "Cement 50kg", "10")]).await;
                let server = make_server(&fixture).await;

                let response = as_sales(server.post("/api/orders"))
                    .json(&order_body("O-100", vec![line("P1", "Cement 50kg", 2.0, 100.0)]))
                    .await;

                response.assert_status(StatusCode::CREATED);
                let body: Value = response.json();
                assert_eq!(body["id"], "O-100");
                assert_eq!(body["customerName"], "Asha Traders");
                assert_eq!(body["orderDate"], "2024-03-01T09:00:00.000Z");
                assert_eq!(body["agingDays"], 0);
                assert_eq!(body["isDelayed"], false);
                assert_eq!(body["products"][0]["productId"], "P1");
                assert_eq!(body["products"][0]["quantity"], 2.0);
                assert_eq!(fixture.stock("P1").await, qty("8"));
            }

            #[tokio::test]
            async fn test_rest_create_validation() {
                let fixture = $factory.with_stock(&[("P1", "Cement", "10")]).await;
                let server = make_server(&fixture).await;

                let mut order = order_body("O-101", vec![line("P1", "Cement", 2.0, 100.0)]);
                order.as_object_mut().unwrap().remove("assignedTo");
                order["products"] = json!([]);

                let response = as_sales(server.post("/api/orders")).json(&order).await;

                response.assert_status(StatusCode::BAD_REQUEST);
                let body: Value = response.json();
                assert_eq!(body["code"], "VALIDATION_ERROR");
                let fields: Vec<&str> = body["details"]["fields"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .filter_map(|f| f["field"].as_str())
                    .collect();
                assert_eq!(fields, vec!["assignedTo", "products"]);
                assert_eq!(fixture.stock("P1").await, qty("10"));
            }

            #[tokio::test]
            async fn test_rest_create_malformed_json() {
                let fixture = $factory;
                let server = make_server(&fixture).await;

                let response = as_sales(server.post("/api/orders"))
                    .content_type("application/json")
                    .text("{\"id\": ")
                    .await;

                response.assert_status(StatusCode::BAD_REQUEST);
                let body: Value = response.json();
                assert_eq!(body["code"], "INVALID_JSON");
            }

            #[tokio::test]
            async fn test_rest_create_shortage() {
                let fixture = $factory
                    .with_stock(&[("P1", "Cement", "10"), ("P2", "Sand", "1")])
                    .await;
                let server = make_server(&fixture).await;

                let response = as_sales(server.post("/api/orders"))
                    .json(&order_body(
                        "O-102",
                        vec![line("P1", "Cement", 2.0, 100.0), line("P2", "Sand", 5.0, 20.0)],
                    ))
                    .await;

                response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
                let body: Value = response.json();
                assert_eq!(body["error"], "Failed to create order");
                assert_eq!(body["details"], "Insufficient inventory for product Sand");
                assert_eq!(fixture.stock("P1").await, qty("10"));

                as_sales(server.get("/api/orders/O-102"))
                    .await
                    .assert_status(StatusCode::NOT_FOUND);
            }

            // ==============================================================
            // Read
            // ==============================================================

            #[tokio::test]
            async fn test_rest_get_and_list() {
                let fixture = $factory.with_stock(&[("P1", "Cement", "10")]).await;
                let server = make_server(&fixture).await;

                as_sales(server.post("/api/orders"))
                    .json(&order_body("O-103", vec![line("P1", "Cement", 1.0, 10.0)]))
                    .await
                    .assert_status(StatusCode::CREATED);

                let response = as_sales(server.get("/api/orders/O-103")).await;
                response.assert_status_ok();
                let body: Value = response.json();
                assert_eq!(body["id"], "O-103");
                assert_eq!(body["products"].as_array().unwrap().len(), 1);

                let response = as_sales(server.get("/api/orders")).await;
                response.assert_status_ok();
                let body: Value = response.json();
                assert_eq!(body.as_array().unwrap().len(), 1);

                let response = as_sales(server.get("/api/orders/O-404")).await;
                response.assert_status(StatusCode::NOT_FOUND);
                let body: Value = response.json();
                assert_eq!(body["error"], "Order not found");
            }

            // ==============================================================
            // Update
            // ==============================================================

            #[tokio::test]
            async fn test_rest_update() {
                let fixture = $factory.with_stock(&[("P1", "Cement", "10")]).await;
                let server = make_server(&fixture).await;

                as_sales(server.post("/api/orders"))
                    .json(&order_body("O-104", vec![line("P1", "Cement", 1.0, 10.0)]))
                    .await
                    .assert_status(StatusCode::CREATED);

                let response = as_sales(server.put("/api/orders/O-104"))
                    .json(&json!({ "paymentStatus": "Paid", "invoiceNumber": "INV-77", "id": "X" }))
                    .await;
                response.assert_status_ok();
                let body: Value = response.json();
                assert_eq!(body["id"], "O-104");
                assert_eq!(body["paymentStatus"], "Paid");
                assert_eq!(body["invoiceNumber"], "INV-77");
                assert_eq!(body["products"].as_array().unwrap().len(), 1);

                let response = as_sales(server.put("/api/orders/O-104"))
                    .json(&json!({ "notAColumn": 1 }))
                    .await;
                response.assert_status(StatusCode::BAD_REQUEST);
                let body: Value = response.json();
                assert_eq!(body["error"], "No valid fields to update");

                as_sales(server.put("/api/orders/O-404"))
                    .json(&json!({ "status": "Delivered" }))
                    .await
                    .assert_status(StatusCode::NOT_FOUND);

                as_sales(server.put("/api/orders/O-104"))
                    .json(&json!(["status"]))
                    .await
                    .assert_status(StatusCode::BAD_REQUEST);
            }

            // ==============================================================
            // Delete
            // ==============================================================

            #[tokio::test]
            async fn test_rest_delete() {
                let fixture = $factory.with_stock(&[("P1", "Cement", "10")]).await;
                let server = make_server(&fixture).await;

                as_sales(server.post("/api/orders"))
                    .json(&order_body("O-105", vec![line("P1", "Cement", 1.0, 10.0)]))
                    .await
                    .assert_status(StatusCode::CREATED);

                let response = as_sales(server.delete("/api/orders/O-105")).await;
                response.assert_status_ok();
                let body: Value = response.json();
                assert_eq!(body, json!({ "success": true, "message": "Order deleted" }));

                as_sales(server.delete("/api/orders/O-105"))
                    .await
                    .assert_status(StatusCode::NOT_FOUND);
            }

            // ==============================================================
            // Access control
            // ==============================================================

            #[tokio::test]
            async fn test_rest_requires_principal() {
                let fixture = $factory;
                let server = make_server(&fixture).await;

                let response = server.get("/api/orders").await;
                response.assert_status(StatusCode::UNAUTHORIZED);
                let body: Value = response.json();
                assert_eq!(body["code"], "UNAUTHORIZED");
            }

            #[tokio::test]
            async fn test_rest_requires_orders_page() {
                let fixture = $factory.with_stock(&[("P1", "Cement", "10")]).await;
                let server = make_server(&fixture).await;

                let response = as_user(server.post("/api/orders"), "Sales", "Leads,CallLog")
                    .json(&order_body("O-106", vec![line("P1", "Cement", 1.0, 10.0)]))
                    .await;
                response.assert_status(StatusCode::FORBIDDEN);
                assert_eq!(fixture.stock("P1").await, qty("10"));

                as_user(server.get("/api/orders"), "Admin", "")
                    .await
                    .assert_status_ok();
            }

            #[tokio::test]
            async fn test_rest_health() {
                let fixture = $factory;
                let server = make_server(&fixture).await;

                let response = server.get("/health").await;
                response.assert_status_ok();
                let body: Value = response.json();
                assert_eq!(body["status"], "ok");
            }
        }
    };
}
