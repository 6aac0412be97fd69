//! Macro-generated test suite for `OrderService` over any storage backend.
//!
//! # Generated Tests
//!
//! ## Creation
//! - `test_create_reads_back_committed_order` - header, items and stock after commit
//! - `test_line_items_keep_request_order` - storage ids ascend with item order
//! - `test_exact_stock_is_enough` - quantity equal to stock succeeds, leaves zero
//! - `test_decimal_quantities` - fractional stock and quantities
//! - `test_fractional_orders_use_up_exact_stock` - 0.1 then 0.2 against 0.3 leaves zero
//! - `test_timestamps_are_utc_now` - created_at / updated_at are stamped in UTC
//!
//! ## Atomicity
//! - `test_shortage_rolls_back_everything` - second item short, nothing persists
//! - `test_unknown_product_rolls_back` - decrement of a missing product
//! - `test_duplicate_id_rolls_back` - header insert fails, stock untouched
//! - `test_concurrent_orders_never_oversell` - parallel creates on one product
//!
//! ## Validation
//! - `test_missing_field_has_no_side_effects`
//! - `test_bad_date_has_no_side_effects`
//!
//! ## Update / read / delete
//! - `test_update_only_touches_whitelisted_fields`
//! - `test_update_normalizes_dates`
//! - `test_update_without_valid_fields`
//! - `test_update_unknown_order`
//! - `test_list_newest_first`
//! - `test_delete_keeps_stock`

/// Generate the order service conformance suite.
///
/// `$factory` must evaluate to a fresh [`Fixture`](super::Fixture); it is
/// re-evaluated for each test.
#[macro_export]
macro_rules! order_service_tests {
    ($factory:expr) => {
        mod order_service_contract_tests {
            use super::*;
            use crm::core::error::{CrmError, ValidationError};
            use serde_json::json;

            // ==================================================================
            // Creation
            // ==================================================================

            #[tokio::test]
            async fn test_create_reads_back_committed_order() {
                let fixture = $factory.with_stock(&[("P1", "Cement 50kg", "10")]).await;
                let service = fixture.service();

                let created = service
                    .create_order(request(order_body(
                        "O-100",
                        vec![line("P1", "Cement 50kg", 2.0, 100.0)],
                    )))
                    .await
                    .unwrap();

                assert_eq!(created.order.id, "O-100");
                assert_eq!(created.order.customer_name, "Asha Traders");
                assert_eq!(created.order.lead_id.as_deref(), Some("L-1"));
                assert_eq!(created.order.call_id, None);
                assert_eq!(created.order.aging_days, 0);
                assert!(!created.order.is_delayed);
                assert_eq!(created.order.total_amount, 200.0);
                assert_eq!(
                    crm::core::dates::to_iso_string(&created.order.order_date),
                    "2024-03-01T09:00:00.000Z"
                );
                assert_eq!(
                    crm::core::dates::to_iso_string(&created.order.expected_delivery_date),
                    "2024-03-05T00:00:00.000Z"
                );

                assert_eq!(created.products.len(), 1);
                let item = &created.products[0];
                assert_eq!(item.order_id, "O-100");
                assert_eq!(item.product_id, "P1");
                assert_eq!(item.quantity, qty("2"));
                assert_eq!(item.unit.as_deref(), Some("bag"));
                assert_eq!(item.total_price, 200.0);

                assert_eq!(fixture.stock("P1").await, qty("8"));
                assert_eq!(service.get_order("O-100").await.unwrap(), created);
            }

            #[tokio::test]
            async fn test_line_items_keep_request_order() {
                let fixture = $factory
                    .with_stock(&[("P1", "Cement", "10"), ("P2", "Sand", "10"), ("P3", "Brick", "10")])
                    .await;

                let created = fixture
                    .service()
                    .create_order(request(order_body(
                        "O-101",
                        vec![
                            line("P3", "Brick", 1.0, 5.0),
                            line("P1", "Cement", 1.0, 5.0),
                            line("P2", "Sand", 1.0, 5.0),
                        ],
                    )))
                    .await
                    .unwrap();

                let ids: Vec<&str> = created.products.iter().map(|p| p.product_id.as_str()).collect();
                assert_eq!(ids, vec!["P3", "P1", "P2"]);
                assert!(created.products.windows(2).all(|w| w[0].id < w[1].id));
            }

            #[tokio::test]
            async fn test_exact_stock_is_enough() {
                let fixture = $factory.with_stock(&[("P1", "Cement", "2")]).await;
                fixture
                    .service()
                    .create_order(request(order_body("O-102", vec![line("P1", "Cement", 2.0, 10.0)])))
                    .await
                    .unwrap();
                assert_eq!(fixture.stock("P1").await, qty("0"));
            }

            #[tokio::test]
            async fn test_decimal_quantities() {
                let fixture = $factory.with_stock(&[("P1", "Wire (m)", "5.5")]).await;
                fixture
                    .service()
                    .create_order(request(order_body("O-103", vec![line("P1", "Wire (m)", 2.25, 4.0)])))
                    .await
                    .unwrap();
                assert_eq!(fixture.stock("P1").await, qty("3.25"));
            }

            #[tokio::test]
            async fn test_fractional_orders_use_up_exact_stock() {
                let fixture = $factory.with_stock(&[("W", "Wire", "0.3")]).await;
                let service = fixture.service();

                service
                    .create_order(request(order_body("O-104", vec![line("W", "Wire", 0.1, 10.0)])))
                    .await
                    .unwrap();
                assert_eq!(fixture.stock("W").await, qty("0.2"));

                service
                    .create_order(request(order_body("O-105", vec![line("W", "Wire", 0.2, 10.0)])))
                    .await
                    .unwrap();
                assert_eq!(fixture.stock("W").await, qty("0"));
            }

            #[tokio::test]
            async fn test_timestamps_are_utc_now() {
                let fixture = $factory.with_stock(&[("P1", "Cement", "10")]).await;
                let before = chrono::Utc::now() - chrono::Duration::seconds(5);

                let created = fixture
                    .service()
                    .create_order(request(order_body("O-106", vec![line("P1", "Cement", 1.0, 10.0)])))
                    .await
                    .unwrap();

                let after = chrono::Utc::now() + chrono::Duration::seconds(5);
                assert!(created.order.created_at >= before && created.order.created_at <= after);
                assert!(created.order.updated_at >= before && created.order.updated_at <= after);
            }

            // ==================================================================
            // Atomicity
            // ==================================================================

            #[tokio::test]
            async fn test_shortage_rolls_back_everything() {
                let fixture = $factory
                    .with_stock(&[("P1", "Cement", "10"), ("P2", "Sand", "1")])
                    .await;
                let service = fixture.service();

                let err = service
                    .create_order(request(order_body(
                        "O-200",
                        vec![line("P1", "Cement", 2.0, 100.0), line("P2", "Sand", 5.0, 20.0)],
                    )))
                    .await
                    .unwrap_err();

                match err {
                    CrmError::InsufficientInventory { product_name } => {
                        assert_eq!(product_name, "Sand")
                    }
                    other => panic!("expected insufficient inventory, got {:?}", other),
                }

                assert!(matches!(
                    service.get_order("O-200").await,
                    Err(CrmError::NotFound { .. })
                ));
                assert!(fixture.storage.fetch_line_items("O-200").await.unwrap().is_empty());
                assert_eq!(fixture.stock("P1").await, qty("10"));
                assert_eq!(fixture.stock("P2").await, qty("1"));
            }

            #[tokio::test]
            async fn test_unknown_product_rolls_back() {
                let fixture = $factory.with_stock(&[("P1", "Cement", "10")]).await;
                let service = fixture.service();

                let err = service
                    .create_order(request(order_body(
                        "O-201",
                        vec![line("P1", "Cement", 1.0, 100.0), line("P404", "Ghost", 1.0, 1.0)],
                    )))
                    .await
                    .unwrap_err();

                assert!(matches!(err, CrmError::InsufficientInventory { .. }));
                assert!(service.list_orders().await.unwrap().is_empty());
                assert_eq!(fixture.stock("P1").await, qty("10"));
            }

            #[tokio::test]
            async fn test_duplicate_id_rolls_back() {
                let fixture = $factory.with_stock(&[("P1", "Cement", "10")]).await;
                let service = fixture.service();
                let body = order_body("O-202", vec![line("P1", "Cement", 1.0, 100.0)]);

                service.create_order(request(body.clone())).await.unwrap();
                let err = service.create_order(request(body)).await.unwrap_err();

                assert!(matches!(err, CrmError::Storage(_)));
                assert_eq!(fixture.stock("P1").await, qty("9"));
                assert_eq!(service.get_order("O-202").await.unwrap().products.len(), 1);
            }

            #[tokio::test]
            async fn test_concurrent_orders_never_oversell() {
                let fixture = $factory.with_stock(&[("P1", "Cement", "7")]).await;
                let service = fixture.service();

                let handles: Vec<_> = (0..8)
                    .map(|i| {
                        let service = service.clone();
                        tokio::spawn(async move {
                            service
                                .create_order(request(order_body(
                                    &format!("O-3{:02}", i),
                                    vec![line("P1", "Cement", 2.0, 10.0)],
                                )))
                                .await
                        })
                    })
                    .collect();

                let mut created = 0;
                for outcome in futures::future::join_all(handles).await {
                    match outcome.unwrap() {
                        Ok(_) => created += 1,
                        Err(CrmError::InsufficientInventory { .. }) => {}
                        Err(other) => panic!("unexpected error: {:?}", other),
                    }
                }

                assert_eq!(created, 3);
                assert_eq!(fixture.stock("P1").await, qty("1"));
                assert_eq!(service.list_orders().await.unwrap().len(), 3);
            }

            // ==================================================================
            // Validation
            // ==================================================================

            #[tokio::test]
            async fn test_missing_field_has_no_side_effects() {
                let fixture = $factory.with_stock(&[("P1", "Cement", "10")]).await;
                let service = fixture.service();

                let mut body = order_body("O-400", vec![line("P1", "Cement", 2.0, 100.0)]);
                body.as_object_mut().unwrap().remove("assignedTo");

                let err = service.create_order(request(body)).await.unwrap_err();
                match err {
                    CrmError::Validation(ValidationError::FieldErrors(errors)) => {
                        assert_eq!(errors.len(), 1);
                        assert_eq!(errors[0].field, "assignedTo");
                    }
                    other => panic!("expected validation error, got {:?}", other),
                }

                assert!(service.list_orders().await.unwrap().is_empty());
                assert_eq!(fixture.stock("P1").await, qty("10"));
            }

            #[tokio::test]
            async fn test_bad_date_has_no_side_effects() {
                let fixture = $factory.with_stock(&[("P1", "Cement", "10")]).await;
                let service = fixture.service();

                let mut body = order_body("O-401", vec![line("P1", "Cement", 2.0, 100.0)]);
                body["expectedDeliveryDate"] = json!("next tuesday");

                let err = service.create_order(request(body)).await.unwrap_err();
                assert!(matches!(
                    err,
                    CrmError::Validation(ValidationError::InvalidDate { .. })
                ));
                assert!(service.list_orders().await.unwrap().is_empty());
                assert_eq!(fixture.stock("P1").await, qty("10"));
            }

            // ==================================================================
            // Update / read / delete
            // ==================================================================

            #[tokio::test]
            async fn test_update_only_touches_whitelisted_fields() {
                let fixture = $factory.with_stock(&[("P1", "Cement", "10")]).await;
                let service = fixture.service();
                let created = service
                    .create_order(request(order_body("O-500", vec![line("P1", "Cement", 2.0, 100.0)])))
                    .await
                    .unwrap();

                let payload = json!({
                    "id": "O-hijack",
                    "status": "Dispatched",
                    "isDelayed": true,
                    "products": [],
                    "unknownField": "ignored"
                });
                let updated = service
                    .update_order("O-500", payload.as_object().unwrap())
                    .await
                    .unwrap();

                assert_eq!(updated.order.id, "O-500");
                assert_eq!(updated.order.status, "Dispatched");
                assert!(updated.order.is_delayed);
                assert_eq!(updated.order.customer_name, created.order.customer_name);
                assert_eq!(updated.products, created.products);
                assert_eq!(fixture.stock("P1").await, qty("8"));
                assert!(matches!(
                    service.get_order("O-hijack").await,
                    Err(CrmError::NotFound { .. })
                ));
            }

            #[tokio::test]
            async fn test_update_normalizes_dates() {
                let fixture = $factory.with_stock(&[("P1", "Cement", "10")]).await;
                let service = fixture.service();
                service
                    .create_order(request(order_body("O-501", vec![line("P1", "Cement", 1.0, 100.0)])))
                    .await
                    .unwrap();

                let payload = json!({
                    "actualDeliveryDate": "2024-03-04T16:45:30.900Z",
                    "expectedDeliveryDate": 1_709_856_000_000i64
                });
                let updated = service
                    .update_order("O-501", payload.as_object().unwrap())
                    .await
                    .unwrap();

                assert_eq!(
                    updated.order.actual_delivery_date.map(|d| crm::core::dates::to_iso_string(&d)),
                    Some("2024-03-04T16:45:30.000Z".to_string())
                );
                assert_eq!(
                    crm::core::dates::to_iso_string(&updated.order.expected_delivery_date),
                    "2024-03-08T00:00:00.000Z"
                );

                let bad = json!({ "orderDate": "not a date" });
                assert!(matches!(
                    service.update_order("O-501", bad.as_object().unwrap()).await,
                    Err(CrmError::Validation(ValidationError::InvalidDate { .. }))
                ));
            }

            #[tokio::test]
            async fn test_update_without_valid_fields() {
                let fixture = $factory;
                let service = fixture.service();

                for payload in [json!({}), json!({ "id": "O-9", "bogus": true })] {
                    let err = service
                        .update_order("O-anything", payload.as_object().unwrap())
                        .await
                        .unwrap_err();
                    assert!(matches!(
                        err,
                        CrmError::Validation(ValidationError::NoValidFields)
                    ));
                }
            }

            #[tokio::test]
            async fn test_update_unknown_order() {
                let fixture = $factory;
                let payload = json!({ "status": "Delivered" });
                let err = fixture
                    .service()
                    .update_order("O-missing", payload.as_object().unwrap())
                    .await
                    .unwrap_err();
                assert!(matches!(err, CrmError::NotFound { .. }));
            }

            #[tokio::test]
            async fn test_list_newest_first() {
                let fixture = $factory.with_stock(&[("P1", "Cement", "10")]).await;
                let service = fixture.service();

                for (id, date) in [("O-600", "2024-01-10"), ("O-601", "2024-02-10"), ("O-602", "2023-12-10")] {
                    let mut body = order_body(id, vec![line("P1", "Cement", 1.0, 10.0)]);
                    body["orderDate"] = json!(date);
                    service.create_order(request(body)).await.unwrap();
                }

                let orders = service.list_orders().await.unwrap();
                let ids: Vec<&str> = orders.iter().map(|o| o.order.id.as_str()).collect();
                assert_eq!(ids, vec!["O-601", "O-600", "O-602"]);
                assert!(orders.iter().all(|o| o.products.len() == 1));
            }

            #[tokio::test]
            async fn test_delete_keeps_stock() {
                let fixture = $factory.with_stock(&[("P1", "Cement", "10")]).await;
                let service = fixture.service();
                service
                    .create_order(request(order_body("O-700", vec![line("P1", "Cement", 3.0, 10.0)])))
                    .await
                    .unwrap();

                service.delete_order("O-700").await.unwrap();

                assert!(matches!(
                    service.get_order("O-700").await,
                    Err(CrmError::NotFound { .. })
                ));
                assert!(fixture.storage.fetch_line_items("O-700").await.unwrap().is_empty());
                assert!(matches!(
                    service.delete_order("O-700").await,
                    Err(CrmError::NotFound { .. })
                ));
                assert_eq!(fixture.stock("P1").await, qty("7"));
            }
        }
    };
}
