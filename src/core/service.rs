//! Order transaction manager
//!
//! [`OrderService`] owns a handle to an [`OrderStorage`] and runs every order
//! operation against it. Creation is the only multi-statement write: the
//! header, each line item and each guarded stock decrement go through one
//! transaction that either commits as a whole or is rolled back before the
//! error is returned.

use crate::core::dates;
use crate::core::error::{CrmError, CrmResult, ValidationError};
use crate::core::fields::{self, ColumnKind, EntityKind, FieldAssignment};
use crate::core::order::{CreateOrderRequest, NewOrder, OrderWithItems};
use crate::core::store::{OrderStorage, OrderTransaction};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Entry point for order operations
#[derive(Clone)]
pub struct OrderService {
    storage: Arc<dyn OrderStorage>,
}

impl OrderService {
    pub fn new(storage: Arc<dyn OrderStorage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn OrderStorage> {
        &self.storage
    }

    /// Create an order with its line items and reserve stock for each item
    ///
    /// Validation runs before the transaction is opened. A line item whose
    /// quantity exceeds the available stock fails the whole order with
    /// [`CrmError::InsufficientInventory`], leaving no header, no line items
    /// and no decrements behind.
    pub async fn create_order(&self, request: CreateOrderRequest) -> CrmResult<OrderWithItems> {
        let order = request.into_new_order()?;

        let mut tx = self.storage.begin().await?;
        let written = write_order(tx.as_mut(), &order).await;
        match written {
            Ok(()) => tx.commit().await?,
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(
                        order_id = %order.id,
                        error = %rollback_err,
                        "rollback failed"
                    );
                }
                tracing::warn!(order_id = %order.id, error = %e, "order creation rolled back");
                return Err(e);
            }
        }

        tracing::info!(
            order_id = %order.id,
            line_items = order.line_items.len(),
            "order committed"
        );

        match self.read_order(&order.id).await? {
            Some(created) => Ok(created),
            None => {
                tracing::error!(order_id = %order.id, "committed order missing on read-back");
                Err(CrmError::InternalConsistency {
                    message: format!("order {} not found after commit", order.id),
                })
            }
        }
    }

    /// Apply a partial update to an order header
    ///
    /// Only whitelisted fields are written; the line items and inventory are
    /// left untouched.
    pub async fn update_order(
        &self,
        id: &str,
        payload: &Map<String, Value>,
    ) -> CrmResult<OrderWithItems> {
        let updates = fields::validate_and_convert_fields(EntityKind::Orders, payload)
            .ok_or(ValidationError::NoValidFields)?;
        let updates = updates.try_map_values(normalize_assignment)?;

        let matched = self.storage.update_order(id, &updates).await?;
        if matched == 0 {
            return Err(CrmError::not_found("order", id));
        }

        tracing::info!(order_id = %id, columns = ?updates.columns(), "order updated");

        self.read_order(id)
            .await?
            .ok_or_else(|| CrmError::not_found("order", id))
    }

    pub async fn get_order(&self, id: &str) -> CrmResult<OrderWithItems> {
        self.read_order(id)
            .await?
            .ok_or_else(|| CrmError::not_found("order", id))
    }

    /// All orders with their line items, most recent `orderDate` first
    pub async fn list_orders(&self) -> CrmResult<Vec<OrderWithItems>> {
        let headers = self.storage.list_orders().await?;
        let mut orders = Vec::with_capacity(headers.len());
        for order in headers {
            let products = self.storage.fetch_line_items(&order.id).await?;
            orders.push(OrderWithItems { order, products });
        }
        Ok(orders)
    }

    /// Delete an order and its line items. Stock is not restored.
    pub async fn delete_order(&self, id: &str) -> CrmResult<()> {
        let removed = self.storage.delete_order(id).await?;
        if removed == 0 {
            return Err(CrmError::not_found("order", id));
        }
        tracing::info!(order_id = %id, "order deleted");
        Ok(())
    }

    async fn read_order(&self, id: &str) -> CrmResult<Option<OrderWithItems>> {
        let Some(order) = self.storage.fetch_order(id).await? else {
            return Ok(None);
        };
        let products = self.storage.fetch_line_items(id).await?;
        Ok(Some(OrderWithItems { order, products }))
    }
}

async fn write_order(tx: &mut dyn OrderTransaction, order: &NewOrder) -> CrmResult<()> {
    tx.insert_order(order).await?;

    for item in &order.line_items {
        tx.insert_line_item(&order.id, item).await?;

        let affected = tx.decrement_stock(&item.product_id, item.quantity).await?;
        if affected == 0 {
            tracing::warn!(
                order_id = %order.id,
                product_id = %item.product_id,
                quantity = %item.quantity,
                "insufficient inventory"
            );
            return Err(CrmError::InsufficientInventory {
                product_name: item.product_name.clone(),
            });
        }
    }

    Ok(())
}

/// Coerce an accepted update value to what its column stores
///
/// Dates become storage literals, so backends only ever see text for
/// `DateTime` columns.
fn normalize_assignment(assignment: &FieldAssignment) -> Result<Value, ValidationError> {
    let mismatch = |expected: &str| ValidationError::FieldError {
        field: assignment.field.to_string(),
        message: format!("must be {}", expected),
    };
    let non_negative = |n: serde_json::Number| match n.as_f64() {
        Some(v) if v < 0.0 => Err(mismatch("a non-negative number")),
        _ => Ok(Value::Number(n)),
    };

    match (assignment.kind, &assignment.value) {
        (_, Value::Null) => Ok(Value::Null),

        (ColumnKind::DateTime, value) => match dates::parse_json_date(Some(value)) {
            Ok(instant) => Ok(dates::to_storage_literal(instant.as_ref())
                .map(Value::String)
                .unwrap_or(Value::Null)),
            Err(source) => Err(ValidationError::InvalidDate {
                field: assignment.field.to_string(),
                source,
            }),
        },

        (ColumnKind::Number, Value::Number(n)) => non_negative(n.clone()),
        (ColumnKind::Number, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .ok_or_else(|| mismatch("a number"))
            .and_then(non_negative),
        (ColumnKind::Number, _) => Err(mismatch("a number")),

        (ColumnKind::Boolean, Value::Bool(b)) => Ok(Value::Bool(*b)),
        (ColumnKind::Boolean, Value::Number(n)) => match n.as_i64() {
            Some(0) => Ok(Value::Bool(false)),
            Some(1) => Ok(Value::Bool(true)),
            _ => Err(mismatch("a boolean")),
        },
        (ColumnKind::Boolean, _) => Err(mismatch("a boolean")),

        (ColumnKind::Text, Value::String(s)) => Ok(Value::String(s.clone())),
        (ColumnKind::Text, Value::Number(n)) => Ok(Value::String(n.to_string())),
        (ColumnKind::Text, Value::Bool(b)) => Ok(Value::String(b.to_string())),
        (ColumnKind::Text, _) => Err(mismatch("text")),
    }
}
