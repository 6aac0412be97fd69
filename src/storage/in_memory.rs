//! In-memory order storage for testing and development
//!
//! All tables live behind one async mutex. A transaction holds that mutex for
//! its whole lifetime, so concurrent order creations are serialized, and keeps
//! an undo journal that is replayed on rollback or when the transaction is
//! dropped without being committed.

use crate::core::dates;
use crate::core::error::{StorageError, StorageResult};
use crate::core::fields::{FieldAssignment, FieldUpdates};
use crate::core::order::{LineItem, NewLineItem, NewOrder, Order, Product};
use crate::core::store::{OrderStorage, OrderTransaction};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<String, Product>,
    orders: HashMap<String, Order>,
    line_items: Vec<LineItem>,
    next_line_item_id: i64,
}

/// In-memory order storage
///
/// Cloning shares the underlying tables.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product
    pub async fn insert_product(&self, product: Product) {
        let mut tables = self.tables.lock().await;
        tables.products.insert(product.id.clone(), product);
    }

    pub async fn product(&self, id: &str) -> Option<Product> {
        self.tables.lock().await.products.get(id).cloned()
    }

    pub async fn line_item_count(&self) -> usize {
        self.tables.lock().await.line_items.len()
    }
}

#[async_trait]
impl OrderStorage for InMemoryStorage {
    async fn begin(&self) -> StorageResult<Box<dyn OrderTransaction>> {
        let guard = self.tables.clone().lock_owned().await;
        Ok(Box::new(InMemoryTransaction {
            tables: guard,
            journal: Vec::new(),
            finished: false,
        }))
    }

    async fn fetch_order(&self, id: &str) -> StorageResult<Option<Order>> {
        Ok(self.tables.lock().await.orders.get(id).cloned())
    }

    async fn fetch_line_items(&self, order_id: &str) -> StorageResult<Vec<LineItem>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .line_items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn list_orders(&self) -> StorageResult<Vec<Order>> {
        let tables = self.tables.lock().await;
        let mut orders: Vec<Order> = tables.orders.values().cloned().collect();
        orders.sort_by(|a, b| b.order_date.cmp(&a.order_date).then(a.id.cmp(&b.id)));
        Ok(orders)
    }

    async fn update_order(&self, id: &str, updates: &FieldUpdates) -> StorageResult<u64> {
        let mut tables = self.tables.lock().await;
        let Some(current) = tables.orders.get(id) else {
            return Ok(0);
        };

        let mut updated = current.clone();
        for assignment in updates.assignments() {
            apply_assignment(&mut updated, assignment)?;
        }
        updated.updated_at = truncate_to_seconds(Utc::now())?;

        tables.orders.insert(id.to_string(), updated);
        Ok(1)
    }

    async fn delete_order(&self, id: &str) -> StorageResult<u64> {
        let mut tables = self.tables.lock().await;
        if tables.orders.remove(id).is_none() {
            return Ok(0);
        }
        tables.line_items.retain(|item| item.order_id != id);
        Ok(1)
    }
}

// =============================================================================
// Transaction
// =============================================================================

enum Undo {
    RemoveOrder(String),
    RemoveLineItem(i64),
    RestoreStock { product_id: String, previous: Decimal },
}

struct InMemoryTransaction {
    tables: OwnedMutexGuard<Tables>,
    journal: Vec<Undo>,
    finished: bool,
}

impl InMemoryTransaction {
    fn undo(&mut self) {
        while let Some(step) = self.journal.pop() {
            match step {
                Undo::RemoveOrder(id) => {
                    self.tables.orders.remove(&id);
                }
                Undo::RemoveLineItem(id) => {
                    self.tables.line_items.retain(|item| item.id != id);
                }
                Undo::RestoreStock {
                    product_id,
                    previous,
                } => {
                    if let Some(product) = self.tables.products.get_mut(&product_id) {
                        product.available_quantity = previous;
                    }
                }
            }
        }
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if !self.finished && !self.journal.is_empty() {
            tracing::warn!(
                pending = self.journal.len(),
                "transaction dropped without commit, rolling back"
            );
            self.undo();
        }
    }
}

#[async_trait]
impl OrderTransaction for InMemoryTransaction {
    async fn insert_order(&mut self, order: &NewOrder) -> StorageResult<()> {
        if self.tables.orders.contains_key(&order.id) {
            return Err(StorageError::Integrity {
                message: format!("Duplicate entry '{}' for key 'orders.PRIMARY'", order.id),
            });
        }

        let stored = Order::from_new(order, Utc::now()).map_err(|e| StorageError::Integrity {
            message: e.to_string(),
        })?;
        self.tables.orders.insert(order.id.clone(), stored);
        self.journal.push(Undo::RemoveOrder(order.id.clone()));
        Ok(())
    }

    async fn insert_line_item(&mut self, order_id: &str, item: &NewLineItem) -> StorageResult<i64> {
        if !self.tables.orders.contains_key(order_id) {
            return Err(StorageError::Integrity {
                message: format!("order '{}' does not exist", order_id),
            });
        }

        self.tables.next_line_item_id += 1;
        let id = self.tables.next_line_item_id;
        self.tables.line_items.push(LineItem {
            id,
            order_id: order_id.to_string(),
            product_id: item.product_id.clone(),
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit: item.unit.clone(),
            unit_price: item.unit_price,
            total_price: item.total_price,
        });
        self.journal.push(Undo::RemoveLineItem(id));
        Ok(id)
    }

    async fn decrement_stock(&mut self, product_id: &str, quantity: Decimal) -> StorageResult<u64> {
        let Some(product) = self.tables.products.get_mut(product_id) else {
            return Ok(0);
        };
        if product.available_quantity < quantity {
            return Ok(0);
        }

        let previous = product.available_quantity;
        product.available_quantity -= quantity;
        self.journal.push(Undo::RestoreStock {
            product_id: product_id.to_string(),
            previous,
        });
        Ok(1)
    }

    async fn commit(mut self: Box<Self>) -> StorageResult<()> {
        self.journal.clear();
        self.finished = true;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> StorageResult<()> {
        self.undo();
        self.finished = true;
        Ok(())
    }
}

// =============================================================================
// Column assignment
// =============================================================================

fn apply_assignment(order: &mut Order, assignment: &FieldAssignment) -> StorageResult<()> {
    let column = assignment.column;
    let value = &assignment.value;

    match column {
        "lead_id" => order.lead_id = optional_text(column, value)?,
        "call_id" => order.call_id = optional_text(column, value)?,
        "customer_name" => order.customer_name = required_text(column, value)?,
        "mobile" => order.mobile = required_text(column, value)?,
        "delivery_address" => order.delivery_address = required_text(column, value)?,
        "total_amount" => order.total_amount = number(column, value)?,
        "status" => order.status = required_text(column, value)?,
        "order_date" => order.order_date = required_date(column, value)?,
        "expected_delivery_date" => order.expected_delivery_date = required_date(column, value)?,
        "actual_delivery_date" => order.actual_delivery_date = optional_date(column, value)?,
        "aging_days" => order.aging_days = number(column, value)?.round() as i64,
        "is_delayed" => {
            order.is_delayed = value
                .as_bool()
                .ok_or_else(|| type_error(column, "a boolean", value))?
        }
        "payment_status" => order.payment_status = required_text(column, value)?,
        "invoice_number" => order.invoice_number = optional_text(column, value)?,
        "assigned_to" => order.assigned_to = required_text(column, value)?,
        "remarks" => order.remarks = optional_text(column, value)?,
        other => {
            return Err(StorageError::query(
                "in-memory",
                format!("Unknown column '{}' in 'field list'", other),
            ));
        }
    }
    Ok(())
}

fn type_error(column: &str, expected: &str, value: &Value) -> StorageError {
    StorageError::Integrity {
        message: format!("column '{}' expects {}, got {}", column, expected, value),
    }
}

fn optional_text(column: &str, value: &Value) -> StorageResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(type_error(column, "text", other)),
    }
}

fn required_text(column: &str, value: &Value) -> StorageResult<String> {
    optional_text(column, value)?.ok_or_else(|| StorageError::Integrity {
        message: format!("Column '{}' cannot be null", column),
    })
}

fn number(column: &str, value: &Value) -> StorageResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| type_error(column, "a number", value))
}

fn optional_date(column: &str, value: &Value) -> StorageResult<Option<DateTime<Utc>>> {
    optional_text(column, value)?
        .map(|literal| {
            dates::from_storage_literal(&literal).map_err(|e| StorageError::Integrity {
                message: format!("column '{}': {}", column, e),
            })
        })
        .transpose()
}

fn required_date(column: &str, value: &Value) -> StorageResult<DateTime<Utc>> {
    optional_date(column, value)?.ok_or_else(|| StorageError::Integrity {
        message: format!("Column '{}' cannot be null", column),
    })
}

fn truncate_to_seconds(instant: DateTime<Utc>) -> StorageResult<DateTime<Utc>> {
    let literal = dates::to_storage_literal(Some(&instant)).unwrap_or_default();
    dates::from_storage_literal(&literal).map_err(|e| StorageError::Integrity {
        message: e.to_string(),
    })
}
