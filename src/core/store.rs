//! Storage contract for orders
//!
//! The order service never talks to a database directly. It is handed an
//! [`OrderStorage`] at construction and opens one [`OrderTransaction`] per
//! order creation. Dropping a transaction without committing it must discard
//! every write made through it.

use crate::core::error::StorageResult;
use crate::core::fields::FieldUpdates;
use crate::core::order::{LineItem, NewLineItem, NewOrder, Order};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Connection-level operations on orders
#[async_trait]
pub trait OrderStorage: Send + Sync {
    /// Open a transaction for a multi-statement write
    async fn begin(&self) -> StorageResult<Box<dyn OrderTransaction>>;

    /// Read an order header
    async fn fetch_order(&self, id: &str) -> StorageResult<Option<Order>>;

    /// Read the line items of an order, in insertion order
    async fn fetch_line_items(&self, order_id: &str) -> StorageResult<Vec<LineItem>>;

    /// All order headers, most recent `orderDate` first
    async fn list_orders(&self) -> StorageResult<Vec<Order>>;

    /// Apply whitelisted column assignments and bump `updated_at`
    ///
    /// Returns the number of rows matched.
    async fn update_order(&self, id: &str, updates: &FieldUpdates) -> StorageResult<u64>;

    /// Delete an order header; its line items go with it
    ///
    /// Returns the number of rows removed.
    async fn delete_order(&self, id: &str) -> StorageResult<u64>;
}

/// Writes that must land together or not at all
#[async_trait]
pub trait OrderTransaction: Send {
    async fn insert_order(&mut self, order: &NewOrder) -> StorageResult<()>;

    /// Insert one line item and return its storage-assigned id
    async fn insert_line_item(&mut self, order_id: &str, item: &NewLineItem) -> StorageResult<i64>;

    /// Decrement stock only if at least `quantity` is available
    ///
    /// Returns the number of rows affected: zero means the product is unknown
    /// or short on stock, and nothing was changed.
    async fn decrement_stock(&mut self, product_id: &str, quantity: Decimal) -> StorageResult<u64>;

    async fn commit(self: Box<Self>) -> StorageResult<()>;

    async fn rollback(self: Box<Self>) -> StorageResult<()>;
}
