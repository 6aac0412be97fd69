//! # Renuga CRM order service
//!
//! Order placement for a small business CRM, exposed as a REST API.
//!
//! ## Features
//!
//! - **Transactional orders**: header, line items and stock decrements commit together or not at all
//! - **No overselling**: every decrement is guarded by the available quantity
//! - **Whitelisted updates**: partial updates only touch known columns, always through placeholders
//! - **Date normalization**: text, epoch milliseconds and native instants map to one UTC instant
//! - **Page access control**: role to page table with per-user grants
//! - **Pluggable storage**: in-memory for tests and development, MySQL behind the `mysql` feature
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crm::prelude::*;
//!
//! let storage = InMemoryStorage::new();
//! storage.insert_product(Product::new("P1", "Cement 50kg", Decimal::from(100))).await;
//!
//! ServerBuilder::new()
//!     .with_storage(storage)
//!     .serve("127.0.0.1:5000")
//!     .await?;
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        auth::{AuthContext, AuthProvider, PagePolicy, Principal, TrustedHeaderAuthProvider},
        dates::{DateInput, parse_date, to_iso_string, to_storage_literal},
        error::{CrmError, CrmResult, StorageError, ValidationError},
        fields::{EntityKind, FieldUpdates, validate_and_convert_fields},
        order::{CreateOrderRequest, LineItem, LineItemRequest, Order, OrderWithItems, Product},
        service::OrderService,
        store::{OrderStorage, OrderTransaction},
    };

    // === Configuration ===
    pub use crate::config::CrmConfig;

    // === Server ===
    pub use crate::server::ServerBuilder;

    // === Storage ===
    pub use crate::storage::InMemoryStorage;
    #[cfg(feature = "mysql")]
    pub use crate::storage::MysqlStorage;

    // === Re-exports ===
    pub use async_trait::async_trait;
    pub use axum::Router;
    pub use chrono::{DateTime, Utc};
    pub use rust_decimal::Decimal;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};
}
