//! Core module containing the domain types, traits and order logic

pub mod auth;
pub mod dates;
pub mod error;
pub mod fields;
pub mod order;
pub mod service;
pub mod store;

pub use auth::{AuthContext, AuthProvider, PagePolicy, Principal, TrustedHeaderAuthProvider};
pub use error::{CrmError, CrmResult, StorageError, ValidationError};
pub use fields::{EntityKind, FieldUpdates, validate_and_convert_fields};
pub use order::{CreateOrderRequest, LineItem, Order, OrderWithItems, Product};
pub use service::OrderService;
pub use store::{OrderStorage, OrderTransaction};
