//! Order, line item and product models
//!
//! [`CreateOrderRequest`] is the wire shape of `POST /api/orders`. It is
//! validated as a whole and then converted into a [`NewOrder`], which carries
//! typed instants and the defaults applied to absent optional fields. Rows read
//! back from storage are [`Order`] and [`LineItem`], joined as [`OrderWithItems`].

use crate::core::dates::{self, DateError};
use crate::core::error::{CrmResult, FieldValidationError, ValidationError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

// =============================================================================
// Requests
// =============================================================================

/// Body of an order creation request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(required(message = "is required"), length(min = 1, message = "is required"))]
    pub id: Option<String>,

    pub lead_id: Option<String>,
    pub call_id: Option<String>,

    #[validate(required(message = "is required"), length(min = 1, message = "is required"))]
    pub customer_name: Option<String>,

    #[validate(required(message = "is required"), length(min = 1, message = "is required"))]
    pub mobile: Option<String>,

    #[validate(required(message = "is required"), length(min = 1, message = "is required"))]
    pub delivery_address: Option<String>,

    #[validate(
        required(message = "is required"),
        range(min = 0.0, message = "must not be negative")
    )]
    pub total_amount: Option<f64>,

    #[validate(required(message = "is required"), length(min = 1, message = "is required"))]
    pub status: Option<String>,

    #[validate(required(message = "is required"))]
    pub order_date: Option<Value>,

    #[validate(required(message = "is required"))]
    pub expected_delivery_date: Option<Value>,

    pub actual_delivery_date: Option<Value>,

    #[validate(range(min = 0, message = "must not be negative"))]
    pub aging_days: Option<i64>,

    pub is_delayed: Option<bool>,

    #[validate(required(message = "is required"), length(min = 1, message = "is required"))]
    pub payment_status: Option<String>,

    pub invoice_number: Option<String>,

    #[validate(required(message = "is required"), length(min = 1, message = "is required"))]
    pub assigned_to: Option<String>,

    pub remarks: Option<String>,

    #[serde(default)]
    #[validate(length(min = 1, message = "must contain at least one item"), nested)]
    pub products: Vec<LineItemRequest>,
}

/// One requested line item
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub product_id: String,

    #[validate(length(min = 1, message = "is required"))]
    pub product_name: String,

    #[validate(custom(function = "positive_quantity"))]
    pub quantity: Decimal,

    pub unit: Option<String>,

    #[validate(range(exclusive_min = 0.0, message = "must be greater than zero"))]
    pub unit_price: f64,

    pub total_price: f64,
}

fn positive_quantity(quantity: &Decimal) -> Result<(), validator::ValidationError> {
    if *quantity > Decimal::ZERO {
        Ok(())
    } else {
        Err(validator::ValidationError::new("range")
            .with_message(Cow::Borrowed("must be greater than zero")))
    }
}

impl CreateOrderRequest {
    /// Validate every field and normalize dates
    ///
    /// All field violations are collected into a single
    /// [`ValidationError::FieldErrors`]. Date parsing runs only after the shape
    /// is valid, so a request never reaches storage with an unparseable
    /// `orderDate` or `expectedDeliveryDate`.
    pub fn into_new_order(self) -> CrmResult<NewOrder> {
        if let Err(errors) = self.validate() {
            return Err(ValidationError::FieldErrors(collect_field_errors(&errors)).into());
        }

        let order_date = required_date("orderDate", self.order_date.as_ref())?;
        let expected_delivery_date =
            required_date("expectedDeliveryDate", self.expected_delivery_date.as_ref())?;

        let actual_delivery_date = match dates::parse_json_date(self.actual_delivery_date.as_ref())
        {
            Ok(instant) => instant,
            Err(e) => {
                tracing::warn!(
                    field = "actualDeliveryDate",
                    error = %e,
                    "ignoring unparseable optional date"
                );
                None
            }
        };

        // validate() guarantees presence of the required fields
        let (
            Some(id),
            Some(customer_name),
            Some(mobile),
            Some(delivery_address),
            Some(total_amount),
            Some(status),
            Some(payment_status),
            Some(assigned_to),
        ) = (
            self.id,
            self.customer_name,
            self.mobile,
            self.delivery_address,
            self.total_amount,
            self.status,
            self.payment_status,
            self.assigned_to,
        )
        else {
            return Err(ValidationError::FieldError {
                field: "order".to_string(),
                message: "missing required fields".to_string(),
            }
            .into());
        };

        Ok(NewOrder {
            id,
            lead_id: non_empty(self.lead_id),
            call_id: non_empty(self.call_id),
            customer_name,
            mobile,
            delivery_address,
            total_amount,
            status,
            order_date,
            expected_delivery_date,
            actual_delivery_date,
            aging_days: self.aging_days.unwrap_or(0),
            is_delayed: self.is_delayed.unwrap_or(false),
            payment_status,
            invoice_number: non_empty(self.invoice_number),
            assigned_to,
            remarks: self.remarks,
            line_items: self
                .products
                .into_iter()
                .map(|item| NewLineItem {
                    product_id: item.product_id,
                    product_name: item.product_name,
                    quantity: item.quantity,
                    unit: item.unit,
                    unit_price: item.unit_price,
                    total_price: item.total_price,
                })
                .collect(),
        })
    }
}

fn required_date(field: &str, value: Option<&Value>) -> CrmResult<DateTime<Utc>> {
    match dates::parse_json_date(value) {
        Ok(Some(instant)) => Ok(instant),
        Ok(None) => Err(ValidationError::FieldError {
            field: field.to_string(),
            message: "is required".to_string(),
        }
        .into()),
        Err(source) => Err(ValidationError::InvalidDate {
            field: field.to_string(),
            source,
        }
        .into()),
    }
}

/// Empty optional references are stored as NULL
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

// =============================================================================
// Validation error flattening
// =============================================================================

/// Flatten nested validator output into sorted `field: message` pairs
///
/// Paths use the external field names, e.g. `products[1].unitPrice`.
pub fn collect_field_errors(errors: &ValidationErrors) -> Vec<FieldValidationError> {
    let mut out = BTreeMap::new();
    walk_errors(errors, "", &mut out);
    out.into_iter()
        .map(|(field, message)| FieldValidationError { field, message })
        .collect()
}

fn walk_errors(errors: &ValidationErrors, prefix: &str, out: &mut BTreeMap<String, String>) {
    for (name, kind) in errors.errors() {
        let path = format!("{}{}", prefix, camel_case(name));
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(first) = list.first() {
                    let message = first
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| first.code.to_string());
                    out.entry(path).or_insert(message);
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                walk_errors(inner, &format!("{}.", path), out);
            }
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    walk_errors(inner, &format!("{}[{}].", path, index), out);
                }
            }
        }
    }
}

fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

// =============================================================================
// Validated write models
// =============================================================================

/// A validated order ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub id: String,
    pub lead_id: Option<String>,
    pub call_id: Option<String>,
    pub customer_name: String,
    pub mobile: String,
    pub delivery_address: String,
    pub total_amount: f64,
    pub status: String,
    pub order_date: DateTime<Utc>,
    pub expected_delivery_date: DateTime<Utc>,
    pub actual_delivery_date: Option<DateTime<Utc>>,
    pub aging_days: i64,
    pub is_delayed: bool,
    pub payment_status: String,
    pub invoice_number: Option<String>,
    pub assigned_to: String,
    pub remarks: Option<String>,
    pub line_items: Vec<NewLineItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLineItem {
    pub product_id: String,
    pub product_name: String,
    pub quantity: Decimal,
    pub unit: Option<String>,
    pub unit_price: f64,
    pub total_price: f64,
}

// =============================================================================
// Stored models
// =============================================================================

/// Order header as stored
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub lead_id: Option<String>,
    pub call_id: Option<String>,
    pub customer_name: String,
    pub mobile: String,
    pub delivery_address: String,
    pub total_amount: f64,
    pub status: String,
    #[serde(serialize_with = "serialize_instant")]
    pub order_date: DateTime<Utc>,
    #[serde(serialize_with = "serialize_instant")]
    pub expected_delivery_date: DateTime<Utc>,
    #[serde(serialize_with = "serialize_optional_instant")]
    pub actual_delivery_date: Option<DateTime<Utc>>,
    pub aging_days: i64,
    pub is_delayed: bool,
    pub payment_status: String,
    pub invoice_number: Option<String>,
    pub assigned_to: String,
    pub remarks: Option<String>,
    #[serde(serialize_with = "serialize_instant")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_instant")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build the stored header for a new order, stamped at `now`
    ///
    /// Sub-second precision is dropped so that every backend returns the same
    /// instants as a `DATETIME` column would.
    pub fn from_new(order: &NewOrder, now: DateTime<Utc>) -> CrmResult<Self> {
        let truncate = |instant: &DateTime<Utc>| -> Result<DateTime<Utc>, DateError> {
            let literal = dates::to_storage_literal(Some(instant)).unwrap_or_default();
            dates::from_storage_literal(&literal)
        };
        let invalid = |field: &str| {
            let field = field.to_string();
            move |source| ValidationError::InvalidDate { field, source }
        };

        Ok(Order {
            id: order.id.clone(),
            lead_id: order.lead_id.clone(),
            call_id: order.call_id.clone(),
            customer_name: order.customer_name.clone(),
            mobile: order.mobile.clone(),
            delivery_address: order.delivery_address.clone(),
            total_amount: order.total_amount,
            status: order.status.clone(),
            order_date: truncate(&order.order_date).map_err(invalid("orderDate"))?,
            expected_delivery_date: truncate(&order.expected_delivery_date)
                .map_err(invalid("expectedDeliveryDate"))?,
            actual_delivery_date: order
                .actual_delivery_date
                .as_ref()
                .map(truncate)
                .transpose()
                .map_err(invalid("actualDeliveryDate"))?,
            aging_days: order.aging_days,
            is_delayed: order.is_delayed,
            payment_status: order.payment_status.clone(),
            invoice_number: order.invoice_number.clone(),
            assigned_to: order.assigned_to.clone(),
            remarks: order.remarks.clone(),
            created_at: truncate(&now).map_err(invalid("createdAt"))?,
            updated_at: truncate(&now).map_err(invalid("updatedAt"))?,
        })
    }
}

/// Line item as stored
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: i64,
    pub order_id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: Decimal,
    pub unit: Option<String>,
    pub unit_price: f64,
    pub total_price: f64,
}

/// An order header with its line items, as returned by every read
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub products: Vec<LineItem>,
}

/// Inventory record referenced by line items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub price: f64,
    pub available_quantity: Decimal,
    pub threshold_quantity: Decimal,
    pub status: Option<String>,
    pub is_active: bool,
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>, available_quantity: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: None,
            unit: None,
            price: 0.0,
            available_quantity,
            threshold_quantity: Decimal::ZERO,
            status: None,
            is_active: true,
        }
    }
}

fn serialize_instant<S: Serializer>(instant: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&dates::to_iso_string(instant))
}

fn serialize_optional_instant<S: Serializer>(
    instant: &Option<DateTime<Utc>>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match instant {
        Some(instant) => serialize_instant(instant, s),
        None => s.serialize_none(),
    }
}
