//! Whitelisted partial updates
//!
//! Update endpoints accept an arbitrary JSON object. Only the fields listed in
//! an entity's whitelist survive; each one is mapped to its storage column and
//! rendered as a `column = ?` assignment. The identifier column is never on a
//! whitelist, so it cannot be reassigned through an update.

use crate::core::error::ValidationError;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Entities that support whitelisted partial updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    CallLogs,
    Leads,
    Orders,
    Products,
    Tasks,
    Customers,
}

/// Storage type of a column, used to coerce incoming JSON values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    /// Non-negative number
    Number,
    Boolean,
    DateTime,
}

/// One whitelist entry: external (camelCase) field name and its column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: &'static str,
    pub column: &'static str,
    pub kind: ColumnKind,
}

const fn col(field: &'static str, column: &'static str, kind: ColumnKind) -> FieldSpec {
    FieldSpec {
        field,
        column,
        kind,
    }
}

use ColumnKind::{Boolean, DateTime, Number, Text};

const CALL_LOG_FIELDS: &[FieldSpec] = &[
    col("callDate", "call_date", DateTime),
    col("customerName", "customer_name", Text),
    col("mobile", "mobile", Text),
    col("queryType", "query_type", Text),
    col("productInterest", "product_interest", Text),
    col("nextAction", "next_action", Text),
    col("followUpDate", "follow_up_date", DateTime),
    col("remarks", "remarks", Text),
    col("assignedTo", "assigned_to", Text),
    col("status", "status", Text),
];

const LEAD_FIELDS: &[FieldSpec] = &[
    col("callId", "call_id", Text),
    col("customerName", "customer_name", Text),
    col("mobile", "mobile", Text),
    col("email", "email", Text),
    col("address", "address", Text),
    col("productInterest", "product_interest", Text),
    col("plannedPurchaseQuantity", "planned_purchase_quantity", Number),
    col("status", "status", Text),
    col("createdDate", "created_date", DateTime),
    col("agingDays", "aging_days", Number),
    col("agingBucket", "aging_bucket", Text),
    col("lastFollowUp", "last_follow_up", DateTime),
    col("nextFollowUp", "next_follow_up", DateTime),
    col("assignedTo", "assigned_to", Text),
    col("estimatedValue", "estimated_value", Number),
    col("remarks", "remarks", Text),
];

const ORDER_FIELDS: &[FieldSpec] = &[
    col("leadId", "lead_id", Text),
    col("callId", "call_id", Text),
    col("customerName", "customer_name", Text),
    col("mobile", "mobile", Text),
    col("deliveryAddress", "delivery_address", Text),
    col("totalAmount", "total_amount", Number),
    col("status", "status", Text),
    col("orderDate", "order_date", DateTime),
    col("expectedDeliveryDate", "expected_delivery_date", DateTime),
    col("actualDeliveryDate", "actual_delivery_date", DateTime),
    col("agingDays", "aging_days", Number),
    col("isDelayed", "is_delayed", Boolean),
    col("paymentStatus", "payment_status", Text),
    col("invoiceNumber", "invoice_number", Text),
    col("assignedTo", "assigned_to", Text),
    col("remarks", "remarks", Text),
];

const PRODUCT_FIELDS: &[FieldSpec] = &[
    col("name", "name", Text),
    col("category", "category", Text),
    col("unit", "unit", Text),
    col("price", "price", Number),
    col("availableQuantity", "available_quantity", Number),
    col("thresholdQuantity", "threshold_quantity", Number),
    col("status", "status", Text),
    col("isActive", "is_active", Boolean),
];

const TASK_FIELDS: &[FieldSpec] = &[
    col("type", "type", Text),
    col("linkedTo", "linked_to", Text),
    col("linkedId", "linked_id", Text),
    col("customerName", "customer_name", Text),
    col("dueDate", "due_date", DateTime),
    col("status", "status", Text),
    col("assignedTo", "assigned_to", Text),
    col("remarks", "remarks", Text),
];

const CUSTOMER_FIELDS: &[FieldSpec] = &[
    col("name", "name", Text),
    col("mobile", "mobile", Text),
    col("email", "email", Text),
    col("address", "address", Text),
    col("totalOrders", "total_orders", Number),
    col("totalValue", "total_value", Number),
];

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::CallLogs,
        EntityKind::Leads,
        EntityKind::Orders,
        EntityKind::Products,
        EntityKind::Tasks,
        EntityKind::Customers,
    ];

    /// Name used by API callers (`callLogs`, `orders`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::CallLogs => "callLogs",
            EntityKind::Leads => "leads",
            EntityKind::Orders => "orders",
            EntityKind::Products => "products",
            EntityKind::Tasks => "tasks",
            EntityKind::Customers => "customers",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::CallLogs => "call_logs",
            EntityKind::Leads => "leads",
            EntityKind::Orders => "orders",
            EntityKind::Products => "products",
            EntityKind::Tasks => "tasks",
            EntityKind::Customers => "customers",
        }
    }

    pub fn whitelist(&self) -> &'static [FieldSpec] {
        match self {
            EntityKind::CallLogs => CALL_LOG_FIELDS,
            EntityKind::Leads => LEAD_FIELDS,
            EntityKind::Orders => ORDER_FIELDS,
            EntityKind::Products => PRODUCT_FIELDS,
            EntityKind::Tasks => TASK_FIELDS,
            EntityKind::Customers => CUSTOMER_FIELDS,
        }
    }

    fn lookup(&self, field: &str) -> Option<&'static FieldSpec> {
        self.whitelist().iter().find(|entry| entry.field == field)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ValidationError;

    /// Accepts both the API name and the table name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s || kind.table() == s)
            .ok_or_else(|| ValidationError::UnknownEntity {
                entity: s.to_string(),
            })
    }
}

/// An accepted field together with its (not yet coerced) value
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAssignment {
    pub field: &'static str,
    pub column: &'static str,
    pub kind: ColumnKind,
    pub value: Value,
}

/// The accepted subset of an update payload, in payload order
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdates {
    entity: EntityKind,
    assignments: Vec<FieldAssignment>,
}

impl FieldUpdates {
    pub fn entity(&self) -> EntityKind {
        self.entity
    }

    pub fn assignments(&self) -> &[FieldAssignment] {
        &self.assignments
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn columns(&self) -> Vec<&'static str> {
        self.assignments.iter().map(|a| a.column).collect()
    }

    /// Positional values, in the same order as the placeholders of [`set_clause`](Self::set_clause)
    pub fn values(&self) -> Vec<&Value> {
        self.assignments.iter().map(|a| &a.value).collect()
    }

    /// `col_a = ?, col_b = ?`
    pub fn set_clause(&self) -> String {
        self.assignments
            .iter()
            .map(|a| format!("{} = ?", a.column))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Rewrite every value through `f`, keeping columns and order intact
    pub fn try_map_values<E>(
        self,
        mut f: impl FnMut(&FieldAssignment) -> Result<Value, E>,
    ) -> Result<Self, E> {
        let mut assignments = Vec::with_capacity(self.assignments.len());
        for assignment in self.assignments {
            let value = f(&assignment)?;
            assignments.push(FieldAssignment {
                value,
                ..assignment
            });
        }
        Ok(Self {
            entity: self.entity,
            assignments,
        })
    }
}

/// Keep only whitelisted fields of `updates`.
///
/// Returns `None` when nothing survives so callers can skip the write entirely.
pub fn validate_and_convert_fields(
    entity: EntityKind,
    updates: &Map<String, Value>,
) -> Option<FieldUpdates> {
    let assignments: Vec<FieldAssignment> = updates
        .iter()
        .filter_map(|(field, value)| {
            entity.lookup(field).map(|entry| FieldAssignment {
                field: entry.field,
                column: entry.column,
                kind: entry.kind,
                value: value.clone(),
            })
        })
        .collect();

    if assignments.is_empty() {
        None
    } else {
        Some(FieldUpdates {
            entity,
            assignments,
        })
    }
}
