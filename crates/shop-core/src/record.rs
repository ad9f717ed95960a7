//! Payment Records
//!
//! One record per captured or attempted payment. Records are written by the
//! verification and webhook paths and never deleted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::money;

/// Payment status as reported by the gateway.
///
/// Known values get their own variant; anything else the gateway reports is
/// carried through verbatim.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PayStatus {
    #[default]
    Created,
    Authorized,
    Captured,
    Paid,
    Failed,
    Other(String),
}

impl PayStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PayStatus::Created => "created",
            PayStatus::Authorized => "authorized",
            PayStatus::Captured => "captured",
            PayStatus::Paid => "paid",
            PayStatus::Failed => "failed",
            PayStatus::Other(s) => s,
        }
    }

    /// Whether the money has been taken from the customer
    pub fn is_settled(&self) -> bool {
        matches!(self, PayStatus::Captured | PayStatus::Paid)
    }
}

impl From<&str> for PayStatus {
    fn from(s: &str) -> Self {
        match s {
            "created" => PayStatus::Created,
            "authorized" => PayStatus::Authorized,
            "captured" => PayStatus::Captured,
            "paid" => PayStatus::Paid,
            "failed" => PayStatus::Failed,
            other => PayStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for PayStatus {
    fn from(s: String) -> Self {
        PayStatus::from(s.as_str())
    }
}

impl From<PayStatus> for String {
    fn from(status: PayStatus) -> Self {
        match status {
            PayStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for PayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored payment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    /// Store identity
    pub id: Uuid,

    /// Gateway order identifier
    pub order_id: String,

    /// Gateway payment identifier (the reconciliation key)
    #[serde(default)]
    pub payment_id: Option<String>,

    /// Hex HMAC digest the record was accepted with
    #[serde(default)]
    pub signature: Option<String>,

    /// Amount in major currency units
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,

    /// Line-item snapshots, in cart order
    #[serde(default)]
    pub order_items: Vec<Value>,

    /// Purchaser, when known
    #[serde(default)]
    pub user_id: Option<String>,

    /// Shipping address snapshot
    #[serde(default = "empty_object")]
    pub user_shipping: Value,

    #[serde(default)]
    pub pay_status: PayStatus,

    /// Set once at creation
    pub order_date: DateTime<Utc>,
}

impl PaymentRecord {
    /// Create a record for an order with default status and empty snapshots.
    /// The amount is rounded to whole minor units.
    pub fn new(order_id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id: order_id.into(),
            payment_id: None,
            signature: None,
            amount: money::round_major(amount),
            order_items: Vec::new(),
            user_id: None,
            user_shipping: empty_object(),
            pay_status: PayStatus::default(),
            order_date: Utc::now(),
        }
    }
}

/// An empty JSON object, the default shipping snapshot
pub fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Re-parse a shipping snapshot that travelled through gateway notes as a
/// JSON string. Anything that is not a JSON object yields `{}`.
pub fn shipping_from_note(note: Option<&str>) -> Value {
    note.and_then(|raw| serde_json::from_str::<Value>(raw).ok())
        .filter(Value::is_object)
        .unwrap_or_else(empty_object)
}

/// Re-parse a cart snapshot from gateway notes. Anything that is not a JSON
/// array yields no items.
pub fn items_from_note(note: Option<&str>) -> Vec<Value> {
    match note.and_then(|raw| serde_json::from_str::<Value>(raw).ok()) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}
