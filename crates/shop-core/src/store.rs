//! Payment Record Store
//!
//! Both the verification path and the webhook path write through
//! [`PaymentStore::upsert_by_payment_id`], a single atomic
//! "insert if absent, else update status" operation keyed by payment id.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::money;
use crate::record::{PayStatus, PaymentRecord};

/// Result of an upsert
#[derive(Clone, Debug, PartialEq)]
pub struct Upserted {
    /// The record as stored after the write
    pub record: PaymentRecord,

    /// True when a new record was inserted, false when an existing one was updated
    pub created: bool,
}

/// Payment storage trait
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Insert `record` unless a record with the same payment id exists. When
    /// one exists, only its status is replaced by `reported` (kept when
    /// `None`); every other field of the stored record is left untouched.
    ///
    /// Records without a payment id are always inserted. Inserted amounts
    /// are rounded with [`money::round_major`].
    async fn upsert_by_payment_id(
        &self,
        record: PaymentRecord,
        reported: Option<PayStatus>,
    ) -> Result<Upserted>;

    /// Get record by payment id
    async fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<PaymentRecord>>;

    /// All records of one user, newest first
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<PaymentRecord>>;

    /// All records, newest first
    async fn list_all(&self) -> Result<Vec<PaymentRecord>>;

    /// Backend name, for health output
    fn backend(&self) -> &'static str;
}

#[derive(Default)]
struct Records {
    records: Vec<PaymentRecord>,
    by_payment: HashMap<String, usize>,
}

/// In-memory payment store (for development and tests)
pub struct MemoryPaymentStore {
    inner: RwLock<Records>,
}

impl Default for MemoryPaymentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPaymentStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Records::default()),
        }
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Ties go to the later insert
fn newest_first(mut records: Vec<PaymentRecord>) -> Vec<PaymentRecord> {
    records.reverse();
    records.sort_by(|a, b| b.order_date.cmp(&a.order_date));
    records
}

#[async_trait]
impl PaymentStore for MemoryPaymentStore {
    async fn upsert_by_payment_id(
        &self,
        mut record: PaymentRecord,
        reported: Option<PayStatus>,
    ) -> Result<Upserted> {
        record.amount = money::round_major(record.amount);
        let mut inner = self.inner.write().await;

        if let Some(payment_id) = record.payment_id.as_deref() {
            if let Some(&index) = inner.by_payment.get(payment_id) {
                let existing = &mut inner.records[index];
                if let Some(status) = reported {
                    existing.pay_status = status;
                }
                return Ok(Upserted {
                    record: existing.clone(),
                    created: false,
                });
            }
        }

        let index = inner.records.len();
        if let Some(payment_id) = record.payment_id.clone() {
            inner.by_payment.insert(payment_id, index);
        }
        inner.records.push(record.clone());

        Ok(Upserted {
            record,
            created: true,
        })
    }

    async fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<PaymentRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_payment
            .get(payment_id)
            .map(|&index| inner.records[index].clone()))
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<PaymentRecord>> {
        let inner = self.inner.read().await;
        let records = inner
            .records
            .iter()
            .filter(|r| r.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect();
        Ok(newest_first(records))
    }

    async fn list_all(&self) -> Result<Vec<PaymentRecord>> {
        let inner = self.inner.read().await;
        Ok(newest_first(inner.records.clone()))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
