//! Postgres payment store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{FromRow, Row};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::error::Result;
use crate::money;
use crate::record::{PayStatus, PaymentRecord};
use crate::store::{PaymentStore, Upserted};

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS payments (
        id            UUID PRIMARY KEY,
        order_id      TEXT NOT NULL,
        payment_id    TEXT UNIQUE,
        signature     TEXT,
        amount        NUMERIC(14, 2) NOT NULL,
        order_items   JSONB NOT NULL DEFAULT '[]'::jsonb,
        user_id       TEXT,
        user_shipping JSONB NOT NULL DEFAULT '{}'::jsonb,
        pay_status    TEXT NOT NULL DEFAULT 'created',
        order_date    TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

const CREATE_USER_INDEX: &str = r#"
    CREATE INDEX IF NOT EXISTS payments_user_order_date_idx
    ON payments (user_id, order_date DESC)
"#;

const COLUMNS: &str =
    "id, order_id, payment_id, signature, amount, order_items, user_id, user_shipping, pay_status, order_date";

#[derive(FromRow)]
struct PaymentRow {
    id: Uuid,
    order_id: String,
    payment_id: Option<String>,
    signature: Option<String>,
    amount: Decimal,
    order_items: Json<Vec<Value>>,
    user_id: Option<String>,
    user_shipping: Json<Value>,
    pay_status: String,
    order_date: DateTime<Utc>,
}

impl From<PaymentRow> for PaymentRecord {
    fn from(row: PaymentRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            payment_id: row.payment_id,
            signature: row.signature,
            amount: row.amount,
            order_items: row.order_items.0,
            user_id: row.user_id,
            user_shipping: row.user_shipping.0,
            pay_status: PayStatus::from(row.pay_status),
            order_date: row.order_date,
        }
    }
}

/// Payment store backed by a Postgres `payments` table
#[derive(Clone)]
pub struct PgPaymentStore {
    pool: PgPool,
}

impl PgPaymentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect, optionally overriding the database named in the URL, and make
    /// sure the schema exists.
    pub async fn connect(database_url: &str, database_name: Option<&str>) -> Result<Self> {
        let mut options = PgConnectOptions::from_str(database_url)?;
        if let Some(name) = database_name {
            options = options.database(name);
        }

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_USER_INDEX).execute(&self.pool).await?;
        tracing::debug!("Payments schema ready");
        Ok(())
    }

    fn record_from(row: &PgRow) -> Result<PaymentRecord> {
        Ok(PaymentRow::from_row(row)?.into())
    }
}

#[async_trait]
impl PaymentStore for PgPaymentStore {
    async fn upsert_by_payment_id(
        &self,
        record: PaymentRecord,
        reported: Option<PayStatus>,
    ) -> Result<Upserted> {
        let sql = format!(
            r#"
            INSERT INTO payments ({COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (payment_id)
            DO UPDATE SET pay_status = COALESCE($11, payments.pay_status)
            RETURNING {COLUMNS}, (xmax = 0) AS created
            "#
        );

        let row = sqlx::query(&sql)
            .bind(record.id)
            .bind(&record.order_id)
            .bind(&record.payment_id)
            .bind(&record.signature)
            .bind(money::round_major(record.amount))
            .bind(Json(&record.order_items))
            .bind(&record.user_id)
            .bind(Json(&record.user_shipping))
            .bind(record.pay_status.as_str())
            .bind(record.order_date)
            .bind(reported.as_ref().map(PayStatus::as_str))
            .fetch_one(&self.pool)
            .await?;

        let created: bool = row.try_get("created")?;
        Ok(Upserted {
            record: Self::record_from(&row)?,
            created,
        })
    }

    async fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<PaymentRecord>> {
        let sql = format!("SELECT {COLUMNS} FROM payments WHERE payment_id = $1");
        let row = sqlx::query(&sql)
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::record_from).transpose()
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<PaymentRecord>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM payments WHERE user_id = $1 ORDER BY order_date DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::record_from).collect()
    }

    async fn list_all(&self) -> Result<Vec<PaymentRecord>> {
        let sql = format!("SELECT {COLUMNS} FROM payments ORDER BY order_date DESC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(Self::record_from).collect()
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
