//! # shop-core
//!
//! Payment record model, money and signature primitives, and the store and
//! gateway abstractions shared by the storefront payment flow.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │           checkout  ·  verify  ·  webhook (shop-payments)   │
//! │  ┌──────────────────────┐        ┌───────────────────────┐  │
//! │  │   PaymentGateway     │        │     PaymentStore      │  │
//! │  │   (Strategy)         │        │  upsert by paymentId  │  │
//! │  └──────────────────────┘        └───────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Amounts are major units everywhere except on [`gateway`] types, which
//! mirror the provider's minor-unit wire format.

pub mod error;
pub mod gateway;
pub mod money;
pub mod record;
pub mod signature;
pub mod store;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use error::{CoreError, Result};
pub use gateway::{GatewayOrder, GatewayPayment, OrderNotes, OrderRequest, PaymentGateway, PaymentNotes};
pub use record::{PayStatus, PaymentRecord};
pub use store::{MemoryPaymentStore, PaymentStore, Upserted};

#[cfg(feature = "postgres")]
pub use postgres::PgPaymentStore;
