//! Orders & Contacts
//!
//! Order record produced by checkout plus the durable-store traits the
//! engine writes through. The spreadsheet implementation lives in the
//! `sheets` module.

use crate::shop::session::CartLine;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Order lifecycle status. Only the initial state is modeled; fulfillment
/// happens outside this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
}

impl OrderStatus {
    /// Wire/spreadsheet representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pendiente",
        }
    }
}

/// One checkout's worth of cart, frozen at confirmation time.
#[derive(Debug, Clone)]
pub struct Order {
    /// Time-based id, unique within the process.
    pub id: String,
    pub client_id: String,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<CartLine>,
    pub total: f64,
    pub status: OrderStatus,
}

impl Order {
    /// Snapshot the given cart into a pending order stamped with the
    /// current time.
    pub fn from_cart(client_id: &str, lines: Vec<CartLine>) -> Self {
        let now = Utc::now();
        let total = lines.iter().map(|l| l.subtotal()).sum();
        Self {
            id: now.timestamp_millis().to_string(),
            client_id: client_id.to_string(),
            created_at: now,
            lines,
            total,
            status: OrderStatus::Pending,
        }
    }
}

/// Durable order/stock store.
#[async_trait]
pub trait OrderSink: Send + Sync {
    /// Append the order to the system of record. Must be atomic from the
    /// caller's perspective: on error nothing is considered written.
    async fn append_order(&self, order: &Order) -> anyhow::Result<()>;

    /// Overwrite a product's stock count. Called once per order line after
    /// a successful append; failures are logged by the caller and never
    /// roll the order back.
    async fn update_stock(&self, product_id: &str, new_quantity: u32) -> anyhow::Result<()>;
}

/// Contact upsert, fire-and-forget from the storefront's perspective.
#[async_trait]
pub trait ContactRegistry: Send + Sync {
    /// Register the phone/name pair unless already present. Idempotent.
    async fn ensure_contact(&self, phone: &str, name: &str) -> anyhow::Result<()>;
}
