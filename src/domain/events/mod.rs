//! Domain events published to NATS as JSON.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderCreated {
        order_id: Uuid,
        order_number: String,
        total: i64,
        currency: String,
    },
    OrderStatusChanged {
        order_id: Uuid,
        order_number: String,
        status: String,
        payment_status: String,
    },
    PaymentRecorded {
        order_id: Uuid,
        transaction_id: String,
        amount: i64,
        currency: String,
    },
    StockCommitted {
        order_id: Uuid,
    },
    StockRestored {
        order_id: Uuid,
    },
}

impl DomainEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            Self::OrderCreated { .. } => "storefront.orders.created",
            Self::OrderStatusChanged { .. } => "storefront.orders.status_changed",
            Self::PaymentRecorded { .. } => "storefront.payments.recorded",
            Self::StockCommitted { .. } => "storefront.stock.committed",
            Self::StockRestored { .. } => "storefront.stock.restored",
        }
    }
}
