//! Notification records emitted after sale state transitions.

use chrono::{DateTime, Utc};
use common::{ProductId, SaleId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Sale;

/// What kind of change a [`SaleEvent::SaleModified`] record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleModification {
    /// Only header fields changed.
    HeaderUpdated,

    /// A new line item was added.
    ItemAdded,

    /// An existing line item was repriced.
    ItemModified,

    /// Header and items were updated together.
    ItemsChanged,
}

/// Immutable records describing something that happened to a sale.
///
/// Each record carries a snapshot of the sale taken right after the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SaleEvent {
    /// A sale was created.
    SaleCreated {
        sale: Sale,
        occurred_at: DateTime<Utc>,
    },

    /// A sale's header or items changed.
    SaleModified {
        sale: Sale,
        modification: SaleModification,
        occurred_at: DateTime<Utc>,
    },

    /// A sale was cancelled.
    SaleCancelled {
        sale: Sale,
        cancelled_amount: Decimal,
        reason: Option<String>,
        occurred_at: DateTime<Utc>,
    },

    /// A single line item was cancelled.
    ItemCancelled {
        sale: Sale,
        product_id: ProductId,
        cancelled_amount: Decimal,
        occurred_at: DateTime<Utc>,
    },
}

impl SaleEvent {
    /// Creates a SaleCreated record.
    pub fn sale_created(sale: &Sale) -> Self {
        SaleEvent::SaleCreated {
            sale: sale.clone(),
            occurred_at: Utc::now(),
        }
    }

    /// Creates a SaleModified record.
    pub fn sale_modified(sale: &Sale, modification: SaleModification) -> Self {
        SaleEvent::SaleModified {
            sale: sale.clone(),
            modification,
            occurred_at: Utc::now(),
        }
    }

    /// Creates a SaleCancelled record. The cancelled amount is the sale's
    /// last computed total.
    pub fn sale_cancelled(sale: &Sale, reason: Option<String>) -> Self {
        SaleEvent::SaleCancelled {
            sale: sale.clone(),
            cancelled_amount: sale.total_amount(),
            reason,
            occurred_at: Utc::now(),
        }
    }

    /// Creates an ItemCancelled record.
    pub fn item_cancelled(sale: &Sale, product_id: ProductId, cancelled_amount: Decimal) -> Self {
        SaleEvent::ItemCancelled {
            sale: sale.clone(),
            product_id,
            cancelled_amount,
            occurred_at: Utc::now(),
        }
    }

    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            SaleEvent::SaleCreated { .. } => "SaleCreated",
            SaleEvent::SaleModified { .. } => "SaleModified",
            SaleEvent::SaleCancelled { .. } => "SaleCancelled",
            SaleEvent::ItemCancelled { .. } => "ItemCancelled",
        }
    }

    /// Returns the snapshot of the affected sale.
    pub fn sale(&self) -> &Sale {
        match self {
            SaleEvent::SaleCreated { sale, .. }
            | SaleEvent::SaleModified { sale, .. }
            | SaleEvent::SaleCancelled { sale, .. }
            | SaleEvent::ItemCancelled { sale, .. } => sale,
        }
    }

    pub fn sale_id(&self) -> SaleId {
        self.sale().id()
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SaleEvent::SaleCreated { occurred_at, .. }
            | SaleEvent::SaleModified { occurred_at, .. }
            | SaleEvent::SaleCancelled { occurred_at, .. }
            | SaleEvent::ItemCancelled { occurred_at, .. } => *occurred_at,
        }
    }
}
