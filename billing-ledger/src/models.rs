use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Lifecycle state of a bill.
///
/// `Paid`/`Partial`/`Pending` are derived from the paid amount;
/// `Cancelled` is only reachable through an explicit status update.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum BillStatus {
    Pending,
    Partial,
    Paid,
    Cancelled,
}

impl BillStatus {
    pub const ALL: [BillStatus; 4] = [
        BillStatus::Pending,
        BillStatus::Partial,
        BillStatus::Paid,
        BillStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BillStatus::Pending => "pending",
            BillStatus::Partial => "partial",
            BillStatus::Paid => "paid",
            BillStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(BillStatus::Pending),
            "partial" => Some(BillStatus::Partial),
            "paid" => Some(BillStatus::Paid),
            "cancelled" => Some(BillStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category tag of one priced charge entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum ItemCategory {
    Consultation,
    Medicine,
    Test,
    Procedure,
    #[default]
    Other,
}

impl ItemCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemCategory::Consultation => "consultation",
            ItemCategory::Medicine => "medicine",
            ItemCategory::Test => "test",
            ItemCategory::Procedure => "procedure",
            ItemCategory::Other => "other",
        }
    }
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unpriced charge entry as submitted at bill creation.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewLineItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub category: ItemCategory,
}

/// Priced charge entry: `total_price = quantity * unit_price`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LineItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub category: ItemCategory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_round_trips() {
        for status in BillStatus::ALL {
            assert_eq!(BillStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn unknown_status_rejected() {
        assert_eq!(BillStatus::parse("refunded"), None);
        assert_eq!(BillStatus::parse("PAID"), None);
        assert_eq!(BillStatus::parse(""), None);
    }

    #[test]
    fn category_defaults_to_other() {
        assert_eq!(ItemCategory::default(), ItemCategory::Other);
    }
}
