use crate::error::{BillingError, BillingResult};
use crate::models::{BillStatus, LineItem, NewLineItem};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

/// Result of a successful payment application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PaymentOutcome {
    pub paid_amount: Decimal,
    pub status: BillStatus,
    pub balance: Decimal,
}

/// Price the submitted items and compute the bill total.
///
/// Rejects an empty item list, items without a description, non-positive
/// quantities, and negative unit prices. The computed total is immutable for
/// the lifetime of the bill.
pub fn price_items(items: &[NewLineItem]) -> BillingResult<(Vec<LineItem>, Decimal)> {
    if items.is_empty() {
        return Err(BillingError::validation("Patient ID and items are required"));
    }

    let mut priced = Vec::with_capacity(items.len());
    let mut total_amount = Decimal::ZERO;
    for item in items {
        if item.description.trim().is_empty() {
            return Err(BillingError::validation(
                "Each item must have description, quantity, and unit price",
            ));
        }
        if item.quantity <= Decimal::ZERO {
            return Err(BillingError::validation("Item quantity must be positive"));
        }
        if item.unit_price < Decimal::ZERO {
            return Err(BillingError::validation("Item unit price cannot be negative"));
        }
        let total_price = item.quantity * item.unit_price;
        total_amount += total_price;
        priced.push(LineItem {
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price,
            category: item.category,
        });
    }
    Ok((priced, total_amount))
}

/// Derive the lifecycle status from the paid amount.
///
/// Evaluation order matters: full payment wins over partial, and a zero paid
/// amount always maps back to pending. `Cancelled` is never produced here.
pub fn derive_status(paid_amount: Decimal, total_amount: Decimal) -> BillStatus {
    if paid_amount >= total_amount {
        BillStatus::Paid
    } else if paid_amount > Decimal::ZERO {
        BillStatus::Partial
    } else {
        BillStatus::Pending
    }
}

/// Apply a payment against a bill, replacing its paid amount.
///
/// The new paid amount must be within `0..=total_amount`; anything outside is
/// rejected before any state changes. Cancelled bills refuse payments so that
/// a payment cannot silently resurrect a terminal bill.
pub fn apply_payment(
    total_amount: Decimal,
    current_status: BillStatus,
    paid_amount: Decimal,
) -> BillingResult<PaymentOutcome> {
    if paid_amount < Decimal::ZERO {
        return Err(BillingError::validation("Valid paid amount is required"));
    }
    if current_status == BillStatus::Cancelled {
        return Err(BillingError::invalid_payment(
            "Cannot record a payment on a cancelled bill",
        ));
    }
    if paid_amount > total_amount {
        tracing::debug!(%paid_amount, %total_amount, "payment rejected: exceeds total");
        return Err(BillingError::invalid_payment(
            "Paid amount cannot exceed total amount",
        ));
    }
    Ok(PaymentOutcome {
        paid_amount,
        status: derive_status(paid_amount, total_amount),
        balance: total_amount - paid_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemCategory;
    use rust_decimal_macros::dec;

    fn item(description: &str, quantity: Decimal, unit_price: Decimal) -> NewLineItem {
        NewLineItem {
            description: description.to_string(),
            quantity,
            unit_price,
            category: ItemCategory::Other,
        }
    }

    #[test]
    fn prices_items_and_sums_total() {
        let (priced, total) = price_items(&[
            item("Consultation", dec!(1), dec!(100)),
            item("Paracetamol", dec!(3), dec!(2.50)),
        ])
        .unwrap();

        assert_eq!(priced.len(), 2);
        assert_eq!(priced[0].total_price, dec!(100));
        assert_eq!(priced[1].total_price, dec!(7.50));
        assert_eq!(total, dec!(107.50));
    }

    #[test]
    fn rejects_empty_item_list() {
        assert!(matches!(
            price_items(&[]),
            Err(BillingError::Validation(_))
        ));
    }

    #[test]
    fn rejects_blank_description() {
        let err = price_items(&[item("  ", dec!(1), dec!(10))]).unwrap_err();
        assert!(matches!(err, BillingError::Validation(_)));
    }

    #[test]
    fn rejects_non_positive_quantity() {
        assert!(price_items(&[item("X-ray", dec!(0), dec!(10))]).is_err());
        assert!(price_items(&[item("X-ray", dec!(-1), dec!(10))]).is_err());
    }

    #[test]
    fn rejects_negative_unit_price() {
        assert!(price_items(&[item("X-ray", dec!(1), dec!(-0.01))]).is_err());
        // Zero-price items are allowed (complimentary entries).
        assert!(price_items(&[item("Follow-up", dec!(1), dec!(0))]).is_ok());
    }

    #[test]
    fn status_derivation_order() {
        assert_eq!(derive_status(dec!(100), dec!(100)), BillStatus::Paid);
        assert_eq!(derive_status(dec!(150), dec!(100)), BillStatus::Paid);
        assert_eq!(derive_status(dec!(0.01), dec!(100)), BillStatus::Partial);
        assert_eq!(derive_status(dec!(99.99), dec!(100)), BillStatus::Partial);
        assert_eq!(derive_status(dec!(0), dec!(100)), BillStatus::Pending);
    }

    #[test]
    fn full_payment_settles_the_bill() {
        let outcome = apply_payment(dec!(100), BillStatus::Pending, dec!(100)).unwrap();
        assert_eq!(outcome.status, BillStatus::Paid);
        assert_eq!(outcome.paid_amount, dec!(100));
        assert_eq!(outcome.balance, dec!(0));
    }

    #[test]
    fn partial_payment_leaves_a_balance() {
        let outcome = apply_payment(dec!(100), BillStatus::Pending, dec!(40)).unwrap();
        assert_eq!(outcome.status, BillStatus::Partial);
        assert_eq!(outcome.balance, dec!(60));
    }

    #[test]
    fn zero_payment_keeps_bill_pending() {
        let outcome = apply_payment(dec!(100), BillStatus::Partial, dec!(0)).unwrap();
        assert_eq!(outcome.status, BillStatus::Pending);
        assert_eq!(outcome.balance, dec!(100));
    }

    #[test]
    fn overpayment_is_rejected_before_mutation() {
        let err = apply_payment(dec!(100), BillStatus::Pending, dec!(150)).unwrap_err();
        assert_eq!(
            err,
            BillingError::InvalidPayment("Paid amount cannot exceed total amount".to_string())
        );
    }

    #[test]
    fn negative_payment_is_rejected() {
        assert!(matches!(
            apply_payment(dec!(100), BillStatus::Pending, dec!(-5)),
            Err(BillingError::Validation(_))
        ));
    }

    #[test]
    fn cancelled_bills_refuse_payments() {
        assert!(matches!(
            apply_payment(dec!(100), BillStatus::Cancelled, dec!(50)),
            Err(BillingError::InvalidPayment(_))
        ));
    }

    // Scenario from the billing requirements: a single consultation at 100.
    #[test]
    fn consultation_scenario() {
        let (items, total) = price_items(&[item("Consult", dec!(1), dec!(100))]).unwrap();
        assert_eq!(total, dec!(100));
        assert_eq!(items[0].total_price, dec!(100));
        assert_eq!(derive_status(dec!(0), total), BillStatus::Pending);

        let paid = apply_payment(total, BillStatus::Pending, dec!(100)).unwrap();
        assert_eq!(paid.status, BillStatus::Paid);
        assert_eq!(paid.balance, dec!(0));

        // A fresh identical bill must reject an overpayment outright.
        assert!(apply_payment(total, BillStatus::Pending, dec!(150)).is_err());
    }
}
