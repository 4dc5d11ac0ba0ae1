// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Invoice lifecycle and payment application.
//!
//! Implemented State Machine
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use rust_decimal_macros::dec;
//! use invoice_ledger_rs::{CustomerId, Invoice, InvoiceId, InvoiceStatus};
//!
//! let invoice = Invoice::new(
//!     InvoiceId(1),
//!     CustomerId(1),
//!     dec!(1000.00),
//!     "USD",
//!     Utc::now(),
//!     Utc::now(),
//! )
//! .unwrap();
//! assert_eq!(invoice.status(), InvoiceStatus::Draft);
//! ```

use crate::base::{CustomerId, InvoiceId, PaymentId};
use crate::error::LedgerError;
use crate::payment::Payment;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Invoice lifecycle status.
///
//  DRAFT ──post──► PENDING ──payments cover amount──► PAID
//    │                │
//    └──delete        └──void──► VOID
//
/// `Paid` and `Void` are terminal; no operation ever re-enters `Draft`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InvoiceStatus {
    Draft,
    Pending,
    Paid,
    Void,
}

impl InvoiceStatus {
    /// Terminal statuses accept no further mutation of any kind.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Paid | Self::Void)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The persisted representation: literal uppercase strings.
        let literal = match self {
            Self::Draft => "DRAFT",
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Void => "VOID",
        };
        f.write_str(literal)
    }
}

/// Stored column scale for all money amounts.
pub(crate) const MONEY_SCALE: u32 = 2;

/// Normalizes an amount to the stored scale: banker's rounding to two
/// fractional digits, then padding so the scale is exactly two.
pub(crate) fn to_money(amount: Decimal) -> Decimal {
    let mut money = amount.round_dp(MONEY_SCALE);
    money.rescale(MONEY_SCALE);
    money
}

#[derive(Debug)]
struct InvoiceData {
    id: InvoiceId,
    customer_id: CustomerId,
    amount: Decimal,
    currency: String,
    issued_at: DateTime<Utc>,
    due_at: DateTime<Utc>,
    status: InvoiceStatus,
    /// Owned payments, in recording order. Snapshots re-sort by `paid_at`.
    payments: Vec<Payment>,
}

impl InvoiceData {
    fn assert_invariants(&self) {
        debug_assert!(
            self.amount > Decimal::ZERO,
            "Invariant violated: invoice amount must stay positive: {}",
            self.amount
        );
        debug_assert!(
            self.total_paid() <= self.amount,
            "Invariant violated: recorded payments {} exceed invoice amount {}",
            self.total_paid(),
            self.amount
        );
    }

    fn total_paid(&self) -> Decimal {
        self.payments.iter().map(|payment| payment.amount).sum()
    }

    /// DRAFT → PENDING.
    fn post(&mut self) -> Result<(), LedgerError> {
        match self.status {
            InvoiceStatus::Draft => {
                self.status = InvoiceStatus::Pending;
                Ok(())
            }
            current => Err(LedgerError::PostRequiresDraft(current)),
        }
    }

    /// PENDING → VOID. Drafts are deleted instead, and terminal statuses stay put.
    fn void(&mut self) -> Result<(), LedgerError> {
        match self.status {
            InvoiceStatus::Pending => {
                self.status = InvoiceStatus::Void;
                Ok(())
            }
            InvoiceStatus::Paid => Err(LedgerError::VoidPaid),
            InvoiceStatus::Void => Err(LedgerError::AlreadyVoid),
            InvoiceStatus::Draft => Err(LedgerError::VoidDraft),
        }
    }

    /// Applies a payment after checking every business rule, flipping the
    /// invoice to PAID when the cumulative total covers the amount.
    fn record_payment(
        &mut self,
        id: PaymentId,
        amount: Decimal,
        paid_at: DateTime<Utc>,
    ) -> Result<Payment, LedgerError> {
        match self.status {
            InvoiceStatus::Draft => return Err(LedgerError::PaymentOnDraft),
            InvoiceStatus::Paid | InvoiceStatus::Void => {
                return Err(LedgerError::PaymentNotAccepted(self.status));
            }
            InvoiceStatus::Pending => {}
        }

        let amount = to_money(amount);
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }

        let total_paid = self.total_paid();
        let remaining = self.amount - total_paid;
        if amount > remaining {
            return Err(LedgerError::ExceedsRemainingBalance { amount, remaining });
        }

        let payment = Payment {
            id,
            invoice_id: self.id,
            amount,
            paid_at,
        };
        self.payments.push(payment.clone());

        // `>=` rather than `==` as rounding tolerance; overpayment was already
        // rejected above, so equality is the case that actually occurs.
        if total_paid + amount >= self.amount {
            self.status = InvoiceStatus::Paid;
        }
        self.assert_invariants();
        Ok(payment)
    }

    fn snapshot(&self) -> InvoiceSnapshot {
        let mut payments = self.payments.clone();
        payments.sort_by_key(|payment| (payment.paid_at, payment.id.0));
        InvoiceSnapshot {
            id: self.id,
            customer_id: self.customer_id,
            amount: self.amount,
            currency: self.currency.clone(),
            issued_at: self.issued_at,
            due_at: self.due_at,
            status: self.status,
            payments,
        }
    }
}

/// An invoice cell.
///
/// The interior mutex is the "row lock" of the payment engine: every status
/// transition and payment application runs start-to-finish under one
/// acquisition, so two concurrent payments can never both observe a stale
/// remaining balance. Operations on different invoices never contend.
#[derive(Debug)]
pub struct Invoice {
    inner: Mutex<InvoiceData>,
}

impl Invoice {
    /// Creates a new invoice in `Draft` status.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - Amount is not positive at scale 2.
    /// - [`LedgerError::InvalidCurrency`] - Currency is not exactly 3 characters.
    pub fn new(
        id: InvoiceId,
        customer_id: CustomerId,
        amount: Decimal,
        currency: &str,
        issued_at: DateTime<Utc>,
        due_at: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        let amount = to_money(amount);
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        if currency.chars().count() != 3 {
            return Err(LedgerError::InvalidCurrency);
        }
        Ok(Self {
            inner: Mutex::new(InvoiceData {
                id,
                customer_id,
                amount,
                currency: currency.to_string(),
                issued_at,
                due_at,
                status: InvoiceStatus::Draft,
                payments: Vec::new(),
            }),
        })
    }

    pub fn id(&self) -> InvoiceId {
        self.inner.lock().id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.inner.lock().customer_id
    }

    pub fn status(&self) -> InvoiceStatus {
        self.inner.lock().status
    }

    pub fn amount(&self) -> Decimal {
        self.inner.lock().amount
    }

    /// Sum of all recorded payments, zero when none exist.
    pub fn total_paid(&self) -> Decimal {
        self.inner.lock().total_paid()
    }

    /// Returns `amount - total_paid`.
    pub fn remaining_balance(&self) -> Decimal {
        let data = self.inner.lock();
        data.amount - data.total_paid()
    }

    /// Posts the invoice for payment (DRAFT → PENDING) and returns the
    /// updated snapshot.
    pub fn post(&self) -> Result<InvoiceSnapshot, LedgerError> {
        let mut data = self.inner.lock();
        data.post()?;
        Ok(data.snapshot())
    }

    /// Voids the invoice (PENDING → VOID) and returns the updated snapshot.
    pub fn void(&self) -> Result<InvoiceSnapshot, LedgerError> {
        let mut data = self.inner.lock();
        data.void()?;
        Ok(data.snapshot())
    }

    /// Records a payment under the row lock; the payment insertion and any
    /// PENDING → PAID transition commit together or not at all.
    ///
    /// The id is expected to be fresh; the [`Ledger`](crate::Ledger) assigns
    /// them from its payment sequence.
    pub fn record_payment(
        &self,
        id: PaymentId,
        amount: Decimal,
        paid_at: DateTime<Utc>,
    ) -> Result<Payment, LedgerError> {
        self.inner.lock().record_payment(id, amount, paid_at)
    }

    /// Point-in-time copy of the invoice with payments in ascending
    /// `paid_at` order (payment id as tie-break).
    pub fn snapshot(&self) -> InvoiceSnapshot {
        self.inner.lock().snapshot()
    }
}

impl Serialize for Invoice {
    /// Serializes a flat summary row (no payment list), amounts normalized to
    /// the stored two-digit scale. Used for CSV reports.
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let data = self.inner.lock();
        let mut state = serializer.serialize_struct("Invoice", 8)?;
        state.serialize_field("id", &data.id)?;
        state.serialize_field("customer_id", &data.customer_id)?;
        state.serialize_field("amount", &to_money(data.amount))?;
        state.serialize_field("currency", &data.currency)?;
        state.serialize_field("status", &data.status)?;
        state.serialize_field("total_paid", &to_money(data.total_paid()))?;
        state.serialize_field("issued_at", &data.issued_at)?;
        state.serialize_field("due_at", &data.due_at)?;
        state.end()
    }
}

/// Owned, point-in-time view of an invoice and its payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSnapshot {
    pub id: InvoiceId,
    pub customer_id: CustomerId,
    pub amount: Decimal,
    pub currency: String,
    pub issued_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub status: InvoiceStatus,
    /// Ascending by `paid_at`, payment id as tie-break.
    pub payments: Vec<Payment>,
}

impl InvoiceSnapshot {
    pub fn total_paid(&self) -> Decimal {
        self.payments.iter().map(|payment| payment.amount).sum()
    }

    pub fn remaining_balance(&self) -> Decimal {
        self.amount - self.total_paid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn pending_invoice(amount: Decimal) -> InvoiceData {
        let mut data = InvoiceData {
            id: InvoiceId(1),
            customer_id: CustomerId(1),
            amount,
            currency: "USD".to_string(),
            issued_at: ts(1_000),
            due_at: ts(2_000),
            status: InvoiceStatus::Draft,
            payments: Vec::new(),
        };
        data.post().unwrap();
        data
    }

    // === InvoiceData Internal Tests ===
    // These test the private state-machine methods directly.

    #[test]
    fn post_moves_draft_to_pending() {
        let data = pending_invoice(dec!(100.00));
        assert_eq!(data.status, InvoiceStatus::Pending);
    }

    #[test]
    fn post_rejects_pending() {
        let mut data = pending_invoice(dec!(100.00));
        let result = data.post();
        assert_eq!(
            result,
            Err(LedgerError::PostRequiresDraft(InvoiceStatus::Pending))
        );
    }

    #[test]
    fn void_moves_pending_to_void() {
        let mut data = pending_invoice(dec!(100.00));
        data.void().unwrap();
        assert_eq!(data.status, InvoiceStatus::Void);
    }

    #[test]
    fn void_rejects_draft() {
        let invoice = Invoice::new(
            InvoiceId(1),
            CustomerId(1),
            dec!(100.00),
            "USD",
            ts(0),
            ts(0),
        )
        .unwrap();
        assert_eq!(invoice.void().unwrap_err(), LedgerError::VoidDraft);
    }

    #[test]
    fn void_rejects_void_and_paid() {
        let mut data = pending_invoice(dec!(100.00));
        data.void().unwrap();
        assert_eq!(data.void(), Err(LedgerError::AlreadyVoid));

        let mut paid = pending_invoice(dec!(100.00));
        paid.record_payment(PaymentId(1), dec!(100.00), ts(10)).unwrap();
        assert_eq!(paid.void(), Err(LedgerError::VoidPaid));
    }

    #[test]
    fn payment_flips_status_exactly_at_amount() {
        let mut data = pending_invoice(dec!(1000.00));
        data.record_payment(PaymentId(1), dec!(999.99), ts(10)).unwrap();
        assert_eq!(data.status, InvoiceStatus::Pending);
        data.record_payment(PaymentId(2), dec!(0.01), ts(20)).unwrap();
        assert_eq!(data.status, InvoiceStatus::Paid);
        assert_eq!(data.total_paid(), dec!(1000.00));
    }

    #[test]
    fn overpayment_rejected_and_state_unchanged() {
        let mut data = pending_invoice(dec!(1000.00));
        let result = data.record_payment(PaymentId(1), dec!(1500.00), ts(10));
        assert_eq!(
            result,
            Err(LedgerError::ExceedsRemainingBalance {
                amount: dec!(1500.00),
                remaining: dec!(1000.00),
            })
        );
        assert_eq!(data.status, InvoiceStatus::Pending);
        assert_eq!(data.total_paid(), Decimal::ZERO);
        assert!(data.payments.is_empty());
    }

    #[test]
    fn payment_rejected_on_draft() {
        let invoice = Invoice::new(
            InvoiceId(1),
            CustomerId(1),
            dec!(100.00),
            "USD",
            ts(0),
            ts(0),
        )
        .unwrap();
        let result = invoice.record_payment(PaymentId(1), dec!(10.00), ts(10));
        assert_eq!(result, Err(LedgerError::PaymentOnDraft));
    }

    #[test]
    fn payment_rejected_on_terminal_statuses() {
        let mut void = pending_invoice(dec!(100.00));
        void.void().unwrap();
        assert_eq!(
            void.record_payment(PaymentId(1), dec!(10.00), ts(10)),
            Err(LedgerError::PaymentNotAccepted(InvoiceStatus::Void))
        );

        let mut paid = pending_invoice(dec!(100.00));
        paid.record_payment(PaymentId(1), dec!(100.00), ts(10)).unwrap();
        assert_eq!(
            paid.record_payment(PaymentId(2), dec!(10.00), ts(20)),
            Err(LedgerError::PaymentNotAccepted(InvoiceStatus::Paid))
        );
    }

    #[test]
    fn payment_amount_rescales_to_cents() {
        let mut data = pending_invoice(dec!(100.00));
        // 10.005 rounds half-to-even down to 10.00
        let payment = data
            .record_payment(PaymentId(1), dec!(10.005), ts(10))
            .unwrap();
        assert_eq!(payment.amount, dec!(10.00));
    }

    #[test]
    fn payment_rounding_to_zero_is_rejected() {
        let mut data = pending_invoice(dec!(100.00));
        let result = data.record_payment(PaymentId(1), dec!(0.001), ts(10));
        assert_eq!(result, Err(LedgerError::InvalidAmount));
    }

    // === Constructor Validation ===

    #[test]
    fn new_rejects_non_positive_amount() {
        let result = Invoice::new(InvoiceId(1), CustomerId(1), dec!(0.00), "USD", ts(0), ts(0));
        assert_eq!(result.unwrap_err(), LedgerError::InvalidAmount);

        let result = Invoice::new(InvoiceId(1), CustomerId(1), dec!(-5.00), "USD", ts(0), ts(0));
        assert_eq!(result.unwrap_err(), LedgerError::InvalidAmount);
    }

    #[test]
    fn new_rejects_bad_currency() {
        for currency in ["", "US", "USDX"] {
            let result = Invoice::new(
                InvoiceId(1),
                CustomerId(1),
                dec!(10.00),
                currency,
                ts(0),
                ts(0),
            );
            assert_eq!(result.unwrap_err(), LedgerError::InvalidCurrency);
        }
    }

    // === Snapshot Tests ===

    #[test]
    fn snapshot_orders_payments_by_paid_at() {
        let mut data = pending_invoice(dec!(1000.00));
        data.record_payment(PaymentId(1), dec!(100.00), ts(300)).unwrap();
        data.record_payment(PaymentId(2), dec!(100.00), ts(100)).unwrap();
        data.record_payment(PaymentId(3), dec!(100.00), ts(200)).unwrap();

        let snapshot = data.snapshot();
        let order: Vec<u64> = snapshot.payments.iter().map(|p| p.id.0).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn snapshot_breaks_paid_at_ties_by_id() {
        let mut data = pending_invoice(dec!(1000.00));
        data.record_payment(PaymentId(9), dec!(100.00), ts(100)).unwrap();
        data.record_payment(PaymentId(3), dec!(100.00), ts(100)).unwrap();

        let snapshot = data.snapshot();
        let order: Vec<u64> = snapshot.payments.iter().map(|p| p.id.0).collect();
        assert_eq!(order, vec![3, 9]);
    }

    // === Serialization Tests ===

    #[test]
    fn serializer_emits_two_decimal_places() {
        let invoice = Invoice::new(
            InvoiceId(1),
            CustomerId(2),
            dec!(1000),
            "USD",
            ts(0),
            ts(0),
        )
        .unwrap();

        let json = serde_json::to_string(&invoice).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["id"], 1);
        assert_eq!(parsed["customer_id"], 2);
        // Whole-number input is padded to the stored scale.
        assert_eq!(parsed["amount"].as_str().unwrap(), "1000.00");
        assert_eq!(parsed["total_paid"].as_str().unwrap(), "0.00");
        assert_eq!(parsed["status"].as_str().unwrap(), "DRAFT");
        assert_eq!(parsed["currency"].as_str().unwrap(), "USD");
    }

    #[test]
    fn status_serializes_as_literal_strings() {
        for (status, literal) in [
            (InvoiceStatus::Draft, "\"DRAFT\""),
            (InvoiceStatus::Pending, "\"PENDING\""),
            (InvoiceStatus::Paid, "\"PAID\""),
            (InvoiceStatus::Void, "\"VOID\""),
        ] {
            assert_eq!(serde_json::to_string(&status).unwrap(), literal);
            assert_eq!(format!("\"{}\"", status), literal);
        }
    }

    #[test]
    fn to_money_uses_bankers_rounding() {
        assert_eq!(to_money(dec!(0.005)).to_string(), "0.00");
        assert_eq!(to_money(dec!(0.015)).to_string(), "0.02");
        assert_eq!(to_money(dec!(1)).to_string(), "1.00");
        assert_eq!(to_money(dec!(1.2)).to_string(), "1.20");
    }
}
