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

//! The invoicing ledger store.
//!
//! The [`Ledger`] is the single source of truth for customers, invoices, and
//! payments. It owns the lifecycle operations (create, post, void, delete),
//! the payment application engine, and the filtered listing queries.
//!
//! # Concurrency
//!
//! Tables are [`DashMap`]s, so operations on different invoices proceed fully
//! in parallel. Per-invoice exclusivity comes from the mutex inside each
//! [`Invoice`] cell: at most one payment or status mutation is in flight per
//! invoice at a time, and every operation re-reads status and balance under
//! that lock rather than trusting anything observed earlier.

use crate::base::{CustomerId, InvoiceId, PaymentId};
use crate::customer::{Customer, MAX_NAME_LEN};
use crate::error::LedgerError;
use crate::invoice::{Invoice, InvoiceSnapshot, InvoiceStatus};
use crate::payment::Payment;
use crate::query::InvoiceFilter;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::debug;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};

/// Invoicing ledger tracking customers, invoices, and payments.
///
/// # Invariants
///
/// - An invoice's status only ever moves forward along
///   `DRAFT → PENDING → PAID` / `PENDING → VOID`; `PAID` and `VOID` are final.
/// - The sum of recorded payments never exceeds the invoice amount.
/// - A customer cannot be removed while it still owns invoices.
/// - Deleting a (draft) invoice removes its payments with it.
pub struct Ledger {
    /// Customers indexed by id.
    customers: DashMap<CustomerId, Customer>,
    /// Invoices indexed by id.
    invoices: DashMap<InvoiceId, Invoice>,
    customer_seq: AtomicU64,
    invoice_seq: AtomicU64,
    payment_seq: AtomicU64,
}

impl Ledger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Ledger {
            customers: DashMap::new(),
            invoices: DashMap::new(),
            customer_seq: AtomicU64::new(0),
            invoice_seq: AtomicU64::new(0),
            payment_seq: AtomicU64::new(0),
        }
    }

    // === Customers ===

    /// Creates a customer and returns its assigned id.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidCustomerName`] - Name is empty or over 255 chars.
    pub fn create_customer(&self, name: &str) -> Result<CustomerId, LedgerError> {
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(LedgerError::InvalidCustomerName);
        }
        let id = CustomerId(self.customer_seq.fetch_add(1, Ordering::Relaxed) + 1);
        self.customers.insert(id, Customer::new(id, name.to_string()));
        Ok(id)
    }

    /// Retrieves a customer by id. `None` when no such customer exists.
    pub fn get_customer(
        &self,
        id: CustomerId,
    ) -> Option<dashmap::mapref::one::Ref<'_, CustomerId, Customer>> {
        self.customers.get(&id)
    }

    /// Returns an iterator over all customers (unordered).
    pub fn customers(
        &self,
    ) -> impl Iterator<Item = dashmap::mapref::multiple::RefMulti<'_, CustomerId, Customer>> {
        self.customers.iter()
    }

    /// Removes a customer. Restrict semantics: fails while the customer still
    /// owns any invoice, mirroring a foreign key with `ON DELETE RESTRICT`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::CustomerNotFound`]
    /// - [`LedgerError::CustomerHasInvoices`]
    pub fn remove_customer(&self, id: CustomerId) -> Result<(), LedgerError> {
        // remove_if holds the entry exclusively while the predicate runs, so
        // the emptiness check cannot race a concurrent create_invoice (which
        // registers the invoice while holding a reference to this entry).
        match self.customers.remove_if(&id, |_, customer| !customer.has_invoices()) {
            Some(_) => Ok(()),
            None if self.customers.contains_key(&id) => Err(LedgerError::CustomerHasInvoices(id)),
            None => Err(LedgerError::CustomerNotFound(id)),
        }
    }

    // === Invoice lifecycle ===

    /// Creates an invoice in `Draft` status and returns its snapshot.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - Amount not positive at scale 2.
    /// - [`LedgerError::InvalidCurrency`] - Currency not exactly 3 characters.
    /// - [`LedgerError::CustomerNotFound`] - No such customer.
    pub fn create_invoice(
        &self,
        customer_id: CustomerId,
        amount: Decimal,
        currency: &str,
        issued_at: DateTime<Utc>,
        due_at: DateTime<Utc>,
    ) -> Result<InvoiceSnapshot, LedgerError> {
        // Hold the customer entry until the invoice is registered, so the
        // customer cannot be removed out from under the new invoice.
        let customer = self
            .customers
            .get(&customer_id)
            .ok_or(LedgerError::CustomerNotFound(customer_id))?;

        let id = InvoiceId(self.invoice_seq.fetch_add(1, Ordering::Relaxed) + 1);
        let invoice = Invoice::new(id, customer_id, amount, currency, issued_at, due_at)?;
        let snapshot = invoice.snapshot();
        self.invoices.insert(id, invoice);
        customer.register_invoice(id);
        debug!("created invoice {} for customer {}", id, customer_id);
        Ok(snapshot)
    }

    /// Retrieves an invoice with its payments in ascending `paid_at` order.
    ///
    /// Absence is a normal outcome, not an error: the caller decides what a
    /// missing invoice means at its boundary.
    pub fn get_invoice(&self, id: InvoiceId) -> Option<InvoiceSnapshot> {
        self.invoices.get(&id).map(|invoice| invoice.snapshot())
    }

    /// Posts an invoice for payment: `DRAFT → PENDING`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvoiceNotFound`]
    /// - [`LedgerError::PostRequiresDraft`]
    pub fn post_invoice(&self, id: InvoiceId) -> Result<InvoiceSnapshot, LedgerError> {
        let invoice = self
            .invoices
            .get(&id)
            .ok_or(LedgerError::InvoiceNotFound(id))?;
        let snapshot = invoice.post()?;
        debug!("posted invoice {}", id);
        Ok(snapshot)
    }

    /// Voids an invoice: `PENDING → VOID`.
    ///
    /// Drafts must be deleted instead of voided; a void leaves an auditable
    /// record, which a scratch draft does not warrant.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvoiceNotFound`]
    /// - [`LedgerError::VoidPaid`] / [`LedgerError::AlreadyVoid`] /
    ///   [`LedgerError::VoidDraft`]
    pub fn void_invoice(&self, id: InvoiceId) -> Result<InvoiceSnapshot, LedgerError> {
        let invoice = self
            .invoices
            .get(&id)
            .ok_or(LedgerError::InvoiceNotFound(id))?;
        let snapshot = invoice.void()?;
        debug!("voided invoice {}", id);
        Ok(snapshot)
    }

    /// Hard-deletes a draft invoice, cascading deletion of its payments.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvoiceNotFound`]
    /// - [`LedgerError::DeleteRequiresDraft`]
    pub fn delete_invoice(&self, id: InvoiceId) -> Result<(), LedgerError> {
        // remove_if makes the status check and the removal one atomic step, so
        // a concurrent post cannot slip between them.
        match self
            .invoices
            .remove_if(&id, |_, invoice| invoice.status() == InvoiceStatus::Draft)
        {
            Some((_, invoice)) => {
                // Payments are owned by the invoice cell and drop with it.
                let customer_id = invoice.customer_id();
                if let Some(customer) = self.customers.get(&customer_id) {
                    customer.unregister_invoice(id);
                }
                debug!("deleted invoice {}", id);
                Ok(())
            }
            None => match self.invoices.get(&id) {
                Some(invoice) => Err(LedgerError::DeleteRequiresDraft(invoice.status())),
                None => Err(LedgerError::InvoiceNotFound(id)),
            },
        }
    }

    // === Payment application ===

    /// Records a payment against an invoice.
    ///
    /// The whole read-modify-write — status check, balance computation,
    /// payment insertion, and the `PENDING → PAID` side effect — runs under
    /// the invoice's lock, so concurrent payments are serialized per invoice
    /// and can never jointly overpay. `paid_at` defaults to the moment of
    /// recording.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvoiceNotFound`]
    /// - [`LedgerError::PaymentOnDraft`] - Invoice has not been posted.
    /// - [`LedgerError::PaymentNotAccepted`] - Invoice is `PAID` or `VOID`.
    /// - [`LedgerError::InvalidAmount`] - Amount not positive at scale 2.
    /// - [`LedgerError::ExceedsRemainingBalance`] - Would overpay.
    pub fn record_payment(
        &self,
        invoice_id: InvoiceId,
        amount: Decimal,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<Payment, LedgerError> {
        let invoice = self
            .invoices
            .get(&invoice_id)
            .ok_or(LedgerError::InvoiceNotFound(invoice_id))?;
        let id = PaymentId(self.payment_seq.fetch_add(1, Ordering::Relaxed) + 1);
        let paid_at = paid_at.unwrap_or_else(Utc::now);
        let payment = invoice.record_payment(id, amount, paid_at)?;
        debug!(
            "recorded payment {} of {} against invoice {}",
            payment.id, payment.amount, invoice_id
        );
        Ok(payment)
    }

    /// Sum of recorded payment amounts for an invoice.
    ///
    /// A pure read: zero when the invoice has no payments, and — matching the
    /// aggregate query it stands in for — zero when the invoice does not
    /// exist at all.
    pub fn total_paid(&self, invoice_id: InvoiceId) -> Decimal {
        self.invoices
            .get(&invoice_id)
            .map(|invoice| invoice.total_paid())
            .unwrap_or(Decimal::ZERO)
    }

    // === Queries ===

    /// Lists invoices matching the filter, ordered by `issued_at` descending
    /// (invoice id descending as tie-break).
    pub fn list_invoices(&self, filter: &InvoiceFilter) -> Vec<InvoiceSnapshot> {
        let mut results: Vec<InvoiceSnapshot> = self
            .invoices
            .iter()
            .map(|entry| entry.value().snapshot())
            .filter(|snapshot| filter.matches(snapshot))
            .collect();
        sort_newest_first(&mut results);
        results
    }

    /// Lists one customer's invoices matching the filter, newest first.
    ///
    /// A non-existent customer yields an empty list rather than an error;
    /// absence of matches is not an error condition.
    pub fn customer_invoices(
        &self,
        customer_id: CustomerId,
        filter: &InvoiceFilter,
    ) -> Vec<InvoiceSnapshot> {
        let Some(customer) = self.customers.get(&customer_id) else {
            return Vec::new();
        };
        let mut results: Vec<InvoiceSnapshot> = customer
            .invoice_ids()
            .into_iter()
            .filter_map(|id| self.invoices.get(&id).map(|invoice| invoice.snapshot()))
            .filter(|snapshot| filter.matches(snapshot))
            .collect();
        sort_newest_first(&mut results);
        results
    }

    /// Returns an iterator over all invoice cells.
    ///
    /// Useful for generating output reports of invoice states.
    pub fn invoices(
        &self,
    ) -> impl Iterator<Item = dashmap::mapref::multiple::RefMulti<'_, InvoiceId, Invoice>> {
        self.invoices.iter()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_newest_first(invoices: &mut [InvoiceSnapshot]) {
    invoices.sort_by(|a, b| {
        b.issued_at
            .cmp(&a.issued_at)
            .then_with(|| b.id.0.cmp(&a.id.0))
    });
}
