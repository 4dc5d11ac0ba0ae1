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

//! # Invoice Ledger
//!
//! This library provides an invoicing ledger that tracks customers, invoices,
//! and payments while enforcing a small, strict set of financial rules: no
//! overpayment, status-gated transitions, and lifecycle ordering
//! (`DRAFT → PENDING → PAID`, with `VOID` reachable from `PENDING`).
//!
//! ## Core Components
//!
//! - [`Ledger`]: Central store and engine managing customers, invoices, payments
//! - [`Invoice`]: Invoice cell owning the status state machine and its payments
//! - [`InvoiceStatus`]: Closed status enum (`DRAFT`, `PENDING`, `PAID`, `VOID`)
//! - [`InvoiceFilter`]: AND-composed listing filter (status, customer, date range)
//! - [`LedgerError`]: Business-rule rejections with contract-stable messages
//!
//! ## Example
//!
//! ```
//! use chrono::Utc;
//! use invoice_ledger_rs::{InvoiceStatus, Ledger};
//! use rust_decimal_macros::dec;
//!
//! let ledger = Ledger::new();
//!
//! let customer_id = ledger.create_customer("Acme Corp").unwrap();
//! let invoice = ledger
//!     .create_invoice(customer_id, dec!(1000.00), "USD", Utc::now(), Utc::now())
//!     .unwrap();
//!
//! // Drafts must be posted before they accept payments.
//! ledger.post_invoice(invoice.id).unwrap();
//! ledger.record_payment(invoice.id, dec!(400.00), None).unwrap();
//! ledger.record_payment(invoice.id, dec!(600.00), None).unwrap();
//!
//! // Covering the full amount flips the invoice to PAID.
//! let paid = ledger.get_invoice(invoice.id).unwrap();
//! assert_eq!(paid.status, InvoiceStatus::Paid);
//! assert_eq!(paid.total_paid(), dec!(1000.00));
//! ```
//!
//! ## Thread Safety
//!
//! The ledger handles concurrent access per invoice: each invoice cell holds
//! its own lock, so payments and status changes on one invoice are serialized
//! (a race can never overpay an invoice or pay it twice) while operations on
//! different invoices proceed fully in parallel.

mod base;
mod customer;
pub mod error;
pub mod invoice;
mod ledger;
mod payment;
mod query;

pub use base::{CustomerId, InvoiceId, PaymentId};
pub use customer::Customer;
pub use error::LedgerError;
pub use invoice::{Invoice, InvoiceSnapshot, InvoiceStatus};
pub use ledger::Ledger;
pub use payment::Payment;
pub use query::InvoiceFilter;
