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

//! Error types for ledger operations.
//!
//! Every rejection names the rule that failed. The message text is part of
//! the API contract: clients and tests match on these substrings, so changing
//! a message is a breaking change.

use crate::base::{CustomerId, InvoiceId};
use crate::invoice::InvoiceStatus;
use rust_decimal::Decimal;
use thiserror::Error;

/// Ledger operation errors.
///
/// All variants are expected, recoverable business-rule rejections; none
/// indicates a bug or corrupts state. A failed operation mutates nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Invoice or payment amount is zero or negative (after rescaling to cents)
    #[error("amount must be positive")]
    InvalidAmount,

    /// Currency code is not exactly three characters
    #[error("currency must be exactly 3 characters")]
    InvalidCurrency,

    /// Customer name is empty or longer than 255 characters
    #[error("customer name must be between 1 and 255 characters")]
    InvalidCustomerName,

    /// Referenced customer does not exist
    #[error("customer {0} not found")]
    CustomerNotFound(CustomerId),

    /// Customer still owns invoices and cannot be removed
    #[error("customer {0} still has invoices")]
    CustomerHasInvoices(CustomerId),

    /// Referenced invoice does not exist
    #[error("invoice {0} not found")]
    InvoiceNotFound(InvoiceId),

    /// Post attempted on a non-draft invoice
    #[error("invoice must be DRAFT to post (current: {0})")]
    PostRequiresDraft(InvoiceStatus),

    /// Void attempted on a paid invoice
    #[error("cannot void a paid invoice")]
    VoidPaid,

    /// Void attempted on an invoice that is already void
    #[error("invoice is already void")]
    AlreadyVoid,

    /// Void attempted on a draft; drafts are scratch objects with no audit trail
    #[error("drafts must be deleted, not voided")]
    VoidDraft,

    /// Delete attempted on an invoice that has left DRAFT
    #[error("invoice must be DRAFT to delete (current: {0})")]
    DeleteRequiresDraft(InvoiceStatus),

    /// Payment attempted on a draft invoice
    #[error("drafts cannot accept payments before being posted")]
    PaymentOnDraft,

    /// Payment attempted on a terminal (PAID or VOID) invoice
    #[error("cannot record payment for invoice with status {0}")]
    PaymentNotAccepted(InvoiceStatus),

    /// Payment would overpay the invoice
    #[error("payment amount {amount} exceeds remaining balance {remaining}")]
    ExceedsRemainingBalance { amount: Decimal, remaining: Decimal },
}
