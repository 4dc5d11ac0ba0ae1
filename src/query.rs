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

//! Invoice list filtering.

use crate::base::CustomerId;
use crate::invoice::{InvoiceSnapshot, InvoiceStatus};
use chrono::{DateTime, Utc};

/// Filter for invoice listings.
///
/// Each field is independently optional; the ones that are set are combined
/// with logical AND. An absent field means "no constraint on that dimension",
/// not "match null". Date bounds are inclusive and apply to `issued_at`.
///
/// # Example
///
/// ```
/// use invoice_ledger_rs::{InvoiceFilter, InvoiceStatus};
///
/// let filter = InvoiceFilter {
///     status: Some(InvoiceStatus::Pending),
///     ..InvoiceFilter::default()
/// };
/// ```
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub customer_id: Option<CustomerId>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl InvoiceFilter {
    /// Matches everything.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn matches(&self, invoice: &InvoiceSnapshot) -> bool {
        if self.status.is_some_and(|status| invoice.status != status) {
            return false;
        }
        if self.customer_id.is_some_and(|id| invoice.customer_id != id) {
            return false;
        }
        if self.from.is_some_and(|from| invoice.issued_at < from) {
            return false;
        }
        if self.to.is_some_and(|to| invoice.issued_at > to) {
            return false;
        }
        true
    }
}
