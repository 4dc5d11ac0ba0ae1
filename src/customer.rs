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

//! Customer records.

use crate::base::{CustomerId, InvoiceId};
use parking_lot::Mutex;

/// Maximum accepted customer name length.
pub(crate) const MAX_NAME_LEN: usize = 255;

/// A customer owning zero or more invoices.
///
/// Id and name are immutable. The record also carries the index of its owned
/// invoice ids, which backs the store's restrict-on-delete rule and
/// per-customer invoice listing without scanning the whole invoice table.
#[derive(Debug)]
pub struct Customer {
    id: CustomerId,
    name: String,
    /// Owned invoice ids, in registration order.
    invoices: Mutex<Vec<InvoiceId>>,
}

impl Customer {
    pub(crate) fn new(id: CustomerId, name: String) -> Self {
        Self {
            id,
            name,
            invoices: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> CustomerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of invoices currently owned by this customer.
    pub fn invoice_count(&self) -> usize {
        self.invoices.lock().len()
    }

    pub(crate) fn has_invoices(&self) -> bool {
        !self.invoices.lock().is_empty()
    }

    pub(crate) fn invoice_ids(&self) -> Vec<InvoiceId> {
        self.invoices.lock().clone()
    }

    pub(crate) fn register_invoice(&self, id: InvoiceId) {
        self.invoices.lock().push(id);
    }

    pub(crate) fn unregister_invoice(&self, id: InvoiceId) {
        self.invoices.lock().retain(|owned| *owned != id);
    }
}

impl serde::Serialize for Customer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Customer", 2)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("name", &self.name)?;
        state.end()
    }
}
