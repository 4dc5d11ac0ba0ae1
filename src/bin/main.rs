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

use chrono::{DateTime, Utc};
use clap::Parser;
use csv::Writer;
use invoice_ledger_rs::{CustomerId, InvoiceId, InvoiceStatus, Ledger};
use log::warn;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;

/// Invoice Ledger - Load seed data and report invoice states
///
/// Reads customers, invoices, and payments from a JSON seed file, replays
/// them through the ledger engine, and writes an invoice summary CSV to
/// stdout. Rows that violate business rules are skipped with a warning.
#[derive(Parser, Debug)]
#[command(name = "invoice-ledger-rs")]
#[command(about = "An invoicing ledger that loads JSON seed data", long_about = None)]
struct Args {
    /// Path to JSON seed file
    ///
    /// Expected shape: {"customers": [...], "invoices": [...], "payments": [...]}
    /// Example: cargo run -- seed-data.json > invoices.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

fn main() {
    env_logger::init();

    // Parse command line arguments
    let args = Args::parse();

    // Open input file
    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    // Replay seed data through the engine
    let ledger = match load_seed(BufReader::new(file)) {
        Ok(ledger) => ledger,
        Err(e) => {
            eprintln!("Error loading seed data: {}", e);
            process::exit(1);
        }
    };

    // Write results to stdout
    if let Err(e) = write_invoices(&ledger, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Seed file root.
///
/// All three sections are optional; amounts are decimal strings and
/// timestamps are RFC 3339.
#[derive(Debug, Deserialize)]
struct SeedData {
    #[serde(default)]
    customers: Vec<SeedCustomer>,
    #[serde(default)]
    invoices: Vec<SeedInvoice>,
    #[serde(default)]
    payments: Vec<SeedPayment>,
}

#[derive(Debug, Deserialize)]
struct SeedCustomer {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct SeedInvoice {
    id: u64,
    customer_id: u64,
    amount: Decimal,
    currency: String,
    issued_at: DateTime<Utc>,
    due_at: DateTime<Utc>,
    #[serde(default = "default_status")]
    status: InvoiceStatus,
}

#[derive(Debug, Deserialize)]
struct SeedPayment {
    id: u64,
    invoice_id: u64,
    amount: Decimal,
    paid_at: DateTime<Utc>,
}

fn default_status() -> InvoiceStatus {
    InvoiceStatus::Draft
}

/// Replays a JSON seed file through the ledger engine.
///
/// Unlike a raw database import, every row passes the full rule set:
/// invoices are created as drafts and posted when their declared status is
/// past DRAFT, payments are applied oldest-first, and VOID invoices are
/// voided after their payments. Rows the rules reject are skipped with a
/// warning, and an invoice whose declared status disagrees with the replayed
/// outcome is left in the computed status.
///
/// Seed ids are only used to resolve references between sections; the ledger
/// assigns its own ids, so the output ids may differ from the seed's.
///
/// # Errors
///
/// Returns a JSON error if the seed file cannot be parsed. Individual rule
/// violations do not stop loading.
pub fn load_seed<R: Read>(reader: R) -> Result<Ledger, serde_json::Error> {
    let seed: SeedData = serde_json::from_reader(reader)?;
    let ledger = Ledger::new();

    // Seed ids -> assigned ids
    let mut customer_ids: HashMap<u64, CustomerId> = HashMap::new();
    let mut invoice_ids: HashMap<u64, InvoiceId> = HashMap::new();

    for customer in &seed.customers {
        match ledger.create_customer(&customer.name) {
            Ok(id) => {
                customer_ids.insert(customer.id, id);
            }
            Err(e) => warn!("skipping customer {}: {}", customer.id, e),
        }
    }

    for invoice in &seed.invoices {
        let Some(&customer_id) = customer_ids.get(&invoice.customer_id) else {
            warn!(
                "skipping invoice {}: customer {} not in seed",
                invoice.id, invoice.customer_id
            );
            continue;
        };

        let created = ledger.create_invoice(
            customer_id,
            invoice.amount,
            &invoice.currency,
            invoice.issued_at,
            invoice.due_at,
        );
        let id = match created {
            Ok(snapshot) => snapshot.id,
            Err(e) => {
                warn!("skipping invoice {}: {}", invoice.id, e);
                continue;
            }
        };
        invoice_ids.insert(invoice.id, id);

        // Anything past DRAFT has been posted; PAID is reached by replaying
        // payments below, VOID by the final pass.
        if invoice.status != InvoiceStatus::Draft {
            if let Err(e) = ledger.post_invoice(id) {
                warn!("skipping post of invoice {}: {}", invoice.id, e);
            }
        }
    }

    // Oldest first, so replay order matches payment history.
    let mut payments: Vec<&SeedPayment> = seed.payments.iter().collect();
    payments.sort_by_key(|payment| payment.paid_at);

    for payment in payments {
        let Some(&invoice_id) = invoice_ids.get(&payment.invoice_id) else {
            warn!(
                "skipping payment {}: invoice {} not in seed",
                payment.id, payment.invoice_id
            );
            continue;
        };
        if let Err(e) = ledger.record_payment(invoice_id, payment.amount, Some(payment.paid_at)) {
            warn!("skipping payment {}: {}", payment.id, e);
        }
    }

    for invoice in &seed.invoices {
        let Some(&id) = invoice_ids.get(&invoice.id) else {
            continue;
        };
        if invoice.status == InvoiceStatus::Void {
            if let Err(e) = ledger.void_invoice(id) {
                warn!("skipping void of invoice {}: {}", invoice.id, e);
            }
        }
        let replayed = ledger
            .get_invoice(id)
            .map(|snapshot| snapshot.status)
            .unwrap_or(InvoiceStatus::Draft);
        if replayed != invoice.status {
            warn!(
                "invoice {} declared {} but replayed to {}",
                invoice.id, invoice.status, replayed
            );
        }
    }

    Ok(ledger)
}

/// Write invoice states to a CSV writer
///
/// Outputs all invoices ordered by id, amounts with 2 decimal precision.
///
/// # CSV Format
///
/// Columns: `id, customer_id, amount, currency, status, total_paid, issued_at, due_at`
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_invoices<W: Write>(ledger: &Ledger, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    let mut invoices: Vec<_> = ledger.invoices().collect();
    invoices.sort_by_key(|entry| entry.key().0);

    for invoice in invoices {
        wtr.serialize(invoice.value())?;
    }

    // Flush to ensure all data is written
    wtr.flush()?;
    Ok(())
}
