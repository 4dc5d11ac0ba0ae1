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

//! Benchmarks for the invoicing ledger.
//!
//! Run with: cargo bench
//!
//! Benchmarks include:
//! - Single-threaded lifecycle and payment processing
//! - Multi-threaded concurrent payments across invoices
//! - Listing/filter throughput as the invoice table grows

use chrono::{DateTime, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use invoice_ledger_rs::{CustomerId, InvoiceFilter, InvoiceId, InvoiceStatus, Ledger};
use rayon::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// =============================================================================
// Helper Functions
// =============================================================================

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn ledger_with_customer() -> (Ledger, CustomerId) {
    let ledger = Ledger::new();
    let customer_id = ledger.create_customer("Bench Corp").unwrap();
    (ledger, customer_id)
}

fn pending_invoice(ledger: &Ledger, customer_id: CustomerId, amount: Decimal) -> InvoiceId {
    let id = ledger
        .create_invoice(customer_id, amount, "USD", ts(1_000), ts(2_000))
        .unwrap()
        .id;
    ledger.post_invoice(id).unwrap();
    id
}

// =============================================================================
// Single-Threaded Benchmarks
// =============================================================================

fn bench_full_lifecycle(c: &mut Criterion) {
    c.bench_function("full_lifecycle", |b| {
        let (ledger, customer_id) = ledger_with_customer();
        b.iter(|| {
            let id = pending_invoice(&ledger, customer_id, black_box(dec!(1000.00)));
            ledger.record_payment(id, dec!(1000.00), None).unwrap();
        })
    });
}

fn bench_record_payment(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_payment");

    // A fresh invoice per batch so the payment list stays small and the
    // measurement does not drift as history accumulates.
    group.throughput(Throughput::Elements(1));
    group.bench_function("partial_payment", |b| {
        let (ledger, customer_id) = ledger_with_customer();
        b.iter_batched(
            || pending_invoice(&ledger, customer_id, dec!(1000.00)),
            |id| {
                ledger
                    .record_payment(id, black_box(dec!(100.00)), None)
                    .unwrap();
            },
            criterion::BatchSize::SmallInput,
        )
    });

    // The rejection path: overpayment against a nearly-paid invoice.
    group.bench_function("rejected_overpayment", |b| {
        let (ledger, customer_id) = ledger_with_customer();
        let id = pending_invoice(&ledger, customer_id, dec!(1000.00));
        ledger.record_payment(id, dec!(999.00), None).unwrap();
        b.iter(|| {
            let result = ledger.record_payment(id, black_box(dec!(500.00)), None);
            assert!(result.is_err());
        })
    });

    group.finish();
}

// =============================================================================
// Concurrent Benchmarks
// =============================================================================

fn bench_concurrent_payments(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_payments");

    for num_invoices in [8usize, 64, 256] {
        group.throughput(Throughput::Elements(num_invoices as u64));
        group.bench_with_input(
            BenchmarkId::new("across_invoices", num_invoices),
            &num_invoices,
            |b, &num_invoices| {
                b.iter_batched(
                    || {
                        let (ledger, customer_id) = ledger_with_customer();
                        let ids: Vec<InvoiceId> = (0..num_invoices)
                            .map(|_| pending_invoice(&ledger, customer_id, dec!(100.00)))
                            .collect();
                        (ledger, ids)
                    },
                    |(ledger, ids)| {
                        ids.par_iter().for_each(|&id| {
                            ledger.record_payment(id, dec!(100.00), None).unwrap();
                        });
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    // Contended: every payment hits the same invoice, serialized by its lock.
    group.bench_function("contended_single_invoice", |b| {
        b.iter_batched(
            || {
                let (ledger, customer_id) = ledger_with_customer();
                let id = pending_invoice(&ledger, customer_id, dec!(6400.00));
                (ledger, id)
            },
            |(ledger, id)| {
                (0..64).into_par_iter().for_each(|_| {
                    ledger.record_payment(id, dec!(100.00), None).unwrap();
                });
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

// =============================================================================
// Listing Benchmarks
// =============================================================================

fn bench_list_invoices(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_invoices");

    for table_size in [100usize, 1_000] {
        let (ledger, customer_id) = ledger_with_customer();
        for i in 0..table_size {
            let id = ledger
                .create_invoice(
                    customer_id,
                    dec!(100.00),
                    "USD",
                    ts(i as i64),
                    ts(i as i64 + 10_000),
                )
                .unwrap()
                .id;
            if i % 2 == 0 {
                ledger.post_invoice(id).unwrap();
            }
        }

        group.throughput(Throughput::Elements(table_size as u64));
        group.bench_with_input(
            BenchmarkId::new("status_filter", table_size),
            &ledger,
            |b, ledger| {
                let filter = InvoiceFilter {
                    status: Some(InvoiceStatus::Pending),
                    ..InvoiceFilter::default()
                };
                b.iter(|| {
                    let results = ledger.list_invoices(black_box(&filter));
                    assert_eq!(results.len(), table_size / 2);
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_full_lifecycle,
    bench_record_payment,
    bench_concurrent_payments,
    bench_list_invoices
);
criterion_main!(benches);
