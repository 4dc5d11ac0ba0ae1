//! Simple REST API server example for the invoice ledger.
//!
//! Run with: `cargo run --example server`
//!
//! ## Endpoints
//!
//! - `POST /customers` - Create a customer
//! - `GET /customers` - List all customers
//! - `GET /customers/{id}/invoices` - List a customer's invoices (filterable)
//! - `POST /invoices` - Create an invoice (DRAFT)
//! - `GET /invoices` - List invoices (filterable by status, customer, date range)
//! - `GET /invoices/{id}` - Get an invoice with its payments
//! - `POST /invoices/{id}/post` - Send an invoice for payment (DRAFT -> PENDING)
//! - `POST /invoices/{id}/void` - Cancel a pending invoice (PENDING -> VOID)
//! - `DELETE /invoices/{id}` - Delete a draft invoice
//! - `POST /invoices/{id}/payments` - Record a payment against an invoice
//!
//! ## Example Usage
//!
//! ```bash
//! # Create a customer
//! curl -X POST http://localhost:3000/customers \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Acme Corp"}'
//!
//! # Create an invoice
//! curl -X POST http://localhost:3000/invoices \
//!   -H "Content-Type: application/json" \
//!   -d '{"customer_id": 1, "amount": "1000.00", "currency": "USD",
//!        "issued_at": "2025-01-15T00:00:00Z", "due_at": "2025-02-15T00:00:00Z"}'
//!
//! # Post it, then record a payment
//! curl -X POST http://localhost:3000/invoices/1/post
//! curl -X POST http://localhost:3000/invoices/1/payments \
//!   -H "Content-Type: application/json" \
//!   -d '{"amount": "400.00"}'
//!
//! # List pending invoices
//! curl "http://localhost:3000/invoices?status=PENDING"
//! ```

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use invoice_ledger_rs::{
    CustomerId, InvoiceFilter, InvoiceId, InvoiceSnapshot, InvoiceStatus, Ledger, LedgerError,
    Payment,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;

// === Request/Response DTOs ===

#[derive(Debug, Deserialize)]
pub struct CreateCustomerRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CustomerResponse {
    pub id: u64,
    pub name: String,
}

/// Request body for creating invoices. Amounts are decimal strings:
/// ```json
/// {"customer_id": 1, "amount": "1000.00", "currency": "USD", ...}
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    pub customer_id: u64,
    pub amount: Decimal,
    pub currency: String,
    pub issued_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub amount: Decimal,
    /// Defaults to the moment of recording when omitted.
    pub paid_at: Option<DateTime<Utc>>,
}

/// Query parameters for invoice listings; all optional, combined with AND.
#[derive(Debug, Deserialize)]
pub struct ListInvoicesQuery {
    pub status: Option<InvoiceStatus>,
    pub customer_id: Option<u64>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Same as [`ListInvoicesQuery`] minus the customer, which comes from the path.
#[derive(Debug, Deserialize)]
pub struct CustomerInvoicesQuery {
    pub status: Option<InvoiceStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Response body for errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Application State ===

/// Shared application state containing the ledger.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
}

// === Error Handling ===

/// Wrapper for converting `LedgerError` into HTTP responses.
///
/// Every domain rejection maps to 400 with the rule's message; the `code`
/// field gives clients something machine-readable to branch on.
pub struct AppError(LedgerError);

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = match &self.0 {
            LedgerError::InvalidAmount => "INVALID_AMOUNT",
            LedgerError::InvalidCurrency => "INVALID_CURRENCY",
            LedgerError::InvalidCustomerName => "INVALID_CUSTOMER_NAME",
            LedgerError::CustomerNotFound(_) => "CUSTOMER_NOT_FOUND",
            LedgerError::CustomerHasInvoices(_) => "CUSTOMER_HAS_INVOICES",
            LedgerError::InvoiceNotFound(_) => "INVOICE_NOT_FOUND",
            LedgerError::PostRequiresDraft(_)
            | LedgerError::VoidPaid
            | LedgerError::AlreadyVoid
            | LedgerError::VoidDraft
            | LedgerError::DeleteRequiresDraft(_) => "INVALID_TRANSITION",
            LedgerError::PaymentOnDraft
            | LedgerError::PaymentNotAccepted(_)
            | LedgerError::ExceedsRemainingBalance { .. } => "PAYMENT_REJECTED",
        };

        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: self.0.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

fn invoice_not_found(id: u64) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("invoice {} not found", id),
            code: "INVOICE_NOT_FOUND".to_string(),
        }),
    )
}

// === Handlers ===

/// POST /customers - Create a new customer.
async fn create_customer(
    State(state): State<AppState>,
    Json(request): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<CustomerResponse>), AppError> {
    let id = state.ledger.create_customer(&request.name)?;
    Ok((
        StatusCode::CREATED,
        Json(CustomerResponse {
            id: id.0,
            name: request.name,
        }),
    ))
}

/// GET /customers - List all customers, ordered by id.
async fn list_customers(State(state): State<AppState>) -> Json<Vec<CustomerResponse>> {
    let mut customers: Vec<CustomerResponse> = state
        .ledger
        .customers()
        .map(|entry| CustomerResponse {
            id: entry.value().id().0,
            name: entry.value().name().to_string(),
        })
        .collect();
    customers.sort_by_key(|customer| customer.id);
    Json(customers)
}

/// GET /customers/{id}/invoices - List a customer's invoices.
///
/// A non-existent customer yields an empty list, not a 404.
async fn list_customer_invoices(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(query): Query<CustomerInvoicesQuery>,
) -> Json<Vec<InvoiceSnapshot>> {
    let filter = InvoiceFilter {
        status: query.status,
        customer_id: None,
        from: query.from,
        to: query.to,
    };
    Json(state.ledger.customer_invoices(CustomerId(id), &filter))
}

/// POST /invoices - Create a new draft invoice.
async fn create_invoice(
    State(state): State<AppState>,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceSnapshot>), AppError> {
    let snapshot = state.ledger.create_invoice(
        CustomerId(request.customer_id),
        request.amount,
        &request.currency,
        request.issued_at,
        request.due_at,
    )?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// GET /invoices - List invoices with optional filters.
async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<ListInvoicesQuery>,
) -> Json<Vec<InvoiceSnapshot>> {
    let filter = InvoiceFilter {
        status: query.status,
        customer_id: query.customer_id.map(CustomerId),
        from: query.from,
        to: query.to,
    };
    Json(state.ledger.list_invoices(&filter))
}

/// GET /invoices/{id} - Get invoice details including payments.
async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<InvoiceSnapshot>, (StatusCode, Json<ErrorResponse>)> {
    state
        .ledger
        .get_invoice(InvoiceId(id))
        .map(Json)
        .ok_or_else(|| invoice_not_found(id))
}

/// POST /invoices/{id}/post - Send an invoice for payment (DRAFT -> PENDING).
async fn post_invoice(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<InvoiceSnapshot>, AppError> {
    let snapshot = state.ledger.post_invoice(InvoiceId(id))?;
    Ok(Json(snapshot))
}

/// POST /invoices/{id}/void - Cancel a pending invoice (PENDING -> VOID).
async fn void_invoice(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<InvoiceSnapshot>, AppError> {
    let snapshot = state.ledger.void_invoice(InvoiceId(id))?;
    Ok(Json(snapshot))
}

/// DELETE /invoices/{id} - Delete a draft invoice and its payments.
async fn delete_invoice(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, AppError> {
    state.ledger.delete_invoice(InvoiceId(id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /invoices/{id}/payments - Record a payment against an invoice.
async fn create_payment(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), AppError> {
    let payment = state
        .ledger
        .record_payment(InvoiceId(id), request.amount, request.paid_at)?;
    Ok((StatusCode::CREATED, Json(payment)))
}

// === Router ===

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/customers", post(create_customer).get(list_customers))
        .route("/customers/{id}/invoices", get(list_customer_invoices))
        .route("/invoices", post(create_invoice).get(list_invoices))
        .route(
            "/invoices/{id}",
            get(get_invoice).delete(delete_invoice),
        )
        .route("/invoices/{id}/post", post(post_invoice))
        .route("/invoices/{id}/void", post(void_invoice))
        .route("/invoices/{id}/payments", post(create_payment))
        .with_state(state)
}

// === Main ===

#[tokio::main]
async fn main() {
    env_logger::init();

    let state = AppState {
        ledger: Arc::new(Ledger::new()),
    };

    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:3000").await.unwrap();
    println!("Invoice ledger API server running on http://127.0.0.1:3000");
    println!();
    println!("Endpoints:");
    println!("  POST   /customers                - Create a customer");
    println!("  GET    /customers                - List customers");
    println!("  GET    /customers/:id/invoices   - List a customer's invoices");
    println!("  POST   /invoices                 - Create a draft invoice");
    println!("  GET    /invoices                 - List invoices (filterable)");
    println!("  GET    /invoices/:id             - Get an invoice with payments");
    println!("  POST   /invoices/:id/post        - Post a draft (DRAFT -> PENDING)");
    println!("  POST   /invoices/:id/void        - Void a pending invoice");
    println!("  DELETE /invoices/:id             - Delete a draft invoice");
    println!("  POST   /invoices/:id/payments    - Record a payment");

    axum::serve(listener, app).await.unwrap();
}
