//! Invoice CRUD with server-side tax computation.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use crate::api::types::InvoiceListQuery;
use crate::api::{ApiError, AppState};
use crate::db::repository;
use crate::models::{Invoice, InvoicePatch, NewInvoice};

pub async fn create_invoice(
    State(state): State<AppState>,
    Json(new): Json<NewInvoice>,
) -> Result<(StatusCode, Json<Invoice>), ApiError> {
    if new.subtotal <= 0.0 {
        return Err(ApiError::BadRequest("subtotal must be positive".into()));
    }

    let conn = state.db()?;
    if repository::get_company(&conn, new.company_id)?.is_none() {
        return Err(ApiError::NotFound("Company not found".into()));
    }
    if repository::get_invoice_by_number(&conn, &new.invoice_number)?.is_some() {
        return Err(ApiError::BadRequest(
            "Invoice number already exists".into(),
        ));
    }

    let (tax_amount, total) = state.config.compute_invoice_tax(new.subtotal);
    let invoice = repository::insert_invoice(&conn, &new, tax_amount, total)?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<InvoiceListQuery>,
) -> Result<Json<Vec<Invoice>>, ApiError> {
    let conn = state.db()?;
    Ok(Json(repository::list_invoices(
        &conn,
        query.company_id,
        query.skip,
        query.limit,
    )?))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Invoice>, ApiError> {
    let conn = state.db()?;
    repository::get_invoice(&conn, id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Invoice not found".into()))
}

/// Update an invoice; a changed subtotal recomputes tax and total.
pub async fn update_invoice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<InvoicePatch>,
) -> Result<Json<Invoice>, ApiError> {
    let conn = state.db()?;
    let Some(mut invoice) = repository::get_invoice(&conn, id)? else {
        return Err(ApiError::NotFound("Invoice not found".into()));
    };

    if let Some(subtotal) = patch.subtotal {
        if subtotal <= 0.0 {
            return Err(ApiError::BadRequest("subtotal must be positive".into()));
        }
        let (tax_amount, total) = state.config.compute_invoice_tax(subtotal);
        invoice.subtotal = subtotal;
        invoice.tax_amount = tax_amount;
        invoice.total = total;
    }
    if let Some(status) = patch.status {
        invoice.status = status;
    }
    if let Some(notes) = patch.notes {
        invoice.notes = Some(notes);
    }
    invoice.updated_at = Utc::now().naive_utc();

    repository::update_invoice(&conn, &invoice)?;
    Ok(Json(invoice))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let conn = state.db()?;
    if repository::delete_invoice(&conn, id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Invoice not found".into()))
    }
}
