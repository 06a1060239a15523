use std::str::FromStr;

use chrono::Utc;
use rusqlite::{params, Connection, Row};

use crate::db::DatabaseError;
use crate::models::enums::{Currency, InvoiceStatus};
use crate::models::{Invoice, NewInvoice};

fn invoice_from_row(row: &Row<'_>) -> rusqlite::Result<Invoice> {
    let currency: String = row.get(7)?;
    let status: String = row.get(8)?;
    Ok(Invoice {
        id: row.get(0)?,
        company_id: row.get(1)?,
        invoice_number: row.get(2)?,
        date: row.get(3)?,
        subtotal: row.get(4)?,
        tax_amount: row.get(5)?,
        total: row.get(6)?,
        currency: Currency::from_str(&currency).unwrap_or(Currency::Usd),
        status: InvoiceStatus::from_str(&status).unwrap_or(InvoiceStatus::Pending),
        notes: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

const INVOICE_COLS: &str = "id, company_id, invoice_number, date, subtotal, tax_amount, total, \
                            currency, status, notes, created_at, updated_at";

/// Insert an invoice with already-computed tax fields.
/// Tax derivation from subtotal lives in the API layer policy, not here.
pub fn insert_invoice(
    conn: &Connection,
    new: &NewInvoice,
    tax_amount: f64,
    total: f64,
) -> Result<Invoice, DatabaseError> {
    let now = Utc::now().naive_utc();
    conn.execute(
        "INSERT INTO invoices (company_id, invoice_number, date, subtotal, tax_amount, total,
         currency, status, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            new.company_id,
            new.invoice_number,
            new.date,
            new.subtotal,
            tax_amount,
            total,
            new.currency.as_str(),
            new.status.as_str(),
            new.notes,
            now,
            now
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_invoice(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Invoice".into(),
        id: id.to_string(),
    })
}

pub fn get_invoice(conn: &Connection, id: i64) -> Result<Option<Invoice>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("SELECT {INVOICE_COLS} FROM invoices WHERE id = ?1"))?;
    let mut rows = stmt.query_map(params![id], invoice_from_row)?;
    rows.next().transpose().map_err(DatabaseError::from)
}

pub fn get_invoice_by_number(
    conn: &Connection,
    invoice_number: &str,
) -> Result<Option<Invoice>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {INVOICE_COLS} FROM invoices WHERE invoice_number = ?1"
    ))?;
    let mut rows = stmt.query_map(params![invoice_number], invoice_from_row)?;
    rows.next().transpose().map_err(DatabaseError::from)
}

pub fn list_invoices(
    conn: &Connection,
    company_id: Option<i64>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Invoice>, DatabaseError> {
    match company_id {
        Some(cid) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {INVOICE_COLS} FROM invoices WHERE company_id = ?1
                 ORDER BY id LIMIT ?2 OFFSET ?3"
            ))?;
            let rows = stmt.query_map(params![cid, limit, skip], invoice_from_row)?;
            rows.map(|r| r.map_err(DatabaseError::from)).collect()
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {INVOICE_COLS} FROM invoices ORDER BY id LIMIT ?1 OFFSET ?2"
            ))?;
            let rows = stmt.query_map(params![limit, skip], invoice_from_row)?;
            rows.map(|r| r.map_err(DatabaseError::from)).collect()
        }
    }
}

/// Persist an updated invoice. The caller owns recomputation of the
/// tax fields; this writes the row back verbatim.
pub fn update_invoice(conn: &Connection, invoice: &Invoice) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE invoices SET subtotal = ?1, tax_amount = ?2, total = ?3, status = ?4,
         notes = ?5, updated_at = ?6 WHERE id = ?7",
        params![
            invoice.subtotal,
            invoice.tax_amount,
            invoice.total,
            invoice.status.as_str(),
            invoice.notes,
            invoice.updated_at,
            invoice.id
        ],
    )?;
    Ok(())
}

pub fn delete_invoice(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let affected = conn.execute("DELETE FROM invoices WHERE id = ?1", params![id])?;
    Ok(affected > 0)
}
