use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::enums::{Currency, InvoiceStatus};

/// Invoice with server-computed tax. `tax_amount` and `total` are derived
/// from `subtotal` and the configured regional sales-tax rate, never
/// client-supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub company_id: i64,
    pub invoice_number: String,
    pub date: NaiveDate,
    pub subtotal: f64,
    pub tax_amount: f64,
    pub total: f64,
    pub currency: Currency,
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Creation payload. Tax fields are computed server-side.
#[derive(Debug, Clone, Deserialize)]
pub struct NewInvoice {
    pub company_id: i64,
    pub invoice_number: String,
    pub date: NaiveDate,
    pub subtotal: f64,
    #[serde(default = "default_currency")]
    pub currency: Currency,
    #[serde(default = "default_status")]
    pub status: InvoiceStatus,
    pub notes: Option<String>,
}

fn default_currency() -> Currency {
    Currency::Usd
}

fn default_status() -> InvoiceStatus {
    InvoiceStatus::Pending
}

/// Partial update. A new subtotal triggers tax recomputation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoicePatch {
    pub subtotal: Option<f64>,
    pub status: Option<InvoiceStatus>,
    pub notes: Option<String>,
}
