use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::enums::{Currency, ExpenseStatus};

/// Expense record, typically materialized from a reviewed OCR result.
/// `ocr_data` keeps the raw extraction for audit; `receipt_url` points at
/// the stored upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub company_id: i64,
    pub description: String,
    pub amount: f64,
    pub currency: Currency,
    pub receipt_url: Option<String>,
    pub ocr_data: Option<serde_json::Value>,
    pub date: NaiveDate,
    pub category: Option<String>,
    pub vendor: Option<String>,
    pub tax_amount: Option<f64>,
    pub tip_amount: Option<f64>,
    pub status: ExpenseStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Creation payload (after human review of the OCR result).
#[derive(Debug, Clone, Deserialize)]
pub struct NewExpense {
    pub company_id: i64,
    pub description: String,
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: Currency,
    pub receipt_url: Option<String>,
    pub ocr_data: Option<serde_json::Value>,
    pub date: NaiveDate,
    pub category: Option<String>,
    pub vendor: Option<String>,
    pub tax_amount: Option<f64>,
    pub tip_amount: Option<f64>,
}

fn default_currency() -> Currency {
    Currency::Usd
}

/// Partial update, used for manual corrections after OCR review.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpensePatch {
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<Currency>,
    pub category: Option<String>,
    pub vendor: Option<String>,
    pub tax_amount: Option<f64>,
    pub tip_amount: Option<f64>,
    pub status: Option<ExpenseStatus>,
}
