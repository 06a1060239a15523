use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::enums::{Currency, CustomsStatus};

/// Customs log entry for cross-border import tracking.
/// The pedimento number (Mexican import declaration) is globally unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomsLog {
    pub id: i64,
    pub company_id: i64,
    pub expense_id: Option<i64>,
    pub pedimento_number: String,
    pub bill_of_lading: Option<String>,
    pub import_date: NaiveDate,
    pub customs_value: f64,
    pub currency: Currency,
    pub status: CustomsStatus,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Creation payload.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCustomsLog {
    pub company_id: i64,
    pub expense_id: Option<i64>,
    pub pedimento_number: String,
    pub bill_of_lading: Option<String>,
    pub import_date: NaiveDate,
    pub customs_value: f64,
    #[serde(default = "default_currency")]
    pub currency: Currency,
    #[serde(default = "default_status")]
    pub status: CustomsStatus,
    pub notes: Option<String>,
}

fn default_currency() -> Currency {
    Currency::Usd
}

fn default_status() -> CustomsStatus {
    CustomsStatus::InProcess
}

/// Partial update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomsLogPatch {
    pub bill_of_lading: Option<String>,
    pub customs_value: Option<f64>,
    pub status: Option<CustomsStatus>,
    pub notes: Option<String>,
}
