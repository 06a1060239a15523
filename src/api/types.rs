//! Request/response DTOs shared across endpoints.

use serde::{Deserialize, Serialize};

use crate::models::enums::CustomsStatus;

fn default_limit() -> i64 {
    100
}

/// Offset/limit pagination.
#[derive(Debug, Clone, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
        }
    }
}

/// Filters for expense listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseListQuery {
    pub company_id: Option<i64>,
    pub category: Option<String>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// Filters for invoice listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceListQuery {
    pub company_id: Option<i64>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// Filters for customs log listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomsListQuery {
    pub company_id: Option<i64>,
    pub status: Option<CustomsStatus>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_reconciliation_limit() -> i64 {
    50
}

/// Reconciliation query: company scope plus pagination over its expenses.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationQuery {
    pub company_id: i64,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_reconciliation_limit")]
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
