use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Multi-tenant company record. EIN is the US tax id (unique),
/// RFC the Mexican one (optional for US-only tenants).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub ein: String,
    pub state_tax_id: Option<String>,
    pub rfc: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Creation payload.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCompany {
    pub name: String,
    pub ein: String,
    pub state_tax_id: Option<String>,
    pub rfc: Option<String>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyPatch {
    pub name: Option<String>,
    pub state_tax_id: Option<String>,
    pub rfc: Option<String>,
}
