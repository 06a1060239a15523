//! Reconciliation view: company expenses matched against the bank feed.
//!
//! Runs off-cycle against the persisted expense set. Each request builds its
//! own in-memory transaction pool, so claim tracking needs no locking.

use axum::extract::{Query, State};
use axum::Json;

use crate::api::types::ReconciliationQuery;
use crate::api::{ApiError, AppState};
use crate::db::repository;
use crate::pipeline::reconcile::{reconcile, ReconciliationItem};

pub async fn get_reconciliation(
    State(state): State<AppState>,
    Query(query): Query<ReconciliationQuery>,
) -> Result<Json<Vec<ReconciliationItem>>, ApiError> {
    let conn = state.db()?;
    if repository::get_company(&conn, query.company_id)?.is_none() {
        return Err(ApiError::NotFound("Company not found".into()));
    }

    let expenses = repository::list_expenses(
        &conn,
        Some(query.company_id),
        None,
        query.skip,
        query.limit,
    )?;
    drop(conn);

    if expenses.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let transactions = state.bank_feed.transactions_for(&expenses);
    Ok(Json(reconcile(&expenses, &transactions)))
}
