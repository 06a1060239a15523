//! Customs log CRUD (pedimento tracking).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::types::CustomsListQuery;
use crate::api::{ApiError, AppState};
use crate::db::repository;
use crate::models::{CustomsLog, CustomsLogPatch, NewCustomsLog};

pub async fn create_customs_log(
    State(state): State<AppState>,
    Json(new): Json<NewCustomsLog>,
) -> Result<(StatusCode, Json<CustomsLog>), ApiError> {
    if new.customs_value <= 0.0 {
        return Err(ApiError::BadRequest("customs_value must be positive".into()));
    }

    let conn = state.db()?;
    if repository::get_company(&conn, new.company_id)?.is_none() {
        return Err(ApiError::NotFound("Company not found".into()));
    }
    if repository::get_customs_log_by_pedimento(&conn, &new.pedimento_number)?.is_some() {
        return Err(ApiError::BadRequest(
            "Pedimento number already exists".into(),
        ));
    }
    if let Some(expense_id) = new.expense_id {
        if repository::get_expense(&conn, expense_id)?.is_none() {
            return Err(ApiError::NotFound("Expense not found".into()));
        }
    }

    let log = repository::insert_customs_log(&conn, &new)?;
    Ok((StatusCode::CREATED, Json(log)))
}

pub async fn list_customs_logs(
    State(state): State<AppState>,
    Query(query): Query<CustomsListQuery>,
) -> Result<Json<Vec<CustomsLog>>, ApiError> {
    let conn = state.db()?;
    Ok(Json(repository::list_customs_logs(
        &conn,
        query.company_id,
        query.status,
        query.skip,
        query.limit,
    )?))
}

pub async fn get_customs_log(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CustomsLog>, ApiError> {
    let conn = state.db()?;
    repository::get_customs_log(&conn, id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Customs log not found".into()))
}

pub async fn update_customs_log(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<CustomsLogPatch>,
) -> Result<Json<CustomsLog>, ApiError> {
    let conn = state.db()?;
    repository::update_customs_log(&conn, id, &patch)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Customs log not found".into()))
}

pub async fn delete_customs_log(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let conn = state.db()?;
    if repository::delete_customs_log(&conn, id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Customs log not found".into()))
    }
}
