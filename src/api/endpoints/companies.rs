//! Company CRUD.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::types::Pagination;
use crate::api::{ApiError, AppState};
use crate::db::repository;
use crate::models::{Company, CompanyPatch, NewCompany};

pub async fn create_company(
    State(state): State<AppState>,
    Json(new): Json<NewCompany>,
) -> Result<(StatusCode, Json<Company>), ApiError> {
    if new.name.is_empty() || new.name.chars().count() > 255 {
        return Err(ApiError::BadRequest("name must be 1-255 characters".into()));
    }
    if new.ein.len() < 9 {
        return Err(ApiError::BadRequest("EIN must be at least 9 characters".into()));
    }

    let conn = state.db()?;
    if repository::get_company_by_ein(&conn, &new.ein)?.is_some() {
        return Err(ApiError::BadRequest(
            "Company with this EIN already exists".into(),
        ));
    }
    let company = repository::insert_company(&conn, &new)?;
    Ok((StatusCode::CREATED, Json(company)))
}

pub async fn list_companies(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Company>>, ApiError> {
    let conn = state.db()?;
    Ok(Json(repository::list_companies(&conn, page.skip, page.limit)?))
}

pub async fn get_company(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Company>, ApiError> {
    let conn = state.db()?;
    repository::get_company(&conn, id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Company not found".into()))
}

pub async fn update_company(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<CompanyPatch>,
) -> Result<Json<Company>, ApiError> {
    let conn = state.db()?;
    repository::update_company(&conn, id, &patch)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Company not found".into()))
}

pub async fn delete_company(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let conn = state.db()?;
    if repository::delete_company(&conn, id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Company not found".into()))
    }
}
