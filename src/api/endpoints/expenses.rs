//! Expense CRUD plus the receipt upload endpoint.
//!
//! Upload flow: validate and store the file, run the recognition pipeline on
//! a blocking worker under a timeout, classify confidence, and return the
//! result for human review. The expense itself is only created later, after
//! the user confirms or corrects the extracted values.

use std::time::Duration;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::types::ExpenseListQuery;
use crate::api::{ApiError, AppState};
use crate::db::repository;
use crate::models::{Expense, ExpensePatch, NewExpense};
use crate::pipeline::extraction::{confidence, ExtractionError, OcrOutcome};

pub async fn upload_receipt(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<OcrOutcome>, ApiError> {
    let upload = read_upload(multipart).await?;

    {
        let conn = state.db()?;
        if repository::get_company(&conn, upload.company_id)?.is_none() {
            return Err(ApiError::NotFound("Company not found".into()));
        }
    }

    let stored = state
        .uploads
        .save(&upload.filename, &upload.content_type, &upload.bytes)?;
    tracing::info!(
        company_id = upload.company_id,
        url = %stored.url,
        "Receipt stored, starting recognition"
    );

    // Recognition is CPU-bound and unbounded in latency for multi-page
    // documents: run it on the blocking pool with a hard timeout.
    let processor = state.processor.clone();
    let content_type = upload.content_type.clone();
    let bytes = upload.bytes;
    let timeout_secs = state.config.recognition_timeout_secs;

    let task = tokio::task::spawn_blocking(move || processor.process(&bytes, &content_type));
    let joined = tokio::time::timeout(Duration::from_secs(timeout_secs), task)
        .await
        .map_err(|_| ExtractionError::RecognitionTimeout { secs: timeout_secs })
        .map_err(ApiError::from)?;
    let (raw_text, currency, fields) = joined
        .map_err(|e| ApiError::Internal(format!("recognition task failed: {e}")))??;

    let confidence = confidence::classify(&fields);
    Ok(Json(OcrOutcome {
        raw_text,
        detected_currency: currency,
        extracted_fields: fields,
        confidence,
    }))
}

struct ReceiptUpload {
    company_id: i64,
    filename: String,
    content_type: String,
    bytes: axum::body::Bytes,
}

/// Pull the `file` and `company_id` parts out of the multipart body.
async fn read_upload(mut multipart: Multipart) -> Result<ReceiptUpload, ApiError> {
    let mut company_id: Option<i64> = None;
    let mut file: Option<(String, String, axum::body::Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("company_id") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("bad company_id field: {e}")))?;
                company_id = Some(
                    raw.trim()
                        .parse()
                        .map_err(|_| ApiError::BadRequest("company_id must be an integer".into()))?,
                );
            }
            Some("file") => {
                let filename = crate::pipeline::import::sanitize_filename(
                    field.file_name().unwrap_or("receipt"),
                );
                let content_type = field.content_type().unwrap_or("").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed reading upload: {e}")))?;
                file = Some((filename, content_type, bytes));
            }
            _ => {}
        }
    }

    let (filename, content_type, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("missing file field".into()))?;
    let company_id =
        company_id.ok_or_else(|| ApiError::BadRequest("missing company_id field".into()))?;

    Ok(ReceiptUpload {
        company_id,
        filename,
        content_type,
        bytes,
    })
}

pub async fn create_expense(
    State(state): State<AppState>,
    Json(new): Json<NewExpense>,
) -> Result<(StatusCode, Json<Expense>), ApiError> {
    if new.description.is_empty() || new.description.chars().count() > 500 {
        return Err(ApiError::BadRequest(
            "description must be 1-500 characters".into(),
        ));
    }
    if new.amount <= 0.0 {
        return Err(ApiError::BadRequest("amount must be positive".into()));
    }

    let conn = state.db()?;
    if repository::get_company(&conn, new.company_id)?.is_none() {
        return Err(ApiError::NotFound("Company not found".into()));
    }
    let expense = repository::insert_expense(&conn, &new)?;
    Ok((StatusCode::CREATED, Json(expense)))
}

pub async fn list_expenses(
    State(state): State<AppState>,
    Query(query): Query<ExpenseListQuery>,
) -> Result<Json<Vec<Expense>>, ApiError> {
    let conn = state.db()?;
    Ok(Json(repository::list_expenses(
        &conn,
        query.company_id,
        query.category.as_deref(),
        query.skip,
        query.limit,
    )?))
}

pub async fn get_expense(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Expense>, ApiError> {
    let conn = state.db()?;
    repository::get_expense(&conn, id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Expense not found".into()))
}

/// Manual corrections after OCR review.
pub async fn update_expense(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<ExpensePatch>,
) -> Result<Json<Expense>, ApiError> {
    let conn = state.db()?;
    repository::update_expense(&conn, id, &patch)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Expense not found".into()))
}

pub async fn delete_expense(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let conn = state.db()?;
    let Some(expense) = repository::get_expense(&conn, id)? else {
        return Err(ApiError::NotFound("Expense not found".into()));
    };

    // Remove the stored receipt alongside the record.
    if let Some(url) = &expense.receipt_url {
        if let Some(name) = url.strip_prefix("/uploads/") {
            let path = state.uploads.dir().join(name);
            if let Err(e) = state.uploads.delete(&path) {
                tracing::warn!(url = %url, error = %e, "Failed to delete stored receipt");
            }
        }
    }

    repository::delete_expense(&conn, id)?;
    Ok(StatusCode::NO_CONTENT)
}
