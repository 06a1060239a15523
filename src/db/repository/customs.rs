use std::str::FromStr;

use chrono::Utc;
use rusqlite::{params, Connection, Row};

use crate::db::DatabaseError;
use crate::models::enums::{Currency, CustomsStatus};
use crate::models::{CustomsLog, CustomsLogPatch, NewCustomsLog};

fn customs_from_row(row: &Row<'_>) -> rusqlite::Result<CustomsLog> {
    let currency: String = row.get(7)?;
    let status: String = row.get(8)?;
    Ok(CustomsLog {
        id: row.get(0)?,
        company_id: row.get(1)?,
        expense_id: row.get(2)?,
        pedimento_number: row.get(3)?,
        bill_of_lading: row.get(4)?,
        import_date: row.get(5)?,
        customs_value: row.get(6)?,
        currency: Currency::from_str(&currency).unwrap_or(Currency::Usd),
        status: CustomsStatus::from_str(&status).unwrap_or(CustomsStatus::InProcess),
        notes: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

const CUSTOMS_COLS: &str = "id, company_id, expense_id, pedimento_number, bill_of_lading, \
                            import_date, customs_value, currency, status, notes, created_at, \
                            updated_at";

pub fn insert_customs_log(
    conn: &Connection,
    new: &NewCustomsLog,
) -> Result<CustomsLog, DatabaseError> {
    let now = Utc::now().naive_utc();
    conn.execute(
        "INSERT INTO customs_logs (company_id, expense_id, pedimento_number, bill_of_lading,
         import_date, customs_value, currency, status, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            new.company_id,
            new.expense_id,
            new.pedimento_number,
            new.bill_of_lading,
            new.import_date,
            new.customs_value,
            new.currency.as_str(),
            new.status.as_str(),
            new.notes,
            now,
            now
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_customs_log(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "CustomsLog".into(),
        id: id.to_string(),
    })
}

pub fn get_customs_log(conn: &Connection, id: i64) -> Result<Option<CustomsLog>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CUSTOMS_COLS} FROM customs_logs WHERE id = ?1"
    ))?;
    let mut rows = stmt.query_map(params![id], customs_from_row)?;
    rows.next().transpose().map_err(DatabaseError::from)
}

pub fn get_customs_log_by_pedimento(
    conn: &Connection,
    pedimento_number: &str,
) -> Result<Option<CustomsLog>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CUSTOMS_COLS} FROM customs_logs WHERE pedimento_number = ?1"
    ))?;
    let mut rows = stmt.query_map(params![pedimento_number], customs_from_row)?;
    rows.next().transpose().map_err(DatabaseError::from)
}

/// List customs logs newest-import-first, optionally filtered.
pub fn list_customs_logs(
    conn: &Connection,
    company_id: Option<i64>,
    status: Option<CustomsStatus>,
    skip: i64,
    limit: i64,
) -> Result<Vec<CustomsLog>, DatabaseError> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    if let Some(cid) = company_id {
        clauses.push("company_id = ?");
        args.push(Box::new(cid));
    }
    if let Some(st) = status {
        clauses.push("status = ?");
        args.push(Box::new(st.as_str().to_string()));
    }
    let filter = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    args.push(Box::new(limit));
    args.push(Box::new(skip));

    let sql = format!(
        "SELECT {CUSTOMS_COLS} FROM customs_logs {filter}
         ORDER BY import_date DESC, id DESC LIMIT ? OFFSET ?"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
        customs_from_row,
    )?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn update_customs_log(
    conn: &Connection,
    id: i64,
    patch: &CustomsLogPatch,
) -> Result<Option<CustomsLog>, DatabaseError> {
    let Some(mut log) = get_customs_log(conn, id)? else {
        return Ok(None);
    };

    if let Some(bol) = &patch.bill_of_lading {
        log.bill_of_lading = Some(bol.clone());
    }
    if let Some(value) = patch.customs_value {
        log.customs_value = value;
    }
    if let Some(status) = patch.status {
        log.status = status;
    }
    if let Some(notes) = &patch.notes {
        log.notes = Some(notes.clone());
    }
    log.updated_at = Utc::now().naive_utc();

    conn.execute(
        "UPDATE customs_logs SET bill_of_lading = ?1, customs_value = ?2, status = ?3,
         notes = ?4, updated_at = ?5 WHERE id = ?6",
        params![
            log.bill_of_lading,
            log.customs_value,
            log.status.as_str(),
            log.notes,
            log.updated_at,
            id
        ],
    )?;
    Ok(Some(log))
}

pub fn delete_customs_log(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let affected = conn.execute("DELETE FROM customs_logs WHERE id = ?1", params![id])?;
    Ok(affected > 0)
}
