use std::str::FromStr;

use chrono::Utc;
use rusqlite::{params, Connection, Row};

use crate::db::DatabaseError;
use crate::models::enums::{Currency, ExpenseStatus};
use crate::models::{Expense, ExpensePatch, NewExpense};

fn expense_from_row(row: &Row<'_>) -> rusqlite::Result<Expense> {
    let currency: String = row.get(4)?;
    let ocr_data: Option<String> = row.get(6)?;
    let status: String = row.get(12)?;
    Ok(Expense {
        id: row.get(0)?,
        company_id: row.get(1)?,
        description: row.get(2)?,
        amount: row.get(3)?,
        currency: Currency::from_str(&currency).unwrap_or(Currency::Usd),
        receipt_url: row.get(5)?,
        ocr_data: ocr_data.and_then(|s| serde_json::from_str(&s).ok()),
        date: row.get(7)?,
        category: row.get(8)?,
        vendor: row.get(9)?,
        tax_amount: row.get(10)?,
        tip_amount: row.get(11)?,
        status: ExpenseStatus::from_str(&status).unwrap_or(ExpenseStatus::Pending),
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

const EXPENSE_COLS: &str = "id, company_id, description, amount, currency, receipt_url, ocr_data, \
                            date, category, vendor, tax_amount, tip_amount, status, created_at, \
                            updated_at";

pub fn insert_expense(conn: &Connection, new: &NewExpense) -> Result<Expense, DatabaseError> {
    let now = Utc::now().naive_utc();
    let ocr_json = new
        .ocr_data
        .as_ref()
        .map(|v| serde_json::to_string(v).unwrap_or_default());
    conn.execute(
        "INSERT INTO expenses (company_id, description, amount, currency, receipt_url, ocr_data,
         date, category, vendor, tax_amount, tip_amount, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            new.company_id,
            new.description,
            new.amount,
            new.currency.as_str(),
            new.receipt_url,
            ocr_json,
            new.date,
            new.category,
            new.vendor,
            new.tax_amount,
            new.tip_amount,
            ExpenseStatus::Pending.as_str(),
            now,
            now
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_expense(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Expense".into(),
        id: id.to_string(),
    })
}

pub fn get_expense(conn: &Connection, id: i64) -> Result<Option<Expense>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("SELECT {EXPENSE_COLS} FROM expenses WHERE id = ?1"))?;
    let mut rows = stmt.query_map(params![id], expense_from_row)?;
    rows.next().transpose().map_err(DatabaseError::from)
}

/// List expenses newest-first, optionally filtered by company and category.
/// Date-descending order is what the reconciliation view expects.
pub fn list_expenses(
    conn: &Connection,
    company_id: Option<i64>,
    category: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Expense>, DatabaseError> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
    if let Some(cid) = company_id {
        clauses.push("company_id = ?");
        args.push(Box::new(cid));
    }
    if let Some(cat) = category {
        clauses.push("category = ?");
        args.push(Box::new(cat.to_string()));
    }
    let filter = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    args.push(Box::new(limit));
    args.push(Box::new(skip));

    let sql = format!(
        "SELECT {EXPENSE_COLS} FROM expenses {filter} ORDER BY date DESC, id DESC LIMIT ? OFFSET ?"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
        expense_from_row,
    )?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn update_expense(
    conn: &Connection,
    id: i64,
    patch: &ExpensePatch,
) -> Result<Option<Expense>, DatabaseError> {
    let Some(mut expense) = get_expense(conn, id)? else {
        return Ok(None);
    };

    if let Some(description) = &patch.description {
        expense.description = description.clone();
    }
    if let Some(amount) = patch.amount {
        expense.amount = amount;
    }
    if let Some(currency) = patch.currency {
        expense.currency = currency;
    }
    if let Some(category) = &patch.category {
        expense.category = Some(category.clone());
    }
    if let Some(vendor) = &patch.vendor {
        expense.vendor = Some(vendor.clone());
    }
    if let Some(tax_amount) = patch.tax_amount {
        expense.tax_amount = Some(tax_amount);
    }
    if let Some(tip_amount) = patch.tip_amount {
        expense.tip_amount = Some(tip_amount);
    }
    if let Some(status) = patch.status {
        expense.status = status;
    }
    expense.updated_at = Utc::now().naive_utc();

    conn.execute(
        "UPDATE expenses SET description = ?1, amount = ?2, currency = ?3, category = ?4,
         vendor = ?5, tax_amount = ?6, tip_amount = ?7, status = ?8, updated_at = ?9
         WHERE id = ?10",
        params![
            expense.description,
            expense.amount,
            expense.currency.as_str(),
            expense.category,
            expense.vendor,
            expense.tax_amount,
            expense.tip_amount,
            expense.status.as_str(),
            expense.updated_at,
            id
        ],
    )?;
    Ok(Some(expense))
}

pub fn delete_expense(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let affected = conn.execute("DELETE FROM expenses WHERE id = ?1", params![id])?;
    Ok(affected > 0)
}
