use chrono::Utc;
use rusqlite::{params, Connection, Row};

use crate::db::DatabaseError;
use crate::models::{Company, CompanyPatch, NewCompany};

fn company_from_row(row: &Row<'_>) -> rusqlite::Result<Company> {
    Ok(Company {
        id: row.get(0)?,
        name: row.get(1)?,
        ein: row.get(2)?,
        state_tax_id: row.get(3)?,
        rfc: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

const COMPANY_COLS: &str = "id, name, ein, state_tax_id, rfc, created_at, updated_at";

pub fn insert_company(conn: &Connection, new: &NewCompany) -> Result<Company, DatabaseError> {
    let now = Utc::now().naive_utc();
    conn.execute(
        "INSERT INTO companies (name, ein, state_tax_id, rfc, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![new.name, new.ein, new.state_tax_id, new.rfc, now, now],
    )?;
    let id = conn.last_insert_rowid();
    get_company(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Company".into(),
        id: id.to_string(),
    })
}

pub fn get_company(conn: &Connection, id: i64) -> Result<Option<Company>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COMPANY_COLS} FROM companies WHERE id = ?1"
    ))?;
    let mut rows = stmt.query_map(params![id], company_from_row)?;
    rows.next().transpose().map_err(DatabaseError::from)
}

pub fn get_company_by_ein(conn: &Connection, ein: &str) -> Result<Option<Company>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COMPANY_COLS} FROM companies WHERE ein = ?1"
    ))?;
    let mut rows = stmt.query_map(params![ein], company_from_row)?;
    rows.next().transpose().map_err(DatabaseError::from)
}

pub fn list_companies(
    conn: &Connection,
    skip: i64,
    limit: i64,
) -> Result<Vec<Company>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COMPANY_COLS} FROM companies ORDER BY id LIMIT ?1 OFFSET ?2"
    ))?;
    let rows = stmt.query_map(params![limit, skip], company_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn update_company(
    conn: &Connection,
    id: i64,
    patch: &CompanyPatch,
) -> Result<Option<Company>, DatabaseError> {
    let Some(mut company) = get_company(conn, id)? else {
        return Ok(None);
    };

    if let Some(name) = &patch.name {
        company.name = name.clone();
    }
    if let Some(state_tax_id) = &patch.state_tax_id {
        company.state_tax_id = Some(state_tax_id.clone());
    }
    if let Some(rfc) = &patch.rfc {
        company.rfc = Some(rfc.clone());
    }
    company.updated_at = Utc::now().naive_utc();

    conn.execute(
        "UPDATE companies SET name = ?1, state_tax_id = ?2, rfc = ?3, updated_at = ?4
         WHERE id = ?5",
        params![
            company.name,
            company.state_tax_id,
            company.rfc,
            company.updated_at,
            id
        ],
    )?;
    Ok(Some(company))
}

pub fn delete_company(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let affected = conn.execute("DELETE FROM companies WHERE id = ?1", params![id])?;
    Ok(affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    fn sample() -> NewCompany {
        NewCompany {
            name: "Laredo Freight LLC".into(),
            ein: "12-3456789".into(),
            state_tax_id: Some("TX-998877".into()),
            rfc: None,
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let created = insert_company(&conn, &sample()).unwrap();
        let fetched = get_company(&conn, created.id).unwrap().unwrap();
        assert_eq!(fetched.name, "Laredo Freight LLC");
        assert_eq!(fetched.ein, "12-3456789");
        assert_eq!(fetched.rfc, None);
    }

    #[test]
    fn ein_lookup_finds_company() {
        let conn = open_memory_database().unwrap();
        insert_company(&conn, &sample()).unwrap();
        assert!(get_company_by_ein(&conn, "12-3456789").unwrap().is_some());
        assert!(get_company_by_ein(&conn, "00-0000000").unwrap().is_none());
    }

    #[test]
    fn duplicate_ein_rejected_by_schema() {
        let conn = open_memory_database().unwrap();
        insert_company(&conn, &sample()).unwrap();
        assert!(insert_company(&conn, &sample()).is_err());
    }

    #[test]
    fn patch_updates_only_given_fields() {
        let conn = open_memory_database().unwrap();
        let created = insert_company(&conn, &sample()).unwrap();
        let patch = CompanyPatch {
            rfc: Some("LFL010203AB1".into()),
            ..Default::default()
        };
        let updated = update_company(&conn, created.id, &patch).unwrap().unwrap();
        assert_eq!(updated.rfc.as_deref(), Some("LFL010203AB1"));
        assert_eq!(updated.name, "Laredo Freight LLC");
    }

    #[test]
    fn delete_reports_missing_rows() {
        let conn = open_memory_database().unwrap();
        let created = insert_company(&conn, &sample()).unwrap();
        assert!(delete_company(&conn, created.id).unwrap());
        assert!(!delete_company(&conn, created.id).unwrap());
    }

    #[test]
    fn list_respects_pagination() {
        let conn = open_memory_database().unwrap();
        for i in 0..5 {
            let new = NewCompany {
                name: format!("Company {i}"),
                ein: format!("11-000000{i}"),
                state_tax_id: None,
                rfc: None,
            };
            insert_company(&conn, &new).unwrap();
        }
        let page = list_companies(&conn, 2, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].name, "Company 2");
    }
}
