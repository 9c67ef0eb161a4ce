use crate::config::{is_null_marker, ColumnMapping};
use crate::error::NormalizeError;
use crate::model::{AccountRow, AssignmentTable};

/// Load an assignment table from CSV text, applying the column mapping.
///
/// Parent and owner cells matching one of `null_markers` (or blank) are
/// read as missing. Every cell is kept so the table can be written back
/// with only the owner column changed.
pub fn load_csv_table(
    csv_data: &str,
    columns: &ColumnMapping,
    null_markers: &[String],
) -> Result<AssignmentTable, NormalizeError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let idx = |name: &str| -> Result<usize, NormalizeError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| NormalizeError::MissingColumn { column: name.into() })
    };

    let account_idx = idx(&columns.account_id)?;
    let parent_idx = idx(&columns.parent_account_id)?;
    let owner_idx = idx(&columns.owner)?;

    let nullable = |value: &str| -> Option<String> {
        if is_null_marker(value, null_markers) {
            None
        } else {
            Some(value.trim().to_string())
        }
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let fields: Vec<String> = record.iter().map(|f| f.to_string()).collect();

        rows.push(AccountRow {
            account_id: record.get(account_idx).unwrap_or("").trim().to_string(),
            parent_account_id: nullable(record.get(parent_idx).unwrap_or("")),
            owner: nullable(record.get(owner_idx).unwrap_or("")),
            fields,
        });
    }

    log::debug!("loaded {} account rows, {} columns", rows.len(), headers.len());

    Ok(AssignmentTable {
        headers,
        owner_column: owner_idx,
        rows,
    })
}

/// Write the table back to CSV. Unassigned owners become empty cells.
pub fn write_csv_table(table: &AssignmentTable) -> Result<String, NormalizeError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(&row.fields)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| NormalizeError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| NormalizeError::Csv(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NormalizeConfig;

    fn columns() -> ColumnMapping {
        ColumnMapping {
            account_id: "sfdc_id".into(),
            parent_account_id: "parent_id".into(),
            owner: "csm".into(),
        }
    }

    #[test]
    fn load_csv_basic() {
        let csv = "\
sfdc_id,name,parent_id,csm,arr
A1,Acme East,P1,Xena,1200
A2,Acme West,P1,NaN,900
B1,Beta,,Yuri,300
";
        let config = NormalizeConfig::default();
        let table = load_csv_table(csv, &columns(), &config.null_markers).unwrap();
        assert_eq!(table.headers, vec!["sfdc_id", "name", "parent_id", "csm", "arr"]);
        assert_eq!(table.owner_column, 3);
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[0].account_id, "A1");
        assert_eq!(table.rows[0].parent_account_id.as_deref(), Some("P1"));
        assert_eq!(table.rows[0].owner.as_deref(), Some("Xena"));
        assert_eq!(table.rows[1].owner, None);
        assert_eq!(table.rows[2].parent_account_id, None);
        assert_eq!(table.rows[2].fields[4], "300");
    }

    #[test]
    fn load_csv_missing_column() {
        let csv = "sfdc_id,parent_id\nA1,P1\n";
        let err = load_csv_table(csv, &columns(), &[]).unwrap_err();
        assert!(matches!(err, NormalizeError::MissingColumn { ref column } if column == "csm"));
    }

    #[test]
    fn load_csv_ragged_row_fails() {
        let csv = "sfdc_id,parent_id,csm\nA1,P1\n";
        let err = load_csv_table(csv, &columns(), &[]).unwrap_err();
        assert!(matches!(err, NormalizeError::Csv(_)));
    }

    #[test]
    fn custom_null_markers() {
        let csv = "sfdc_id,parent_id,csm\nA1,-,unassigned\n";
        let markers = vec!["-".to_string(), "unassigned".to_string()];
        let table = load_csv_table(csv, &columns(), &markers).unwrap();
        assert_eq!(table.rows[0].parent_account_id, None);
        assert_eq!(table.rows[0].owner, None);
    }

    #[test]
    fn write_preserves_other_columns() {
        let csv = "\
sfdc_id,name,parent_id,csm
A1,\"Acme, Inc\",P1,Xena
A2,Acme West,P1,Yuri
";
        let table = load_csv_table(csv, &columns(), &[]).unwrap();
        let result = crate::engine::normalize_assignments(&table, 5).unwrap();
        let out = write_csv_table(&result.table).unwrap();
        assert_eq!(
            out,
            "sfdc_id,name,parent_id,csm\nA1,\"Acme, Inc\",P1,Xena\nA2,Acme West,P1,Xena\n"
        );
    }
}
