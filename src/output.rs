use crate::error::OutputError;
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), OutputError> {
    let csv_err = |source| OutputError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut wtr = csv::Writer::from_path(path).map_err(csv_err)?;
    for r in rows {
        wtr.serialize(r).map_err(csv_err)?;
    }
    wtr.flush().map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), rows = rows.len(), "csv written");
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), OutputError> {
    let s = serde_json::to_string_pretty(value).map_err(|source| OutputError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, s).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "json written");
    Ok(())
}

/// Render the first `max_rows` rows as a markdown table.
pub fn render_table_rows<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}\n", render_table_rows(rows, max_rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountExportRow, AccountStatus, ComparisonRow};

    #[test]
    fn account_export_has_contract_columns() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("accounts.csv");
        let rows = vec![AccountExportRow {
            id: 12441,
            city: "AFOGADOS DA INGAZEIRA".into(),
            customer_name: "GRAFICA PAJEU".into(),
            salesperson: "VALDIR".into(),
            average_monthly: 7322.5,
            current_amount: 7973.3,
            status: AccountStatus::RetainedGrowth,
        }];
        write_csv(&path, &rows).expect("csv written");

        let text = std::fs::read_to_string(&path).expect("read back");
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,city,customer_name,salesperson,average_monthly,current_amount,status")
        );
        assert_eq!(
            lines.next(),
            Some("12441,AFOGADOS DA INGAZEIRA,GRAFICA PAJEU,VALDIR,7322.5,7973.3,Retained-Growth")
        );
    }

    #[test]
    fn json_written_pretty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("summary.json");
        write_json(&path, &serde_json::json!({"total": 1})).expect("json written");
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read back")).expect("valid");
        assert_eq!(value["total"], 1);
    }

    #[test]
    fn write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("out.csv");
        let rows: Vec<AccountExportRow> = Vec::new();
        assert!(matches!(write_csv(&path, &rows), Err(OutputError::Csv { .. })));
    }

    #[test]
    fn markdown_preview_truncates() {
        let rows: Vec<ComparisonRow> = (1..=3)
            .map(|rank| ComparisonRow {
                rank,
                id: rank as i64,
                customer_name: format!("C{rank}"),
                before: "1.00".into(),
                after: "2.00".into(),
            })
            .collect();
        let table = render_table_rows(&rows, 2);
        assert!(table.contains("| Rank |"));
        assert!(table.contains("C2"));
        assert!(!table.contains("C3"));
        assert_eq!(render_table_rows::<ComparisonRow>(&[], 2), "(no rows)");
    }
}
