// Advisory pre-flight validation of the input dataset.
//
// The engine proceeds regardless of the outcome; hints exist so a caller
// can surface dataset problems before blaming the chart plan.

use serde::Serialize;

use crate::data::{parse_number, DataTable};

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub hints: Vec<String>,
}

pub fn validate(table: &DataTable) -> ValidationReport {
    let mut hints = Vec::new();

    if table
        .headers
        .iter()
        .any(|h| h.trim().is_empty() || h.contains("_EMPTY"))
    {
        hints.push("Data contains empty headers. Please provide valid headers.".to_string());
    } else {
        // Duplicate check only makes sense once headers are present
        let mut seen = std::collections::HashSet::new();
        if table.headers.iter().any(|h| !seen.insert(h.as_str())) {
            hints.push(
                "Data contains duplicated headers. Please ensure your headers are unique."
                    .to_string(),
            );
        }
    }

    let missing: Vec<String> = table
        .rows
        .iter()
        .enumerate()
        .flat_map(|(row_idx, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, cell)| cell.trim().is_empty())
                .map(move |(col_idx, _)| (row_idx, col_idx))
        })
        .map(|(row_idx, col_idx)| {
            format!(
                "[row number: {}, column header: {}]",
                row_idx + 2,
                table.headers.get(col_idx).map(String::as_str).unwrap_or("?")
            )
        })
        .collect();
    if !missing.is_empty() {
        hints.push(format!(
            "Data contains missing values. Please fill missing values at: {}",
            missing.join("")
        ));
    }

    let mut mixed_columns = Vec::new();
    let mut any_numeric_column = false;
    for (col_idx, header) in table.headers.iter().enumerate() {
        let mut numeric = 0usize;
        let mut text = 0usize;
        for row in &table.rows {
            let cell = row.get(col_idx).map(String::as_str).unwrap_or("");
            if cell.trim().is_empty() {
                continue;
            }
            if parse_number(cell).is_some() {
                numeric += 1;
            } else {
                text += 1;
            }
        }
        if numeric > 0 {
            any_numeric_column = true;
        }
        if numeric > 0 && text > 0 {
            mixed_columns.push(header.clone());
        }
    }

    if !mixed_columns.is_empty() {
        hints.push(format!(
            "The following columns are formatted inconsistently (e.g. contain text and numbers): {}",
            mixed_columns.join(", ")
        ));
    }

    if !any_numeric_column {
        hints.push(
            "Could not find any numbers in your data - please check your formatting \
             (e.g. remove units from entries)"
                .to_string(),
        );
    }

    ValidationReport {
        is_valid: hints.is_empty(),
        hints,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_table(headers: &[&str], rows: &[&[&str]]) -> DataTable {
        DataTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_clean_table_is_valid() {
        let table = make_table(&["Market", "Units"], &[&["DE", "10"], &["FR", "20"]]);
        let report = validate(&table);
        assert!(report.is_valid);
        assert!(report.hints.is_empty());
    }

    #[test]
    fn test_empty_header_hint() {
        let table = make_table(&["Market", ""], &[&["DE", "10"]]);
        let report = validate(&table);
        assert!(!report.is_valid);
        assert!(report.hints[0].contains("empty headers"));
    }

    #[test]
    fn test_duplicate_header_hint() {
        let table = make_table(&["Market", "Market"], &[&["DE", "10"]]);
        let report = validate(&table);
        assert!(report.hints.iter().any(|h| h.contains("duplicated")));
    }

    #[test]
    fn test_missing_value_location() {
        let table = make_table(&["Market", "Units"], &[&["DE", "10"], &["FR", ""]]);
        let report = validate(&table);
        assert!(report
            .hints
            .iter()
            .any(|h| h.contains("row number: 3") && h.contains("Units")));
    }

    #[test]
    fn test_mixed_column_hint() {
        let table = make_table(&["Units"], &[&["10"], &["ten"]]);
        let report = validate(&table);
        assert!(report.hints.iter().any(|h| h.contains("inconsistently")));
    }

    #[test]
    fn test_no_numbers_hint() {
        let table = make_table(&["Market"], &[&["DE"], &["FR"]]);
        let report = validate(&table);
        assert!(report.hints.iter().any(|h| h.contains("any numbers")));
    }
}
