use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::io::Read;

/// Tabular dataset: ordered named columns over shared row indices.
///
/// Cells are stored as text and parsed to numbers on demand; a cell is
/// numeric if it parses as f64. Transformations never mutate a table in
/// place, they build a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DataTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Read a CSV document with a header row.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()
            .context("Failed to read CSV headers")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record.context("Failed to read CSV record")?;
            let mut row: Vec<String> = record.iter().map(|c| c.trim().to_string()).collect();
            // Short records pad out so every row matches the header width
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(anyhow!("CSV must contain at least one data row"));
        }

        Ok(Self { headers, rows })
    }

    /// Build a table from a JSON array of objects. Headers come from the
    /// first object; missing fields become empty cells.
    pub fn from_json(value: &Value) -> Result<Self> {
        let array = value
            .as_array()
            .ok_or_else(|| anyhow!("Input data must be a JSON array of objects"))?;

        if array.is_empty() {
            return Err(anyhow!("Input data array is empty"));
        }

        let first_obj = array[0]
            .as_object()
            .ok_or_else(|| anyhow!("Items in array must be objects"))?;

        let headers: Vec<String> = first_obj.keys().cloned().collect();

        let mut rows = Vec::new();
        for item in array {
            let obj = item
                .as_object()
                .ok_or_else(|| anyhow!("Items in array must be objects"))?;

            let mut row = Vec::new();
            for header in &headers {
                let cell = match obj.get(header) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    Some(Value::Bool(b)) => b.to_string(),
                    Some(Value::Null) | None => String::new(),
                    _ => return Err(anyhow!("Unsupported value type for field '{}'", header)),
                };
                row.push(cell);
            }
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    /// Find a column by name, case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
    }

    /// Parse one cell as a number. Empty and non-numeric cells yield None.
    pub fn numeric_cell(&self, row: usize, col: usize) -> Option<f64> {
        let cell = self.rows.get(row)?.get(col)?;
        parse_number(cell)
    }

    /// All parseable numeric values in a column, skipping empty and
    /// non-numeric cells.
    pub fn numeric_column(&self, col: usize) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row.get(col).and_then(|c| parse_number(c)))
            .collect()
    }

    /// All cells of a column as text.
    pub fn text_column(&self, col: usize) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.get(col).cloned().unwrap_or_default())
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

pub fn parse_number(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Render a number back into a cell, keeping integers free of a
/// trailing ".0" so aggregated tables stay readable.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_csv() {
        let csv = "Market,Units sold\nGermany,1200\nFrance,800\n";
        let table = DataTable::from_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["Market", "Units sold"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.numeric_cell(0, 1), Some(1200.0));
    }

    #[test]
    fn test_from_csv_pads_short_rows() {
        let csv = "a,b,c\n1,2\n";
        let table = DataTable::from_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.rows[0], vec!["1", "2", ""]);
    }

    #[test]
    fn test_from_csv_empty_fails() {
        let csv = "a,b\n";
        assert!(DataTable::from_csv(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_from_json() {
        let value: Value =
            serde_json::from_str(r#"[{"x": 1, "y": "a"}, {"x": 2.5, "y": null}]"#).unwrap();
        let table = DataTable::from_json(&value).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.numeric_cell(1, 0), Some(2.5));
        assert_eq!(table.rows[1][1], "");
    }

    #[test]
    fn test_column_lookup_is_case_insensitive() {
        let table = DataTable::new(vec!["Market".into()], vec![vec!["x".into()]]);
        assert_eq!(table.column_index("market"), Some(0));
        assert_eq!(table.column_index("value"), None);
    }

    #[test]
    fn test_numeric_column_skips_text() {
        let table = DataTable::new(
            vec!["v".into()],
            vec![vec!["1".into()], vec!["n/a".into()], vec!["3".into()]],
        );
        assert_eq!(table.numeric_column(0), vec![1.0, 3.0]);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1200.0), "1200");
        assert_eq!(format_number(1.5), "1.5");
    }
}
