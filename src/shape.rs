// Prepared chart shapes.
//
// A shape is the output of one pipeline run: the transformed table plus
// the resolved roles and formatting precision, ready for any number of
// render-call sequences to consume.

use crate::data::DataTable;
use crate::plan::{BubbleRoles, TwoColumnRoles};
use crate::precision::RoundingPrecision;

/// One category column, one value column. Feeds column/bar and, after
/// normalization, pie/doughnut renderings.
#[derive(Debug, Clone)]
pub struct TwoColumnShape {
    pub table: DataTable,
    pub roles: TwoColumnRoles,
    pub precision: RoundingPrecision,
}

impl TwoColumnShape {
    pub fn categories(&self) -> Vec<String> {
        self.table
            .column_index(&self.roles.category)
            .map(|col| self.table.text_column(col))
            .unwrap_or_default()
    }

    pub fn values(&self) -> Vec<f64> {
        self.table
            .column_index(&self.roles.value)
            .map(|col| {
                (0..self.table.row_count())
                    .map(|row| self.table.numeric_cell(row, col).unwrap_or(0.0))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// One category column, many series columns. The roles are fully
/// resolved here: for long-format input the category and series names
/// come from the reshaped headers, not from the oracle.
#[derive(Debug, Clone)]
pub struct MultiColumnShape {
    pub table: DataTable,
    pub category: String,
    pub series: Vec<String>,
    pub axis_label: String,
    pub unit: String,
    pub precision: RoundingPrecision,
}

impl MultiColumnShape {
    pub fn categories(&self) -> Vec<String> {
        self.table
            .column_index(&self.category)
            .map(|col| self.table.text_column(col))
            .unwrap_or_default()
    }

    pub fn series_values(&self, name: &str) -> Vec<f64> {
        self.table
            .column_index(name)
            .map(|col| {
                (0..self.table.row_count())
                    .map(|row| self.table.numeric_cell(row, col).unwrap_or(0.0))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BubblePoint {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

/// Label/x/y/size rows for the bubble rendering, percentage scaling
/// already applied.
#[derive(Debug, Clone)]
pub struct BubbleShape {
    pub points: Vec<BubblePoint>,
    pub roles: BubbleRoles,
}
