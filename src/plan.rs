// Chart plan contract: what the classification oracle answers.
//
// The plan arrives as a JSON document (a pre-recorded oracle answer); the
// `ChartAdvisor` trait is the seam where a live classification service
// would plug in without touching the orchestrator.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::data::DataTable;

/// Closed enumeration of selectable chart variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartKind {
    #[serde(rename = "column_chart")]
    Column,
    #[serde(rename = "clustered_column_chart")]
    ClusteredColumn,
    #[serde(rename = "stacked_column_chart")]
    StackedColumn,
    #[serde(rename = "100_percent_stacked_column_chart")]
    Stacked100Column,
    #[serde(rename = "pie_chart")]
    Pie,
    #[serde(rename = "line_chart")]
    Line,
    #[serde(rename = "bubble_chart")]
    Bubble,
}

/// Which prepared dataset a chart variant consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeClass {
    TwoColumn,
    MultiColumn,
    Bubble,
}

impl ChartKind {
    pub fn shape_class(&self) -> ShapeClass {
        match self {
            ChartKind::Column | ChartKind::Pie => ShapeClass::TwoColumn,
            ChartKind::ClusteredColumn
            | ChartKind::StackedColumn
            | ChartKind::Stacked100Column
            | ChartKind::Line => ShapeClass::MultiColumn,
            ChartKind::Bubble => ShapeClass::Bubble,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            ChartKind::Column => "column_chart",
            ChartKind::ClusteredColumn => "clustered_column_chart",
            ChartKind::StackedColumn => "stacked_column_chart",
            ChartKind::Stacked100Column => "100_percent_stacked_column_chart",
            ChartKind::Pie => "pie_chart",
            ChartKind::Line => "line_chart",
            ChartKind::Bubble => "bubble_chart",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl fmt::Display for ShapeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeClass::TwoColumn => "two-column",
            ShapeClass::MultiColumn => "multi-column",
            ShapeClass::Bubble => "bubble",
        };
        f.write_str(name)
    }
}

/// Roles for the two-column shape: one category column, one value column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoColumnRoles {
    pub category: String,
    pub value: String,
    pub axis_label: String,
    pub unit: String,
    pub has_natural_order: bool,
}

/// Roles for the multi-column shape: one category column, many series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiColumnRoles {
    pub category: String,
    pub series: Vec<String>,
    pub axis_label: String,
    pub unit: String,
    pub has_natural_order: bool,
}

/// Reshape roles used when the dataset arrives in long format. The
/// multi-column category/series columns are taken from the reshaped
/// headers afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongFormatRoles {
    pub index: String,
    pub variable: String,
    pub value: String,
    pub axis_label: String,
    pub unit: String,
    pub has_natural_order: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BubbleRoles {
    pub label_column: String,
    pub x_column: String,
    pub x_title: String,
    pub x_is_percentage: bool,
    pub y_column: String,
    pub y_title: String,
    pub y_is_percentage: bool,
    pub size_column: String,
    pub size_title: String,
    pub title: String,
}

/// The oracle's full answer for one batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartPlan {
    #[serde(default)]
    pub reason: String,
    pub charts: Vec<ChartKind>,
    #[serde(default)]
    pub is_long_format: bool,
    #[serde(default)]
    pub last_row_is_total: bool,
    #[serde(default)]
    pub two_column: Option<TwoColumnRoles>,
    #[serde(default)]
    pub multi_column: Option<MultiColumnRoles>,
    #[serde(default)]
    pub long_format: Option<LongFormatRoles>,
    #[serde(default)]
    pub bubble: Option<BubbleRoles>,
}

impl ChartPlan {
    pub fn from_json(text: &str) -> Result<Self> {
        let plan: ChartPlan = serde_json::from_str(text).context("Failed to parse chart plan")?;
        if plan.charts.is_empty() {
            bail!("Chart plan must select at least one chart");
        }
        Ok(plan)
    }

    /// The distinct shape classes the selected variants require, in
    /// selection order.
    pub fn required_shapes(&self) -> Vec<ShapeClass> {
        let mut shapes = Vec::new();
        for kind in &self.charts {
            let shape = kind.shape_class();
            if !shapes.contains(&shape) {
                shapes.push(shape);
            }
        }
        shapes
    }
}

/// Seam for chart-type selection. The core never talks to a model; it
/// consumes whatever a `ChartAdvisor` answers.
pub trait ChartAdvisor {
    fn advise(&self, table: &DataTable, core_message: &str) -> Result<ChartPlan>;
}

/// Advisor backed by a pre-recorded plan file.
pub struct PlanFile {
    path: PathBuf,
}

impl PlanFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ChartAdvisor for PlanFile {
    fn advise(&self, _table: &DataTable, _core_message: &str) -> Result<ChartPlan> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read plan file '{}'", self.path.display()))?;
        ChartPlan::from_json(&text)
    }
}
