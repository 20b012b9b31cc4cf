// Layout policy computer.
//
// Maps dataset cardinality to visual parameters per chart family.
// Stepwise thresholds, no interpolation, no I/O, no errors; counts of
// zero or less clamp to the smallest bucket.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Immutable style configuration passed into layout computation and
/// render calls. One value per batch, no process-wide state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleConfig {
    pub series_fill: Rgb,
    pub category_label: Rgb,
    pub axis_tick_label: Rgb,
    pub caption_unit: Rgb,
    pub gridline: Rgb,
    pub stacked_label: Rgb,
    pub title: Rgb,
    pub title_size: u32,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            series_fill: Rgb(3, 90, 65),
            category_label: Rgb(58, 58, 58),
            axis_tick_label: Rgb(89, 89, 89),
            caption_unit: Rgb(116, 116, 116),
            gridline: Rgb(217, 217, 217),
            stacked_label: Rgb(255, 255, 255),
            title: Rgb(58, 58, 58),
            title_size: 18,
        }
    }
}

/// Chart families the layout policy distinguishes. Families, not
/// variants: a pie and its doughnut counterpart share one policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartFamily {
    Column,
    Bar,
    ClusteredColumn,
    ClusteredBar,
    StackedColumn,
    StackedBar,
    Stacked100Column,
    Pie,
    Line,
    Bubble,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontSpec {
    pub size: u32,
    pub bold: bool,
    pub color: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelPosition {
    OutsideEnd,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataLabelStyle {
    pub font: FontSpec,
    pub position: LabelPosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendStyle {
    pub size: u32,
}

/// Everything a render sequence needs to style one chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutDecision {
    pub category_labels: FontSpec,
    pub data_labels: Option<DataLabelStyle>,
    pub value_axis_visible: bool,
    pub value_gridlines_visible: bool,
    pub legend: Option<LegendStyle>,
    pub gap_width: Option<u32>,
}

/// Three-tier data-label ladder for single-series families.
fn single_series_label_size(category_count: usize) -> u32 {
    if category_count < 11 {
        16
    } else if category_count < 16 {
        14
    } else {
        12
    }
}

/// Two-tier ladder keyed to the series count for stacked families.
fn stacked_label_size(series_count: usize) -> u32 {
    if series_count < 4 {
        14
    } else {
        12
    }
}

pub fn compute(
    family: ChartFamily,
    category_count: usize,
    series_count: usize,
    style: &StyleConfig,
) -> LayoutDecision {
    let category_count = category_count.max(1);
    let series_count = series_count.max(1);
    let point_count = category_count * series_count;

    let dark_label = |size: u32, bold: bool| FontSpec {
        size,
        bold,
        color: style.category_label,
    };
    let green_outside = |size: u32| DataLabelStyle {
        font: FontSpec {
            size,
            bold: true,
            color: style.series_fill,
        },
        position: LabelPosition::OutsideEnd,
    };
    let white_center = |size: u32| DataLabelStyle {
        font: FontSpec {
            size,
            bold: true,
            color: style.stacked_label,
        },
        position: LabelPosition::Center,
    };

    match family {
        ChartFamily::Column => LayoutDecision {
            category_labels: dark_label(
                if category_count < 11 { 14 } else { 12 },
                category_count < 11,
            ),
            data_labels: Some(green_outside(single_series_label_size(category_count))),
            value_axis_visible: false,
            value_gridlines_visible: false,
            legend: None,
            gap_width: None,
        },
        ChartFamily::Bar => LayoutDecision {
            category_labels: dark_label(
                if category_count < 16 { 14 } else { 10 },
                category_count < 11,
            ),
            data_labels: Some(green_outside(single_series_label_size(category_count))),
            value_axis_visible: false,
            value_gridlines_visible: true,
            legend: None,
            gap_width: None,
        },
        ChartFamily::ClusteredColumn => {
            let dense = point_count >= 20;
            LayoutDecision {
                category_labels: dark_label(12, true),
                data_labels: (!dense).then(|| green_outside(12)),
                value_axis_visible: dense,
                value_gridlines_visible: dense,
                legend: Some(LegendStyle { size: 12 }),
                gap_width: None,
            }
        }
        ChartFamily::ClusteredBar => {
            let dense = point_count >= 11;
            LayoutDecision {
                category_labels: dark_label(12, true),
                data_labels: (!dense).then(|| green_outside(12)),
                value_axis_visible: dense,
                value_gridlines_visible: dense,
                legend: Some(LegendStyle { size: 12 }),
                gap_width: None,
            }
        }
        ChartFamily::StackedColumn | ChartFamily::StackedBar | ChartFamily::Stacked100Column => {
            LayoutDecision {
                category_labels: dark_label(14, true),
                data_labels: Some(white_center(stacked_label_size(series_count))),
                value_axis_visible: false,
                value_gridlines_visible: false,
                legend: Some(LegendStyle { size: 12 }),
                gap_width: Some(100),
            }
        }
        ChartFamily::Pie => LayoutDecision {
            category_labels: dark_label(12, false),
            data_labels: Some(white_center(16)),
            value_axis_visible: false,
            value_gridlines_visible: false,
            legend: Some(LegendStyle { size: 10 }),
            gap_width: None,
        },
        ChartFamily::Line | ChartFamily::Bubble => LayoutDecision {
            category_labels: FontSpec {
                size: 12,
                bold: false,
                color: style.axis_tick_label,
            },
            data_labels: None,
            value_axis_visible: true,
            value_gridlines_visible: true,
            legend: matches!(family, ChartFamily::Line).then(|| LegendStyle { size: 12 }),
            gap_width: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> StyleConfig {
        StyleConfig::default()
    }

    #[test]
    fn test_column_category_label_boundary() {
        let below = compute(ChartFamily::Column, 10, 1, &style());
        assert_eq!(below.category_labels.size, 14);
        assert!(below.category_labels.bold);

        // The switch point itself already takes the large-count style.
        let at = compute(ChartFamily::Column, 11, 1, &style());
        assert_eq!(at.category_labels.size, 12);
        assert!(!at.category_labels.bold);
    }

    #[test]
    fn test_bar_category_label_ladder() {
        assert_eq!(compute(ChartFamily::Bar, 15, 1, &style()).category_labels.size, 14);
        assert_eq!(compute(ChartFamily::Bar, 16, 1, &style()).category_labels.size, 10);
        assert!(compute(ChartFamily::Bar, 10, 1, &style()).category_labels.bold);
        assert!(!compute(ChartFamily::Bar, 11, 1, &style()).category_labels.bold);
    }

    #[test]
    fn test_single_series_data_label_ladder() {
        let sizes: Vec<u32> = [10, 11, 15, 16]
            .iter()
            .map(|&n| {
                compute(ChartFamily::Bar, n, 1, &style())
                    .data_labels
                    .unwrap()
                    .font
                    .size
            })
            .collect();
        assert_eq!(sizes, vec![16, 14, 14, 12]);
    }

    #[test]
    fn test_stacked_label_size_by_series() {
        let small = compute(ChartFamily::StackedColumn, 5, 3, &style());
        assert_eq!(small.data_labels.unwrap().font.size, 14);
        let large = compute(ChartFamily::StackedColumn, 5, 4, &style());
        assert_eq!(large.data_labels.unwrap().font.size, 12);
        assert_eq!(large.gap_width, Some(100));
    }

    #[test]
    fn test_clustered_column_density_threshold() {
        let sparse = compute(ChartFamily::ClusteredColumn, 9, 2, &style());
        assert!(!sparse.value_axis_visible);
        assert!(sparse.data_labels.is_some());

        let dense = compute(ChartFamily::ClusteredColumn, 10, 2, &style());
        assert!(dense.value_axis_visible);
        assert!(dense.data_labels.is_none());
    }

    #[test]
    fn test_clustered_bar_density_threshold() {
        let sparse = compute(ChartFamily::ClusteredBar, 5, 2, &style());
        assert!(!sparse.value_axis_visible);
        let dense = compute(ChartFamily::ClusteredBar, 6, 2, &style());
        assert!(dense.value_axis_visible);
    }

    #[test]
    fn test_out_of_range_counts_clamp() {
        let decision = compute(ChartFamily::Column, 0, 0, &style());
        assert_eq!(decision.category_labels.size, 14);
        assert!(decision.category_labels.bold);
    }

    #[test]
    fn test_stacked_labels_centered_white() {
        let decision = compute(ChartFamily::Stacked100Column, 5, 2, &style());
        let labels = decision.data_labels.unwrap();
        assert_eq!(labels.position, LabelPosition::Center);
        assert_eq!(labels.font.color, Rgb(255, 255, 255));
    }

    #[test]
    fn test_pie_legend_smaller_than_clustered() {
        let pie = compute(ChartFamily::Pie, 4, 1, &style());
        assert_eq!(pie.legend.unwrap().size, 10);
        let clustered = compute(ChartFamily::ClusteredColumn, 4, 2, &style());
        assert_eq!(clustered.legend.unwrap().size, 12);
    }
}
