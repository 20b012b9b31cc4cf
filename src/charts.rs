// Per-variant render-call sequences.
//
// Each function binds one prepared shape to one chart rendering: append
// a slide, insert the chart, then apply the layout decision through the
// deck primitives. Rollback on failure is the orchestrator's job, so
// these stay plain `?`-propagating sequences.

use anyhow::Result;

use crate::deck::{AxisId, BubblePointData, ChartPayload, ChartTypeId, FontTarget, SeriesData, SlideDeck};
use crate::layout::{self, ChartFamily, LabelPosition, StyleConfig};
use crate::precision::unit_caption;
use crate::shape::{BubbleShape, MultiColumnShape, TwoColumnShape};

const CHART_LAYOUT: usize = 1;
const BUBBLE_LAYOUT: usize = 2;
const CHART_PLACEHOLDER: usize = 13;

fn two_column_payload(shape: &TwoColumnShape) -> ChartPayload {
    ChartPayload::Category {
        categories: shape.categories(),
        series: vec![SeriesData {
            name: shape.roles.value.clone(),
            values: shape.values(),
        }],
    }
}

fn multi_column_payload(shape: &MultiColumnShape) -> ChartPayload {
    ChartPayload::Category {
        categories: shape.categories(),
        series: shape
            .series
            .iter()
            .map(|name| SeriesData {
                name: name.clone(),
                values: shape.series_values(name),
            })
            .collect(),
    }
}

fn apply_layout(deck: &mut dyn SlideDeck, decision: &layout::LayoutDecision, format: &str) -> Result<()> {
    deck.set_font(FontTarget::CategoryLabels, decision.category_labels)?;
    deck.set_axis_visibility(AxisId::Value, decision.value_axis_visible)?;
    deck.set_gridlines(AxisId::Value, decision.value_gridlines_visible)?;
    if let Some(labels) = &decision.data_labels {
        deck.set_data_labels(format, labels.position)?;
        deck.set_font(FontTarget::DataLabels, labels.font)?;
    }
    if let Some(legend) = &decision.legend {
        deck.set_legend(*legend)?;
    }
    if let Some(width) = decision.gap_width {
        deck.set_gap_width(width)?;
    }
    Ok(())
}

fn set_axis_caption(deck: &mut dyn SlideDeck, shape_label: &str, unit: &str, order: i32) -> Result<()> {
    deck.set_caption(shape_label, &unit_caption(unit, order))
}

fn render_single_series(
    deck: &mut dyn SlideDeck,
    shape: &TwoColumnShape,
    core_message: &str,
    style: &StyleConfig,
    chart_type: ChartTypeId,
    family: ChartFamily,
) -> Result<()> {
    let decision = layout::compute(family, shape.table.row_count(), 1, style);

    deck.append_slide(CHART_LAYOUT)?;
    deck.set_slide_title(core_message)?;
    set_axis_caption(
        deck,
        &shape.roles.axis_label,
        &shape.roles.unit,
        shape.precision.order_of_magnitude,
    )?;
    deck.insert_chart(CHART_PLACEHOLDER, chart_type, two_column_payload(shape))?;
    apply_layout(deck, &decision, &shape.precision.number_format())
}

pub fn render_column(
    deck: &mut dyn SlideDeck,
    shape: &TwoColumnShape,
    core_message: &str,
    style: &StyleConfig,
) -> Result<()> {
    render_single_series(
        deck,
        shape,
        core_message,
        style,
        ChartTypeId::ColumnClustered,
        ChartFamily::Column,
    )
}

pub fn render_bar(
    deck: &mut dyn SlideDeck,
    shape: &TwoColumnShape,
    core_message: &str,
    style: &StyleConfig,
) -> Result<()> {
    render_single_series(
        deck,
        shape,
        core_message,
        style,
        ChartTypeId::BarClustered,
        ChartFamily::Bar,
    )
}

fn render_multi_series(
    deck: &mut dyn SlideDeck,
    shape: &MultiColumnShape,
    core_message: &str,
    style: &StyleConfig,
    chart_type: ChartTypeId,
    family: ChartFamily,
    format: &str,
) -> Result<()> {
    let decision = layout::compute(family, shape.table.row_count(), shape.series_count(), style);

    deck.append_slide(CHART_LAYOUT)?;
    deck.set_slide_title(core_message)?;
    set_axis_caption(
        deck,
        &shape.axis_label,
        &shape.unit,
        shape.precision.order_of_magnitude,
    )?;
    deck.insert_chart(CHART_PLACEHOLDER, chart_type, multi_column_payload(shape))?;
    apply_layout(deck, &decision, format)
}

pub fn render_clustered_column(
    deck: &mut dyn SlideDeck,
    shape: &MultiColumnShape,
    core_message: &str,
    style: &StyleConfig,
) -> Result<()> {
    render_multi_series(
        deck,
        shape,
        core_message,
        style,
        ChartTypeId::ColumnClustered,
        ChartFamily::ClusteredColumn,
        &shape.precision.number_format(),
    )
}

pub fn render_clustered_bar(
    deck: &mut dyn SlideDeck,
    shape: &MultiColumnShape,
    core_message: &str,
    style: &StyleConfig,
) -> Result<()> {
    render_multi_series(
        deck,
        shape,
        core_message,
        style,
        ChartTypeId::BarClustered,
        ChartFamily::ClusteredBar,
        &shape.precision.number_format(),
    )
}

pub fn render_stacked_column(
    deck: &mut dyn SlideDeck,
    shape: &MultiColumnShape,
    core_message: &str,
    style: &StyleConfig,
) -> Result<()> {
    render_multi_series(
        deck,
        shape,
        core_message,
        style,
        ChartTypeId::ColumnStacked,
        ChartFamily::StackedColumn,
        &shape.precision.number_format(),
    )
}

pub fn render_stacked_bar(
    deck: &mut dyn SlideDeck,
    shape: &MultiColumnShape,
    core_message: &str,
    style: &StyleConfig,
) -> Result<()> {
    render_multi_series(
        deck,
        shape,
        core_message,
        style,
        ChartTypeId::BarStacked,
        ChartFamily::StackedBar,
        &shape.precision.number_format(),
    )
}

/// 100%-stacked column. The shape's table must already be row-normalized;
/// the label format is the fixed percent directive regardless of the
/// computed precision.
pub fn render_stacked_100_column(
    deck: &mut dyn SlideDeck,
    shape: &MultiColumnShape,
    core_message: &str,
    style: &StyleConfig,
) -> Result<()> {
    let decision = layout::compute(
        ChartFamily::Stacked100Column,
        shape.table.row_count(),
        shape.series_count(),
        style,
    );

    deck.append_slide(CHART_LAYOUT)?;
    deck.set_slide_title(core_message)?;
    deck.insert_chart(
        CHART_PLACEHOLDER,
        ChartTypeId::ColumnStacked100,
        multi_column_payload(shape),
    )?;
    apply_layout(deck, &decision, "0%")
}

fn render_proportion(
    deck: &mut dyn SlideDeck,
    shape: &TwoColumnShape,
    core_message: &str,
    style: &StyleConfig,
    chart_type: ChartTypeId,
) -> Result<()> {
    let decision = layout::compute(ChartFamily::Pie, shape.table.row_count(), 1, style);

    deck.append_slide(CHART_LAYOUT)?;
    deck.set_slide_title(core_message)?;
    deck.insert_chart(
        CHART_PLACEHOLDER,
        chart_type,
        ChartPayload::Category {
            categories: shape.categories(),
            series: vec![SeriesData {
                name: "Percentage".to_string(),
                values: shape.values(),
            }],
        },
    )?;
    deck.set_axis_visibility(AxisId::Value, false)?;
    deck.set_gridlines(AxisId::Value, false)?;
    deck.set_data_labels("0%", LabelPosition::Center)?;
    if let Some(labels) = &decision.data_labels {
        deck.set_font(FontTarget::DataLabels, labels.font)?;
    }
    if let Some(legend) = &decision.legend {
        deck.set_legend(*legend)?;
    }
    Ok(())
}

/// Pie chart over the normalized, descending-sorted two-column shape.
pub fn render_pie(
    deck: &mut dyn SlideDeck,
    shape: &TwoColumnShape,
    core_message: &str,
    style: &StyleConfig,
) -> Result<()> {
    render_proportion(deck, shape, core_message, style, ChartTypeId::Pie)
}

pub fn render_doughnut(
    deck: &mut dyn SlideDeck,
    shape: &TwoColumnShape,
    core_message: &str,
    style: &StyleConfig,
) -> Result<()> {
    render_proportion(deck, shape, core_message, style, ChartTypeId::Doughnut)
}

/// Line chart: the axis label becomes an embedded chart title instead of
/// a caption.
pub fn render_line(
    deck: &mut dyn SlideDeck,
    shape: &MultiColumnShape,
    core_message: &str,
    style: &StyleConfig,
) -> Result<()> {
    let decision = layout::compute(
        ChartFamily::Line,
        shape.table.row_count(),
        shape.series_count(),
        style,
    );

    deck.append_slide(CHART_LAYOUT)?;
    deck.set_slide_title(core_message)?;
    deck.insert_chart(CHART_PLACEHOLDER, ChartTypeId::Line, multi_column_payload(shape))?;
    deck.set_chart_title(&shape.axis_label)?;
    deck.set_font(FontTarget::CategoryLabels, decision.category_labels)?;
    deck.set_font(FontTarget::ValueAxisLabels, decision.category_labels)?;
    deck.set_axis_visibility(AxisId::Value, decision.value_axis_visible)?;
    deck.set_gridlines(AxisId::Value, decision.value_gridlines_visible)?;
    if let Some(legend) = &decision.legend {
        deck.set_legend(*legend)?;
    }
    Ok(())
}

pub fn render_bubble(
    deck: &mut dyn SlideDeck,
    shape: &BubbleShape,
    core_message: &str,
    style: &StyleConfig,
) -> Result<()> {
    let decision = layout::compute(ChartFamily::Bubble, shape.points.len(), 1, style);

    deck.append_slide(BUBBLE_LAYOUT)?;
    deck.set_slide_title(core_message)?;
    deck.insert_chart(
        CHART_PLACEHOLDER,
        ChartTypeId::Bubble,
        ChartPayload::Bubble {
            points: shape.points.iter().map(BubblePointData::from).collect(),
        },
    )?;
    deck.set_font(FontTarget::CategoryLabels, decision.category_labels)?;
    deck.set_font(FontTarget::ValueAxisLabels, decision.category_labels)?;
    deck.set_gridlines(AxisId::Value, decision.value_gridlines_visible)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataTable;
    use crate::deck::{DeckCall, RecordingDeck};
    use crate::plan::TwoColumnRoles;
    use crate::precision::RoundingPrecision;

    fn make_shape() -> TwoColumnShape {
        TwoColumnShape {
            table: DataTable::new(
                vec!["Market".into(), "Units".into()],
                vec![
                    vec!["B".into(), "1000".into()],
                    vec!["A".into(), "1500".into()],
                ],
            ),
            roles: TwoColumnRoles {
                category: "Market".into(),
                value: "Units".into(),
                axis_label: "Units sold".into(),
                unit: "none".into(),
                has_natural_order: false,
            },
            precision: RoundingPrecision {
                order_of_magnitude: 3,
                decimal_place: 1,
            },
        }
    }

    #[test]
    fn test_column_render_sequence() {
        let mut deck = RecordingDeck::new();
        render_column(&mut deck, &make_shape(), "Units rise", &StyleConfig::default()).unwrap();

        assert_eq!(deck.slide_count(), 1);
        let calls = deck.calls();
        assert_eq!(calls[0], DeckCall::AppendSlide { layout: 1 });
        assert_eq!(
            calls[1],
            DeckCall::SetSlideTitle {
                text: "Units rise".into()
            }
        );
        assert_eq!(
            calls[2],
            DeckCall::SetCaption {
                axis_label: "Units sold".into(),
                unit_line: "in k".into()
            }
        );
        assert!(calls.iter().any(|c| matches!(
            c,
            DeckCall::SetDataLabels { format, position: LabelPosition::OutsideEnd } if format == "0.0,"
        )));
        assert!(calls.iter().any(|c| matches!(
            c,
            DeckCall::SetAxisVisibility { axis: AxisId::Value, visible: false }
        )));
    }

    #[test]
    fn test_pie_uses_fixed_percent_format() {
        let mut deck = RecordingDeck::new();
        render_pie(&mut deck, &make_shape(), "Shares", &StyleConfig::default()).unwrap();
        assert!(deck.calls().iter().any(|c| matches!(
            c,
            DeckCall::SetDataLabels { format, position: LabelPosition::Center } if format == "0%"
        )));
        // Proportion charts carry no axis caption.
        assert!(!deck
            .calls()
            .iter()
            .any(|c| matches!(c, DeckCall::SetCaption { .. })));
    }

    #[test]
    fn test_bubble_uses_bubble_layout() {
        let shape = BubbleShape {
            points: vec![crate::shape::BubblePoint {
                label: "A".into(),
                x: 25.0,
                y: 10.0,
                size: 500.0,
            }],
            roles: crate::plan::BubbleRoles {
                label_column: "Market".into(),
                x_column: "Share".into(),
                x_title: "Share (%)".into(),
                x_is_percentage: true,
                y_column: "Growth".into(),
                y_title: "Growth (%)".into(),
                y_is_percentage: true,
                size_column: "Size".into(),
                size_title: "Size".into(),
                title: "Markets".into(),
            },
        };
        let mut deck = RecordingDeck::new();
        render_bubble(&mut deck, &shape, "Markets", &StyleConfig::default()).unwrap();
        assert_eq!(deck.calls()[0], DeckCall::AppendSlide { layout: 2 });
    }
}
