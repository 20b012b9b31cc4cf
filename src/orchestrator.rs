// Batch driver.
//
// Prepares each required shape once, dispatches the selected variants in
// plan order, and isolates failure at the finest granularity: a failed
// shape only skips its dependents, a failed rendering only rolls back
// its own slide.

use serde::Serialize;
use tracing::{info, warn};

use crate::charts;
use crate::data::DataTable;
use crate::deck::SlideDeck;
use crate::error::ChartError;
use crate::layout::StyleConfig;
use crate::plan::{ChartKind, ChartPlan, ShapeClass};
use crate::shape::{BubbleShape, MultiColumnShape, TwoColumnShape};
use crate::transform;

/// Result of one render attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RenderOutcome {
    Succeeded,
    Failed(String),
    Skipped(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderRecord {
    pub variant: String,
    pub rendering: String,
    pub outcome: RenderOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeckReport {
    pub records: Vec<RenderRecord>,
    pub slide_count: usize,
}

/// Drive one batch: prepare shapes, render every selected variant into
/// the deck, and fail only when nothing at all was produced.
pub fn run_batch(
    deck: &mut dyn SlideDeck,
    table: &DataTable,
    core_message: &str,
    plan: &ChartPlan,
    style: &StyleConfig,
) -> Result<DeckReport, ChartError> {
    let required = plan.required_shapes();

    let two_column = prepare_shape(&required, ShapeClass::TwoColumn, || {
        let roles = plan
            .two_column
            .as_ref()
            .ok_or_else(|| ChartError::missing_column("<two-column role mapping>"))?;
        transform::prepare_two_column(table, roles, plan.last_row_is_total)
    });
    let multi_column = prepare_shape(&required, ShapeClass::MultiColumn, || {
        transform::prepare_multi_column(table, plan)
    });
    let bubble = prepare_shape(&required, ShapeClass::Bubble, || {
        transform::prepare_bubble(table, plan)
    });

    let mut records = Vec::new();
    for kind in &plan.charts {
        dispatch(
            deck,
            *kind,
            core_message,
            style,
            &two_column,
            &multi_column,
            &bubble,
            &mut records,
        );
    }

    let slide_count = deck.slide_count();
    if slide_count == 0 {
        return Err(ChartError::NoSlidesProduced);
    }

    info!(slides = slide_count, "batch complete");
    Ok(DeckReport {
        records,
        slide_count,
    })
}

type PreparedShape<T> = Option<Result<T, String>>;

fn prepare_shape<T>(
    required: &[ShapeClass],
    shape: ShapeClass,
    prepare: impl FnOnce() -> Result<T, ChartError>,
) -> PreparedShape<T> {
    if !required.contains(&shape) {
        return None;
    }
    match prepare() {
        Ok(prepared) => Some(Ok(prepared)),
        Err(error) => {
            warn!(shape = %shape, error = %error, "shape preparation failed, skipping dependent variants");
            Some(Err(error.to_string()))
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn dispatch(
    deck: &mut dyn SlideDeck,
    kind: ChartKind,
    core_message: &str,
    style: &StyleConfig,
    two_column: &PreparedShape<TwoColumnShape>,
    multi_column: &PreparedShape<MultiColumnShape>,
    bubble: &PreparedShape<BubbleShape>,
    records: &mut Vec<RenderRecord>,
) {
    // Variants producing two renderings share one prepared shape; each
    // rendering is attempted independently.
    match kind {
        ChartKind::Column => with_shape(two_column, kind, &["column_clustered", "bar_clustered"], records, |shape| {
            vec![
                attempt(deck, kind, "column_clustered", |d| {
                    charts::render_column(d, shape, core_message, style)
                }),
                attempt(deck, kind, "bar_clustered", |d| {
                    charts::render_bar(d, shape, core_message, style)
                }),
            ]
        }),
        ChartKind::Pie => with_shape(two_column, kind, &["pie", "doughnut"], records, |shape| {
            // Proportions sort descending by the normalized value.
            let derived = transform::normalize_single_column(&shape.table, &shape.roles.value)
                .and_then(|t| transform::sort_descending_by_column(&t, &shape.roles.value));
            match derived {
                Ok(table) => {
                    let pie_shape = TwoColumnShape {
                        table,
                        roles: shape.roles.clone(),
                        precision: shape.precision,
                    };
                    vec![
                        attempt(deck, kind, "pie", |d| {
                            charts::render_pie(d, &pie_shape, core_message, style)
                        }),
                        attempt(deck, kind, "doughnut", |d| {
                            charts::render_doughnut(d, &pie_shape, core_message, style)
                        }),
                    ]
                }
                Err(error) => {
                    warn!(variant = %kind, error = %error, "normalization failed");
                    vec![
                        make_record(kind, "pie", RenderOutcome::Failed(error.to_string())),
                        make_record(kind, "doughnut", RenderOutcome::Failed(error.to_string())),
                    ]
                }
            }
        }),
        ChartKind::ClusteredColumn => {
            with_shape(multi_column, kind, &["column_clustered", "bar_clustered"], records, |shape| {
                vec![
                    attempt(deck, kind, "column_clustered", |d| {
                        charts::render_clustered_column(d, shape, core_message, style)
                    }),
                    attempt(deck, kind, "bar_clustered", |d| {
                        charts::render_clustered_bar(d, shape, core_message, style)
                    }),
                ]
            })
        }
        ChartKind::StackedColumn => {
            with_shape(multi_column, kind, &["column_stacked", "bar_stacked"], records, |shape| {
                vec![
                    attempt(deck, kind, "column_stacked", |d| {
                        charts::render_stacked_column(d, shape, core_message, style)
                    }),
                    attempt(deck, kind, "bar_stacked", |d| {
                        charts::render_stacked_bar(d, shape, core_message, style)
                    }),
                ]
            })
        }
        ChartKind::Stacked100Column => {
            with_shape(multi_column, kind, &["column_stacked_100"], records, |shape| {
                let derived = transform::normalize_rows_to_percent(&shape.table, &shape.series);
                match derived {
                    Ok(table) => {
                        let normalized = MultiColumnShape {
                            table,
                            ..shape.clone()
                        };
                        vec![attempt(deck, kind, "column_stacked_100", |d| {
                            charts::render_stacked_100_column(d, &normalized, core_message, style)
                        })]
                    }
                    Err(error) => {
                        warn!(variant = %kind, error = %error, "normalization failed");
                        vec![make_record(
                            kind,
                            "column_stacked_100",
                            RenderOutcome::Failed(error.to_string()),
                        )]
                    }
                }
            })
        }
        ChartKind::Line => with_shape(multi_column, kind, &["line"], records, |shape| {
            vec![attempt(deck, kind, "line", |d| {
                charts::render_line(d, shape, core_message, style)
            })]
        }),
        ChartKind::Bubble => with_shape(bubble, kind, &["bubble"], records, |shape| {
            vec![attempt(deck, kind, "bubble", |d| {
                charts::render_bubble(d, shape, core_message, style)
            })]
        }),
    }
}

fn make_record(kind: ChartKind, rendering: &str, outcome: RenderOutcome) -> RenderRecord {
    RenderRecord {
        variant: kind.id().to_string(),
        rendering: rendering.to_string(),
        outcome,
    }
}

fn with_shape<T>(
    shape: &PreparedShape<T>,
    kind: ChartKind,
    renderings: &[&str],
    records: &mut Vec<RenderRecord>,
    render: impl FnOnce(&T) -> Vec<RenderRecord>,
) {
    match shape {
        Some(Ok(prepared)) => records.extend(render(prepared)),
        Some(Err(reason)) => {
            for rendering in renderings {
                records.push(make_record(
                    kind,
                    rendering,
                    RenderOutcome::Skipped(reason.clone()),
                ));
            }
        }
        None => {
            // Unreachable for a well-formed plan: required_shapes() covers
            // every selected variant's shape class.
            for rendering in renderings {
                records.push(make_record(
                    kind,
                    rendering,
                    RenderOutcome::Skipped("shape not prepared".to_string()),
                ));
            }
        }
    }
}

/// Run one render-call sequence with rollback isolation: a failed
/// attempt removes only the slide it actually appended, then the batch
/// moves on.
fn attempt(
    deck: &mut dyn SlideDeck,
    kind: ChartKind,
    rendering: &str,
    render: impl FnOnce(&mut dyn SlideDeck) -> anyhow::Result<()>,
) -> RenderRecord {
    let slides_before = deck.slide_count();
    match render(deck) {
        Ok(()) => make_record(kind, rendering, RenderOutcome::Succeeded),
        Err(source) => {
            if deck.slide_count() > slides_before {
                if let Err(rollback_error) = deck.remove_last_slide() {
                    warn!(rendering, error = %rollback_error, "slide rollback failed");
                }
            }
            let error = ChartError::RenderFailure {
                chart: rendering.to_string(),
                source,
            };
            warn!(variant = %kind, rendering, error = %error, "render attempt failed");
            make_record(kind, rendering, RenderOutcome::Failed(error.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::{ChartPayload, ChartTypeId, DeckCall, RecordingDeck};
    use crate::layout::{FontSpec, LabelPosition, LegendStyle};
    use crate::plan::{MultiColumnRoles, TwoColumnRoles};

    fn make_table() -> DataTable {
        DataTable::new(
            vec!["Market".into(), "Units".into(), "Returns".into()],
            vec![
                vec!["A".into(), "30".into(), "3".into()],
                vec!["B".into(), "10".into(), "1".into()],
                vec!["C".into(), "20".into(), "2".into()],
            ],
        )
    }

    fn two_column_roles() -> TwoColumnRoles {
        TwoColumnRoles {
            category: "Market".into(),
            value: "Units".into(),
            axis_label: "Units sold".into(),
            unit: "none".into(),
            has_natural_order: false,
        }
    }

    fn make_plan(charts: Vec<ChartKind>) -> ChartPlan {
        ChartPlan {
            reason: String::new(),
            charts,
            is_long_format: false,
            last_row_is_total: false,
            two_column: Some(two_column_roles()),
            multi_column: Some(MultiColumnRoles {
                category: "Market".into(),
                series: vec!["Units".into(), "Returns".into()],
                axis_label: "Units".into(),
                unit: "none".into(),
                has_natural_order: false,
            }),
            long_format: None,
            bubble: None,
        }
    }

    #[test]
    fn test_column_selection_produces_two_slides() {
        let mut deck = RecordingDeck::new();
        let plan = make_plan(vec![ChartKind::Column]);
        let report = run_batch(
            &mut deck,
            &make_table(),
            "msg",
            &plan,
            &StyleConfig::default(),
        )
        .unwrap();
        assert_eq!(report.slide_count, 2);
        assert!(report
            .records
            .iter()
            .all(|r| r.outcome == RenderOutcome::Succeeded));
    }

    #[test]
    fn test_failed_shape_skips_only_dependents() {
        let mut plan = make_plan(vec![
            ChartKind::Column,
            ChartKind::StackedColumn,
            ChartKind::Pie,
        ]);
        // Break the multi-column shape only.
        plan.multi_column.as_mut().unwrap().series = vec!["Missing".into()];

        let mut deck = RecordingDeck::new();
        let report = run_batch(
            &mut deck,
            &make_table(),
            "msg",
            &plan,
            &StyleConfig::default(),
        )
        .unwrap();

        // column + bar + pie + doughnut rendered, stacked pair skipped.
        assert_eq!(report.slide_count, 4);
        let stacked: Vec<&RenderRecord> = report
            .records
            .iter()
            .filter(|r| r.variant == "stacked_column_chart")
            .collect();
        assert_eq!(stacked.len(), 2);
        assert!(stacked
            .iter()
            .all(|r| matches!(r.outcome, RenderOutcome::Skipped(_))));
    }

    #[test]
    fn test_no_slides_is_fatal() {
        let mut plan = make_plan(vec![ChartKind::Column]);
        plan.two_column.as_mut().unwrap().category = "Missing".into();

        let mut deck = RecordingDeck::new();
        let err = run_batch(
            &mut deck,
            &make_table(),
            "msg",
            &plan,
            &StyleConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ChartError::NoSlidesProduced));
    }

    /// Deck double that fails a chosen chart type mid-sequence, after the
    /// slide was already appended.
    struct FailingDeck {
        inner: RecordingDeck,
        fail_on: ChartTypeId,
    }

    impl SlideDeck for FailingDeck {
        fn append_slide(&mut self, layout: usize) -> anyhow::Result<()> {
            self.inner.append_slide(layout)
        }
        fn slide_count(&self) -> usize {
            self.inner.slide_count()
        }
        fn remove_last_slide(&mut self) -> anyhow::Result<()> {
            self.inner.remove_last_slide()
        }
        fn set_slide_title(&mut self, text: &str) -> anyhow::Result<()> {
            self.inner.set_slide_title(text)
        }
        fn set_caption(&mut self, axis_label: &str, unit_line: &str) -> anyhow::Result<()> {
            self.inner.set_caption(axis_label, unit_line)
        }
        fn set_chart_title(&mut self, text: &str) -> anyhow::Result<()> {
            self.inner.set_chart_title(text)
        }
        fn insert_chart(
            &mut self,
            placeholder: usize,
            chart_type: ChartTypeId,
            payload: ChartPayload,
        ) -> anyhow::Result<()> {
            if chart_type == self.fail_on {
                anyhow::bail!("placeholder rejected chart");
            }
            self.inner.insert_chart(placeholder, chart_type, payload)
        }
        fn set_font(&mut self, target: crate::deck::FontTarget, font: FontSpec) -> anyhow::Result<()> {
            self.inner.set_font(target, font)
        }
        fn set_axis_visibility(&mut self, axis: crate::deck::AxisId, visible: bool) -> anyhow::Result<()> {
            self.inner.set_axis_visibility(axis, visible)
        }
        fn set_gridlines(&mut self, axis: crate::deck::AxisId, visible: bool) -> anyhow::Result<()> {
            self.inner.set_gridlines(axis, visible)
        }
        fn set_data_labels(&mut self, format: &str, position: LabelPosition) -> anyhow::Result<()> {
            self.inner.set_data_labels(format, position)
        }
        fn set_legend(&mut self, legend: LegendStyle) -> anyhow::Result<()> {
            self.inner.set_legend(legend)
        }
        fn set_gap_width(&mut self, width: u32) -> anyhow::Result<()> {
            self.inner.set_gap_width(width)
        }
    }

    #[test]
    fn test_render_failure_rolls_back_only_its_slide() {
        let mut deck = FailingDeck {
            inner: RecordingDeck::new(),
            fail_on: ChartTypeId::BarClustered,
        };
        let plan = make_plan(vec![ChartKind::Column, ChartKind::Pie]);
        let report = run_batch(
            &mut deck,
            &make_table(),
            "msg",
            &plan,
            &StyleConfig::default(),
        )
        .unwrap();

        // column ok, bar failed and rolled back, pie + doughnut ok.
        assert_eq!(report.slide_count, 3);
        let bar = report
            .records
            .iter()
            .find(|r| r.rendering == "bar_clustered")
            .unwrap();
        assert!(matches!(bar.outcome, RenderOutcome::Failed(_)));
        assert_eq!(
            deck.inner
                .calls()
                .iter()
                .filter(|c| matches!(c, DeckCall::RemoveLastSlide))
                .count(),
            1
        );
    }
}
