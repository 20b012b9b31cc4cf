// Rendering collaborator seam.
//
// The orchestrator only drives this trait; nothing in the core knows
// whether slides become PNG files or a recorded call log. The deck owns
// a single mutable slide sequence, so everything is strictly sequential:
// remove_last_slide operates on "the last slide", which is only
// meaningful under one writer.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::layout::{FontSpec, LabelPosition, LegendStyle};
use crate::shape::BubblePoint;

/// Chart types the deck knows how to draw, named after the rendering
/// vocabulary rather than the selectable variants (a column_chart
/// selection produces ColumnClustered and BarClustered renderings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartTypeId {
    ColumnClustered,
    ColumnStacked,
    ColumnStacked100,
    BarClustered,
    BarStacked,
    Pie,
    Doughnut,
    Line,
    Bubble,
}

impl ChartTypeId {
    pub fn slug(&self) -> &'static str {
        match self {
            ChartTypeId::ColumnClustered => "column_clustered",
            ChartTypeId::ColumnStacked => "column_stacked",
            ChartTypeId::ColumnStacked100 => "column_stacked_100",
            ChartTypeId::BarClustered => "bar_clustered",
            ChartTypeId::BarStacked => "bar_stacked",
            ChartTypeId::Pie => "pie",
            ChartTypeId::Doughnut => "doughnut",
            ChartTypeId::Line => "line",
            ChartTypeId::Bubble => "bubble",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesData {
    pub name: String,
    pub values: Vec<f64>,
}

/// Data bound to one inserted chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChartPayload {
    Category {
        categories: Vec<String>,
        series: Vec<SeriesData>,
    },
    Bubble {
        points: Vec<BubblePointData>,
    },
}

/// Serializable mirror of a bubble point for the call log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BubblePointData {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

impl From<&BubblePoint> for BubblePointData {
    fn from(point: &BubblePoint) -> Self {
        Self {
            label: point.label.clone(),
            x: point.x,
            y: point.y,
            size: point.size,
        }
    }
}

/// Which text the deck should restyle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontTarget {
    CategoryLabels,
    ValueAxisLabels,
    DataLabels,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisId {
    Category,
    Value,
}

/// The primitives the core drives. All side-effecting; no return
/// contract beyond success or error.
pub trait SlideDeck {
    fn append_slide(&mut self, layout: usize) -> Result<()>;
    fn slide_count(&self) -> usize;
    fn remove_last_slide(&mut self) -> Result<()>;

    fn set_slide_title(&mut self, text: &str) -> Result<()>;
    /// Two-line caption under the title: axis label plus unit line.
    fn set_caption(&mut self, axis_label: &str, unit_line: &str) -> Result<()>;
    fn set_chart_title(&mut self, text: &str) -> Result<()>;

    fn insert_chart(
        &mut self,
        placeholder: usize,
        chart_type: ChartTypeId,
        payload: ChartPayload,
    ) -> Result<()>;

    fn set_font(&mut self, target: FontTarget, font: FontSpec) -> Result<()>;
    fn set_axis_visibility(&mut self, axis: AxisId, visible: bool) -> Result<()>;
    fn set_gridlines(&mut self, axis: AxisId, visible: bool) -> Result<()>;
    fn set_data_labels(&mut self, format: &str, position: LabelPosition) -> Result<()>;
    fn set_legend(&mut self, legend: LegendStyle) -> Result<()>;
    fn set_gap_width(&mut self, width: u32) -> Result<()>;
}

/// One recorded primitive call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeckCall {
    AppendSlide { layout: usize },
    RemoveLastSlide,
    SetSlideTitle { text: String },
    SetCaption { axis_label: String, unit_line: String },
    SetChartTitle { text: String },
    InsertChart {
        placeholder: usize,
        chart_type: ChartTypeId,
        payload: ChartPayload,
    },
    SetFont { target: FontTarget, font: FontSpec },
    SetAxisVisibility { axis: AxisId, visible: bool },
    SetGridlines { axis: AxisId, visible: bool },
    SetDataLabels { format: String, position: LabelPosition },
    SetLegend { legend: LegendStyle },
    SetGapWidth { width: u32 },
}

/// In-memory deck that records every call. Backs tests and the CLI
/// dry-run mode.
#[derive(Debug, Default)]
pub struct RecordingDeck {
    calls: Vec<DeckCall>,
    slide_count: usize,
}

impl RecordingDeck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[DeckCall] {
        &self.calls
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.calls)?)
    }
}

impl SlideDeck for RecordingDeck {
    fn append_slide(&mut self, layout: usize) -> Result<()> {
        self.slide_count += 1;
        self.calls.push(DeckCall::AppendSlide { layout });
        Ok(())
    }

    fn slide_count(&self) -> usize {
        self.slide_count
    }

    fn remove_last_slide(&mut self) -> Result<()> {
        if self.slide_count == 0 {
            anyhow::bail!("no slide to remove");
        }
        self.slide_count -= 1;
        self.calls.push(DeckCall::RemoveLastSlide);
        Ok(())
    }

    fn set_slide_title(&mut self, text: &str) -> Result<()> {
        self.calls.push(DeckCall::SetSlideTitle {
            text: text.to_string(),
        });
        Ok(())
    }

    fn set_caption(&mut self, axis_label: &str, unit_line: &str) -> Result<()> {
        self.calls.push(DeckCall::SetCaption {
            axis_label: axis_label.to_string(),
            unit_line: unit_line.to_string(),
        });
        Ok(())
    }

    fn set_chart_title(&mut self, text: &str) -> Result<()> {
        self.calls.push(DeckCall::SetChartTitle {
            text: text.to_string(),
        });
        Ok(())
    }

    fn insert_chart(
        &mut self,
        placeholder: usize,
        chart_type: ChartTypeId,
        payload: ChartPayload,
    ) -> Result<()> {
        self.calls.push(DeckCall::InsertChart {
            placeholder,
            chart_type,
            payload,
        });
        Ok(())
    }

    fn set_font(&mut self, target: FontTarget, font: FontSpec) -> Result<()> {
        self.calls.push(DeckCall::SetFont { target, font });
        Ok(())
    }

    fn set_axis_visibility(&mut self, axis: AxisId, visible: bool) -> Result<()> {
        self.calls.push(DeckCall::SetAxisVisibility { axis, visible });
        Ok(())
    }

    fn set_gridlines(&mut self, axis: AxisId, visible: bool) -> Result<()> {
        self.calls.push(DeckCall::SetGridlines { axis, visible });
        Ok(())
    }

    fn set_data_labels(&mut self, format: &str, position: LabelPosition) -> Result<()> {
        self.calls.push(DeckCall::SetDataLabels {
            format: format.to_string(),
            position,
        });
        Ok(())
    }

    fn set_legend(&mut self, legend: LegendStyle) -> Result<()> {
        self.calls.push(DeckCall::SetLegend { legend });
        Ok(())
    }

    fn set_gap_width(&mut self, width: u32) -> Result<()> {
        self.calls.push(DeckCall::SetGapWidth { width });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Rgb;

    #[test]
    fn test_recording_deck_counts_slides() {
        let mut deck = RecordingDeck::new();
        deck.append_slide(1).unwrap();
        deck.append_slide(1).unwrap();
        assert_eq!(deck.slide_count(), 2);
        deck.remove_last_slide().unwrap();
        assert_eq!(deck.slide_count(), 1);
        assert_eq!(deck.calls().len(), 3);
    }

    #[test]
    fn test_remove_from_empty_deck_fails() {
        let mut deck = RecordingDeck::new();
        assert!(deck.remove_last_slide().is_err());
    }

    #[test]
    fn test_call_log_serializes() {
        let mut deck = RecordingDeck::new();
        deck.append_slide(1).unwrap();
        deck.set_font(
            FontTarget::DataLabels,
            FontSpec {
                size: 12,
                bold: true,
                color: Rgb(3, 90, 65),
            },
        )
        .unwrap();
        let json = deck.to_json().unwrap();
        assert!(json.contains("AppendSlide"));
        assert!(json.contains("DataLabels"));
    }
}
