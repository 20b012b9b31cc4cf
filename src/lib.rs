// Library exports for chartdeck

pub mod charts;
pub mod data;
pub mod deck;
pub mod error;
pub mod layout;
pub mod orchestrator;
pub mod plan;
pub mod png_deck;
pub mod precision;
pub mod shape;
pub mod transform;
pub mod validate;

pub use data::DataTable;
pub use deck::{RecordingDeck, SlideDeck};
pub use error::ChartError;
pub use layout::StyleConfig;
pub use orchestrator::{run_batch, DeckReport};
pub use plan::{ChartAdvisor, ChartPlan, PlanFile};
pub use png_deck::PngDeck;
pub use precision::RoundingPrecision;

use serde::Deserialize;

/// Raster dimensions for rendered slides. 16:9 slide aspect.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_width() -> u32 {
    960
}
fn default_height() -> u32 {
    540
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 960,
            height: 540,
        }
    }
}
