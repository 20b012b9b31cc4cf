// Error taxonomy for the chart engine

use thiserror::Error;

/// Failures the batch driver knows how to react to.
///
/// The first three are shape-level: the variants depending on the failed
/// shape are skipped and the batch continues. `RenderFailure` is
/// variant-level: the half-built slide is rolled back and the batch
/// continues. `NoSlidesProduced` is fatal.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("column '{column}' not found in the dataset")]
    MissingColumn { column: String },

    #[error("reshape conflict: duplicate entry for index '{index}', column '{column}'")]
    ReshapeConflict { index: String, column: String },

    #[error("multi-column shape resolved to zero series columns")]
    EmptySeriesSet,

    #[error("rendering '{chart}' failed")]
    RenderFailure {
        chart: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("no slides produced: every selected chart failed")]
    NoSlidesProduced,
}

impl ChartError {
    pub fn missing_column(column: impl Into<String>) -> Self {
        ChartError::MissingColumn {
            column: column.into(),
        }
    }
}
