//! Error taxonomy for areal interpolation.

use chrono::NaiveDate;
use thiserror::Error;

use crate::layer::FeatureId;

/// Errors raised by the interpolation pipeline and raster sampling.
#[derive(Error, Debug)]
pub enum ArealError {
    /// Area or distance was requested under a geographic (degree-based) CRS.
    #[error("invalid CRS for area arithmetic: {0} is not a projected system")]
    InvalidCrs(String),

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    /// A self-intersecting or otherwise invalid polygon reached an overlay step unrepaired.
    #[error("invalid geometry for feature {id}: {reason}")]
    InvalidGeometry { id: FeatureId, reason: String },

    /// A target feature has zero area, so overlap fractions are undefined.
    #[error("degenerate geometry for feature {0}: zero area")]
    EmptyGeometry(FeatureId),

    /// A requested date has no band on the raster's time axis.
    #[error("no raster band for date {0}")]
    MissingTemporalMatch(NaiveDate),

    /// A target feature received no overlapping source fragments.
    #[error("no estimate for target feature {0}")]
    EmptyResult(FeatureId),

    #[error("missing attribute column: {0}")]
    MissingAttribute(String),

    #[error("column already exists: {0}")]
    DuplicateColumn(String),

    #[error("duplicate feature id: {0}")]
    DuplicateId(FeatureId),

    #[error("point ({x}, {y}) falls outside the raster grid")]
    OutOfBounds { x: f64, y: f64 },

    #[error("length mismatch: {what} has {actual} entries, expected {expected}")]
    LengthMismatch { what: &'static str, expected: usize, actual: usize },

    #[error("projection error: {0}")]
    Projection(String),

    #[error(transparent)]
    Data(#[from] polars::error::PolarsError),
}

/// Result type alias for interpolation operations.
pub type Result<T> = std::result::Result<T, ArealError>;
