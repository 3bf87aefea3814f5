#![doc = "Areal-weighted interpolation between polygon layers, plus raster sampling along tracks"]
mod config;
mod crs;
mod error;
mod geom;
mod interpolate;
mod layer;
mod manifest;
mod raster;

#[doc(inline)]
pub use config::{OverlayConfig, Weighting};

#[doc(inline)]
pub use crs::{ensure_common_projected, Crs, Datum};

#[doc(inline)]
pub use error::{ArealError, Result};

#[doc(inline)]
pub use geom::Geometries;

#[doc(inline)]
pub use layer::{FeatureId, Layer};

#[doc(inline)]
pub use interpolate::{
    attribute_shift, clip_to_common_extent, interpolate, overlay, shifts_to_dataframe, write_shifts_csv,
    ClipBoundary, Estimates, OverlapFragment, Shift,
};

#[doc(inline)]
pub use raster::{
    extract_track, read_track_csv, reproject_track, GeoTransform, Observation, RasterSeries, TrackExtraction, TrackFailure,
    TrackSample,
};

#[doc(inline)]
pub use manifest::{sha256_file, FileHash, RunManifest};
