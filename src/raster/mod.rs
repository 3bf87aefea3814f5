//! Gridded time series and point sampling along a moving track.

mod geotransform;
mod series;
mod track;

pub use geotransform::GeoTransform;
pub use series::RasterSeries;
pub use track::{extract_track, read_track_csv, reproject_track, Observation, TrackExtraction, TrackFailure, TrackSample};
