//! Areal-weighted interpolation: clip to a common extent, intersect, weight, aggregate.

mod clip;
mod estimates;
mod fragment;
mod interpolate;
mod shift;

pub use clip::{clip_to_common_extent, ClipBoundary};
pub use estimates::Estimates;
pub use fragment::{overlay, OverlapFragment};
pub use interpolate::interpolate;
pub use shift::{attribute_shift, shifts_to_dataframe, write_shifts_csv, Shift};
