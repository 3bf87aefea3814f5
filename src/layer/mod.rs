mod id;
mod io;
mod layer;

pub use id::FeatureId;
pub use layer::Layer;

pub(crate) use io::{read_csv, write_csv};
