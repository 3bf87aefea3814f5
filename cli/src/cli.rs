use std::path::PathBuf;

/// Areal interpolation CLI (argument schema only)
#[derive(clap::Parser, Debug)]
#[command(name = "areal", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug); logs go to stderr
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Overlay settings as JSON (min_fragment_fraction, fraction_tolerance, repair_invalid, bbox_padding, weighting)
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Redistribute source attributes onto target polygons by area of overlap
    Interpolate(InterpolateArgs),

    /// Difference one column between two estimate tables
    Shift(ShiftArgs),

    /// Sample a raster time series along a dated track
    Extract(ExtractArgs),
}

#[derive(clap::Args, Debug)]
pub struct InterpolateArgs {
    /// Source layer carrying the attributes (.geojson, .shp or zipped shapefile)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub source: PathBuf,

    /// Target layer receiving estimates
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub target: PathBuf,

    /// Reference layer whose dissolved extent both layers are clipped to
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub reference: Option<PathBuf>,

    /// Source attribute holding feature ids (defaults to record order)
    #[arg(long)]
    pub source_id: Option<String>,

    /// Target attribute holding feature ids (defaults to record order)
    #[arg(long)]
    pub target_id: Option<String>,

    /// Extensive (count) attribute to redistribute; repeatable
    #[arg(long = "attr", required = true)]
    pub attributes: Vec<String>,

    /// Reproject all layers to the local UTM zone of the target first
    #[arg(long)]
    pub to_metric: bool,

    /// Add a share column, e.g. `dem_share=dem/dem+rep`; repeatable
    #[arg(long = "share")]
    pub shares: Vec<String>,

    /// Write zero rows for targets that overlap no source feature
    #[arg(long)]
    pub fill_missing: bool,

    /// Fragments below this fraction of their target's area are dropped
    #[arg(long)]
    pub min_fragment_fraction: Option<f64>,

    /// Weight fragments by source area instead of target area (conserves totals)
    #[arg(long)]
    pub source_weights: bool,

    /// Fail on invalid polygons instead of repairing them
    #[arg(long)]
    pub no_repair: bool,

    /// Output estimates CSV
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ShiftArgs {
    /// Later estimates table (minuend)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub a: PathBuf,

    /// Earlier estimates table (subtrahend)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub b: PathBuf,

    /// Id column shared by both tables
    #[arg(long)]
    pub id: String,

    /// Column to difference
    #[arg(long)]
    pub key: String,

    /// Output shift CSV
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ExtractArgs {
    /// Raster series JSON
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub raster: PathBuf,

    /// Track CSV with date, x, y columns
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub track: PathBuf,

    /// EPSG code of the track coordinates, when they differ from the raster's CRS
    #[arg(long)]
    pub track_epsg: Option<u32>,

    /// Output samples CSV
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,
}
