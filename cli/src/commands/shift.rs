use anyhow::Result;
use areal::{attribute_shift, write_shifts_csv, Estimates, RunManifest};
use tracing::info;

use crate::cli::{Cli, ShiftArgs};

pub fn run(_cli: &Cli, args: &ShiftArgs) -> Result<()> {
    let a = Estimates::read_csv(&args.a, &args.id)?;
    let b = Estimates::read_csv(&args.b, &args.id)?;

    let shifts = attribute_shift(&a, &b, &args.key)?;
    let missing = shifts.iter().filter(|s| s.value.is_none()).count();
    info!(rows = shifts.len(), missing, "computed shifts");

    write_shifts_csv(&shifts, &args.output, &args.id, &format!("{}_shift", args.key))?;

    let mut manifest = RunManifest::new("shift");
    manifest.add_input(&args.a)?;
    manifest.add_input(&args.b)?;
    manifest.add_count("shifts", shifts.len());
    manifest.add_count("missing", missing);
    manifest.write(&super::manifest_path(&args.output))
}
