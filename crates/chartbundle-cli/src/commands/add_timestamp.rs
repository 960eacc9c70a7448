//! Add-timestamp-to-version command - stamp a chart version with a build identifier

use chartbundle_core::HelmChart;
use console::style;
use std::path::Path;

use crate::error::Result;

pub fn run(path: &Path) -> Result<()> {
    let mut chart = HelmChart::load(path)?;
    let new_version = chart.add_timestamp_to_version()?;

    eprintln!(
        "{} {} v{}",
        style("Stamped").green().bold(),
        chart.name(),
        new_version
    );
    Ok(())
}
