//! Unbundle command - unpack a chart and render its localized values

use chartbundle_core::component::{GIT_LOCATION_LABEL, IMAGE_RELATIONS_LABEL};
use chartbundle_core::{
    CHART_RESOURCE_PREFIX, ImageRelations, RelationRecord, ResourceInfo, unpack_chart_tarball,
};
use console::style;
use std::path::{Component, Path};

use crate::error::{CliError, Result};
use crate::ocm::Ocm;

const LOCALIZED_VALUES_FILE: &str = "localized-values.yaml";
const GIT_LOCATION_FILE: &str = "git-location.json";

pub fn run(ocm: &Ocm, component_version: &str, target_dir: &Path) -> Result<()> {
    if component_version.is_empty() {
        return Err(CliError::usage("missing component version"));
    }
    if target_dir.as_os_str().is_empty() {
        return Err(CliError::usage("missing output directory path"));
    }

    let resources = ocm.get_resources(component_version)?;
    let chart = resources.helm_chart()?;
    let chart_dir_name = chart_dir_name(chart)?;

    // everything is resolved before the first write
    let records = read_relations_label(chart)?;
    let relations = ImageRelations::resolve(&records, &resources)
        .map_err(|e| CliError::from(e).context("while resolving image relations"))?;
    let localized_values = relations
        .localize()
        .and_then(|overlay| overlay.to_yaml())
        .map_err(|e| CliError::from(e).context(format!("could not build {}", LOCALIZED_VALUES_FILE)))?;
    let git_location = chart
        .label(GIT_LOCATION_LABEL)
        .and_then(|value| value.as_str());

    let payload = ocm.download_resource(component_version, &chart.name)?;

    // unpack next to the final location, so a broken archive leaves no half-written chart
    std::fs::create_dir_all(target_dir)?;
    let staging = tempfile::Builder::new()
        .prefix(".unbundle-")
        .tempdir_in(target_dir)?;
    let files = unpack_chart_tarball(&payload, staging.path())
        .map_err(|e| CliError::from(e).context(format!("could not unpack resource {:?}", chart.name)))?;

    let chart_path = target_dir.join(chart_dir_name);
    if chart_path.exists() {
        tracing::info!("replacing existing chart in {}", chart_path.display());
        std::fs::remove_dir_all(&chart_path)?;
    }
    std::fs::rename(staging.path(), &chart_path)?;

    std::fs::write(target_dir.join(LOCALIZED_VALUES_FILE), localized_values)?;
    if let Some(json) = git_location {
        std::fs::write(target_dir.join(GIT_LOCATION_FILE), json)?;
    }

    eprintln!(
        "{} {} v{}",
        style("Unbundled").green().bold(),
        chart_dir_name,
        chart.version
    );
    eprintln!("  {} {} ({} files)", style("Chart").dim(), chart_path.display(), files);
    eprintln!(
        "  {} {} ({} image relations)",
        style("Values").dim(),
        target_dir.join(LOCALIZED_VALUES_FILE).display(),
        relations.len()
    );
    if git_location.is_some() {
        eprintln!(
            "  {} {}",
            style("Git").dim(),
            target_dir.join(GIT_LOCATION_FILE).display()
        );
    }
    Ok(())
}

/// Directory name for the chart: the resource name without its prefix
fn chart_dir_name(chart: &ResourceInfo) -> Result<&str> {
    let name = chart
        .name
        .strip_prefix(CHART_RESOURCE_PREFIX)
        .unwrap_or(&chart.name);

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(CliError::Component {
            message: format!(
                "resource name {:?} cannot be used as a directory name",
                chart.name
            ),
        }),
    }
}

fn read_relations_label(chart: &ResourceInfo) -> Result<Vec<RelationRecord>> {
    let Some(json) = chart.string_label(IMAGE_RELATIONS_LABEL)? else {
        return Err(CliError::Component {
            message: format!(
                "could not unpack resource {:?}: missing required label {:?}",
                chart.name, IMAGE_RELATIONS_LABEL
            ),
        });
    };

    RelationRecord::parse_list(json).map_err(|e| {
        CliError::from(e).context(format!(
            "could not read label {:?} on resource {:?}",
            IMAGE_RELATIONS_LABEL, chart.name
        ))
    })
}
