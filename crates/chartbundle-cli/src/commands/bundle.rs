//! Bundle command - render a component constructor for a chart and its images

use chartbundle_core::component::IMAGE_RELATIONS_LABEL;
use chartbundle_core::{
    ComponentConstructor, ComponentDeclaration, HelmChart, ImageRelations, Label,
    ProcessEnvironment, Provider, ResourceDeclaration,
};
use std::path::Path;

use crate::error::{CliError, Result};

pub fn run(
    path: &Path,
    component_name_prefix: &str,
    provider_name: &str,
    raw_relations: &[String],
) -> Result<()> {
    if component_name_prefix.is_empty() {
        return Err(CliError::usage("no value provided for --component-name-prefix"));
    }
    if provider_name.is_empty() {
        return Err(CliError::usage("no value provided for --provider-name"));
    }

    // OCM resource for the chart itself
    let chart = HelmChart::load(path)?;
    chart.validate_dependencies()?;
    let chart_resource = chart.as_resource()?;

    let relations = ImageRelations::parse(raw_relations, &ProcessEnvironment)?;
    let constructor = component_constructor(
        &chart,
        chart_resource,
        &relations,
        component_name_prefix,
        provider_name,
    )?;

    let yaml = serde_yaml::to_string(&constructor)?;
    print!("{}", yaml);

    tracing::debug!(
        "bundled chart {} with {} image resource(s)",
        chart.name(),
        constructor.components[0].resources.len() - 1
    );
    Ok(())
}

/// Assemble the component: the chart resource first, then one resource per image
fn component_constructor(
    chart: &HelmChart,
    mut chart_resource: ResourceDeclaration,
    relations: &ImageRelations,
    component_name_prefix: &str,
    provider_name: &str,
) -> Result<ComponentConstructor> {
    let projection = relations.project(chart.version())?;
    chart_resource.labels.push(Label {
        name: IMAGE_RELATIONS_LABEL.to_string(),
        value: serde_json::Value::String(projection.relations_json),
    });

    let resources = std::iter::once(chart_resource)
        .chain(projection.resources)
        .collect();

    Ok(ComponentConstructor {
        components: vec![ComponentDeclaration {
            name: format!("{}{}", component_name_prefix, chart.name()),
            version: chart.version().to_string(),
            provider: Provider {
                name: provider_name.to_string(),
            },
            resources,
        }],
    })
}
