//! Chartbundle CLI - Bundle Helm charts with their images into OCM component versions

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod exit_codes;
mod ocm;

use error::Result;

#[derive(Parser)]
#[command(name = "chartbundle")]
#[command(author = "Chartbundle Contributors")]
#[command(version)]
#[command(about = "Toolbox for deploying Helm charts with OCM", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print more detailed logs
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a build timestamp to the given chart's version
    ///
    /// This is useful when you want to upload multiple bundles of a Helm chart
    /// to an OCM store without having to bump the chart version for each change.
    AddTimestampToVersion {
        /// Helm chart directory
        chart: PathBuf,
    },

    /// Print a component constructor for a Helm chart, for `ocm add componentversions`
    ///
    /// To make the bundle hermetic, all images referenced by the Helm chart
    /// should be declared with --image-relation. Images so declared are bundled
    /// into the component version, and on unbundle a localized-values.yaml file
    /// is rendered which points the declared value paths at the bundled images.
    Bundle {
        /// Helm chart directory
        chart: PathBuf,

        /// Prefix prepended to the chart name to form the component name, e.g. "example.org/"
        #[arg(long, env = "CHARTBUNDLE_COMPONENT_NAME_PREFIX")]
        component_name_prefix: String,

        /// Provider name for the component metadata
        #[arg(long, env = "CHARTBUNDLE_PROVIDER_NAME")]
        provider_name: String,

        /// Declaration of the form ".Values.<path> is <repository|digest|tag|reference> of <image-ref>"
        ///
        /// May be given multiple times, and one value may hold several
        /// declarations separated by commas or newlines. ${VARIABLES} are
        /// replaced first, then $(command substitutions) made of bare words
        /// like "$(cat version.txt)".
        #[arg(long = "image-relation", value_name = "DECLARATION")]
        image_relations: Vec<String>,
    },

    /// Unpack a Helm chart from a component version created by `bundle`
    ///
    /// The component version is either the path to a CTF archive, or a
    /// reference like "$OCI_REGISTRY//$COMPONENT_NAME:$COMPONENT_VERSION".
    /// Besides the chart, a "localized-values.yaml" file is written that must
    /// be given to Helm with --values, and "git-location.json" if the chart
    /// carries a Git location label.
    Unbundle {
        /// Component version to read from
        component_version: String,

        /// Directory to write the chart and its values into
        target_dir: PathBuf,

        /// Path of the `ocm` executable
        #[arg(long, env = "CHARTBUNDLE_OCM_BINARY", default_value = "ocm")]
        ocm_binary: String,
    },
}

fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();

    // stdout is reserved for rendered documents
    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli.command) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::AddTimestampToVersion { chart } => commands::add_timestamp::run(&chart),

        Commands::Bundle {
            chart,
            component_name_prefix,
            provider_name,
            image_relations,
        } => commands::bundle::run(
            &chart,
            &component_name_prefix,
            &provider_name,
            &image_relations,
        ),

        Commands::Unbundle {
            component_version,
            target_dir,
            ocm_binary,
        } => commands::unbundle::run(&ocm::Ocm::new(ocm_binary), &component_version, &target_dir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_repeated_image_relations() {
        let cli = Cli::try_parse_from([
            "chartbundle",
            "bundle",
            "chart",
            "--component-name-prefix",
            "example.org/",
            "--provider-name",
            "example",
            "--image-relation",
            ".Values.a is tag of nginx:1.25",
            "--image-relation",
            ".Values.b is tag of redis:7",
        ])
        .unwrap();
        match cli.command {
            Commands::Bundle { image_relations, .. } => assert_eq!(image_relations.len(), 2),
            _ => panic!("expected bundle"),
        }
    }

    #[test]
    fn test_unbundle_defaults_to_ocm_on_path() {
        let cli = Cli::try_parse_from(["chartbundle", "unbundle", "ctf", "out"]).unwrap();
        match cli.command {
            Commands::Unbundle { ocm_binary, .. } => {
                // the variable may be set in the environment running the tests
                if std::env::var_os("CHARTBUNDLE_OCM_BINARY").is_none() {
                    assert_eq!(ocm_binary, "ocm");
                }
            }
            _ => panic!("expected unbundle"),
        }
    }
}
