//! Helm chart metadata
//!
//! Only the fields of `Chart.yaml` and `Chart.lock` that bundling needs are
//! read; everything else in the chart directory is passed through untouched.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::component::{GIT_LOCATION_LABEL, HELM_CHART_TYPE, Label, ResourceDeclaration, ResourceInput};
use crate::error::{CoreError, Result};
use crate::git::GitLocation;

/// Prefix of the resource name of a bundled chart
pub const CHART_RESOURCE_PREFIX: &str = "helm-chart-";

/// A Helm chart directory and the parts of its `Chart.yaml` we use
#[derive(Debug, Clone)]
pub struct HelmChart {
    /// Directory containing `Chart.yaml`
    pub path: PathBuf,
    pub metadata: ChartMetadata,
}

/// Abridged `Chart.yaml`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    pub api_version: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub dependencies: Vec<ChartDependency>,
}

/// Entry of `dependencies` in `Chart.yaml` or `Chart.lock`
///
/// In `Chart.yaml` the version may be a constraint like `^1.1`; in
/// `Chart.lock` it is always an exact version.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChartDependency {
    pub name: String,
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Deserialize)]
struct ChartLock {
    #[serde(default)]
    dependencies: Vec<ChartDependency>,
}

impl HelmChart {
    /// Load `Chart.yaml` from a chart directory
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let chart_file = path.join("Chart.yaml");
        if !chart_file.exists() {
            return Err(CoreError::InvalidChart {
                message: format!("Chart.yaml not found in {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(&chart_file)?;
        let metadata: ChartMetadata = serde_yaml::from_str(&content)?;
        Ok(Self { path, metadata })
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    fn chart_file(&self) -> PathBuf {
        self.path.join("Chart.yaml")
    }

    /// Append a `+bundle.<timestamp>` build identifier to the chart version
    ///
    /// Only the `version` line of `Chart.yaml` is edited, so comments and
    /// fields unknown to this tool survive. Returns the new version.
    pub fn add_timestamp_to_version(&mut self) -> Result<String> {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
        self.add_build_identifier(&format!("bundle.{}", timestamp))
    }

    fn add_build_identifier(&mut self, build: &str) -> Result<String> {
        let old_version = self.metadata.version.clone();
        if old_version.contains('+') {
            return Err(CoreError::InvalidChart {
                message: format!(
                    "Chart.yaml already has a build identifier (version = {:?}), cannot add another one",
                    old_version
                ),
            });
        }
        let new_version = format!("{}+{}", old_version, build);

        let content = std::fs::read_to_string(self.chart_file())?;
        let mut edited = false;
        let lines: Vec<String> = content
            .split('\n')
            .map(|line| {
                if !line.trim_start().starts_with("version") {
                    return line.to_string();
                }
                let new_line = line.replace(&old_version, &new_version);
                if new_line != line {
                    edited = true;
                }
                new_line
            })
            .collect();

        if !edited {
            return Err(CoreError::InvalidChart {
                message: format!(
                    "tried to edit Chart.yaml, but could not find a line that looks like `version: {:?}`",
                    old_version
                ),
            });
        }

        std::fs::write(self.chart_file(), lines.join("\n"))?;
        tracing::info!("Changed chart version from {:?} to {:?}", old_version, new_version);
        self.metadata.version = new_version.clone();
        Ok(new_version)
    }

    /// Check that `helm dep build` has been run
    ///
    /// Otherwise bundling the chart might miss some subcharts.
    pub fn validate_dependencies(&self) -> Result<()> {
        let path = self.path.display().to_string();
        match self.metadata.api_version.as_str() {
            "v2" => {}
            "v1" => {
                return Err(CoreError::InvalidChart {
                    message: format!(
                        "cannot validate chart dependencies for {} with apiVersion: v1 (please upgrade to v2; see <https://helm.sh/docs/topics/charts/#the-apiversion-field> for details)",
                        path
                    ),
                });
            }
            other => {
                return Err(CoreError::InvalidChart {
                    message: format!(
                        "cannot validate chart dependencies for {} with apiVersion: {} (this tool only supports v2)",
                        path, other
                    ),
                });
            }
        }

        let mut expected_files = BTreeSet::new();
        if !self.metadata.dependencies.is_empty() {
            let lock_file = self.path.join("Chart.lock");
            let content = std::fs::read_to_string(&lock_file).map_err(|e| CoreError::InvalidChart {
                message: format!("cannot read {}: {}", lock_file.display(), e),
            })?;
            let lock: ChartLock = serde_yaml::from_str(&content)?;

            check_dependency_coherence(&self.metadata.dependencies, &lock.dependencies).map_err(
                |message| CoreError::DependencyMismatch {
                    path: path.clone(),
                    message,
                },
            )?;

            for dep in &lock.dependencies {
                expected_files.insert(format!("{}-{}.tgz", dep.name, dep.version));
            }
        }

        let charts_dir = self.path.join("charts");
        let subchart_error = |message: String| CoreError::Subcharts {
            path: path.clone(),
            message,
        };

        if charts_dir.is_dir() {
            for entry in std::fs::read_dir(&charts_dir)? {
                let entry = entry?;
                let file_name = entry.file_name().to_string_lossy().to_string();
                let rel_path = Path::new("charts").join(&file_name);
                if !entry.file_type()?.is_file() {
                    return Err(subchart_error(format!(
                        "expected only regular files, but {} is not a regular file",
                        rel_path.display()
                    )));
                }
                if !expected_files.remove(&file_name) {
                    return Err(subchart_error(format!(
                        "found unexpected file {}",
                        rel_path.display()
                    )));
                }
            }
        }

        if let Some(missing) = expected_files.first() {
            return Err(subchart_error(format!(
                "did not find expected file {}",
                Path::new("charts").join(missing).display()
            )));
        }
        Ok(())
    }

    /// Resource declaration for this chart, labelled with its Git location if known
    pub fn as_resource(&self) -> Result<ResourceDeclaration> {
        let mut labels = Vec::new();
        if let Some(location) = GitLocation::find(&self.path)? {
            labels.push(Label {
                name: GIT_LOCATION_LABEL.to_string(),
                value: serde_json::Value::String(serde_json::to_string(&location)?),
            });
        }

        Ok(ResourceDeclaration {
            name: format!("{}{}", CHART_RESOURCE_PREFIX, self.name()),
            resource_type: HELM_CHART_TYPE.to_string(),
            version: self.version().to_string(),
            labels,
            access: None,
            input: Some(ResourceInput::Dir {
                path: self.path.display().to_string(),
            }),
        })
    }
}

/// Check that the `dependencies` of `Chart.yaml` and `Chart.lock` agree
fn check_dependency_coherence(
    declared: &[ChartDependency],
    computed: &[ChartDependency],
) -> std::result::Result<(), String> {
    let declared: BTreeMap<&str, &ChartDependency> =
        declared.iter().map(|dep| (dep.name.as_str(), dep)).collect();
    let mut computed: BTreeMap<&str, &ChartDependency> =
        computed.iter().map(|dep| (dep.name.as_str(), dep)).collect();

    for (name, declared_dep) in &declared {
        let Some(computed_dep) = computed.remove(name) else {
            return Err(format!(
                "Chart.yaml declares a dependency on {:?}, but Chart.lock does not have this dependency",
                name
            ));
        };
        if computed_dep.repository != declared_dep.repository {
            return Err(format!(
                "Chart.yaml declares dependency {:?} as coming from {}, but Chart.lock has it coming from {}",
                name, declared_dep.repository, computed_dep.repository
            ));
        }
        // TODO: check that computed_dep.version satisfies the constraint in declared_dep.version
    }

    if let Some(name) = computed.keys().next() {
        return Err(format!(
            "Chart.lock declares a dependency on {:?}, but Chart.yaml does not have this dependency",
            name
        ));
    }
    Ok(())
}
