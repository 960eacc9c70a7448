//! Thin client for the `ocm` command line tool

use chartbundle_core::ResourceInfoSet;
use std::io::ErrorKind;
use std::process::{Command, Stdio};

use crate::error::{CliError, Result};

/// Runs `ocm` subcommands against component versions
pub struct Ocm {
    program: String,
}

impl Ocm {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// List the resources of a component version
    pub fn get_resources(&self, component_version: &str) -> Result<ResourceInfoSet> {
        let buf = self.exec(&["get", "resources", "-o", "json", component_version])?;
        Ok(ResourceInfoSet::from_ocm_json(&buf)?)
    }

    /// Download the payload of a resource
    pub fn download_resource(&self, component_version: &str, resource_name: &str) -> Result<Vec<u8>> {
        self.exec(&["download", "resource", "-O", "-", component_version, resource_name])
    }

    /// Run `ocm` and return its stdout; stderr is passed through
    fn exec(&self, args: &[&str]) -> Result<Vec<u8>> {
        tracing::debug!("running ocm binary with arguments {:?}", args);

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::inherit())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => CliError::OcmUnavailable {
                    program: self.program.clone(),
                    message: "executable not found".to_string(),
                },
                _ => CliError::OcmUnavailable {
                    program: self.program.clone(),
                    message: e.to_string(),
                },
            })?;

        if !output.status.success() {
            return Err(CliError::OcmFailed {
                args: args.iter().map(|arg| arg.to_string()).collect(),
                status: output.status.to_string(),
            });
        }
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary() {
        let ocm = Ocm::new("/nonexistent/ocm-binary");
        let err = ocm.get_resources("ctf").unwrap_err();
        assert!(matches!(err, CliError::OcmUnavailable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_binary() {
        let ocm = Ocm::new("false");
        let err = ocm.download_resource("ctf", "helm-chart-demo").unwrap_err();
        match err {
            CliError::OcmFailed { args, .. } => {
                assert_eq!(args, vec!["download", "resource", "-O", "-", "ctf", "helm-chart-demo"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
