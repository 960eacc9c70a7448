//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use chartbundle_core::CoreError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// An image relation could not be processed
    #[error("{message}")]
    #[diagnostic(code(chartbundle::cli::relation))]
    Relation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Chart structure or loading error
    #[error("{message}")]
    #[diagnostic(code(chartbundle::cli::chart))]
    Chart {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// The component version does not have the expected resources
    #[error("{message}")]
    #[diagnostic(code(chartbundle::cli::component))]
    Component { message: String },

    /// The `ocm` binary could not be started
    #[error("could not run {program:?}: {message}")]
    #[diagnostic(
        code(chartbundle::cli::ocm_unavailable),
        help("install the OCM CLI or point --ocm-binary at it")
    )]
    OcmUnavailable { program: String, message: String },

    /// The `ocm` binary ran but failed
    #[error("while running ocm binary with arguments {args:?}: {status}")]
    #[diagnostic(code(chartbundle::cli::ocm))]
    OcmFailed { args: Vec<String>, status: String },

    /// Invalid arguments that clap cannot check on its own
    #[error("{message}")]
    #[diagnostic(code(chartbundle::cli::usage))]
    Usage { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(chartbundle::cli::io))]
    Io { message: String },

    /// Wrapped error for passthrough (stores the formatted message)
    #[error("{message}")]
    #[diagnostic(code(chartbundle::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Relation { .. } => exit_codes::RELATION_ERROR,
            CliError::Chart { .. } => exit_codes::CHART_ERROR,
            CliError::Component { .. } => exit_codes::COMPONENT_ERROR,
            CliError::OcmUnavailable { .. } => exit_codes::UNAVAILABLE,
            CliError::OcmFailed { .. } => exit_codes::ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Prefix the message with what was being attempted
    pub fn context(self, what: impl std::fmt::Display) -> Self {
        match self {
            CliError::Relation { message, help } => CliError::Relation {
                message: format!("{}: {}", what, message),
                help,
            },
            CliError::Chart { message, help } => CliError::Chart {
                message: format!("{}: {}", what, message),
                help,
            },
            CliError::Component { message } => CliError::Component {
                message: format!("{}: {}", what, message),
            },
            CliError::Io { message } => CliError::Io {
                message: format!("{}: {}", what, message),
            },
            CliError::Other { message } => CliError::Other {
                message: format!("{}: {}", what, message),
            },
            other => other,
        }
    }
}

/// Hint shown below errors about the declaration grammar
const DECLARATION_HELP: &str = "declarations look like \".Values.<path> is <repository|digest|tag|reference> of <image-ref>\"";

fn relation_help(err: &CoreError) -> Option<String> {
    match err {
        CoreError::Declaration { source, .. } => relation_help(source),
        CoreError::GrammarMismatch { .. } | CoreError::InvalidTargetPath { .. } => {
            Some(DECLARATION_HELP.to_string())
        }
        CoreError::ShellSyntax { .. } => Some(
            "command substitution only supports a list of bare words, like \"$(cat version.txt)\""
                .to_string(),
        ),
        CoreError::UnknownVariable { name } => Some(format!("export {} before running this command", name)),
        CoreError::NameConflict { .. } => {
            Some("the same resource name cannot be given to two different images".to_string())
        }
        _ => None,
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match &err {
            CoreError::Declaration { .. }
            | CoreError::UnknownVariable { .. }
            | CoreError::ShellSyntax { .. }
            | CoreError::EmptyCommand { .. }
            | CoreError::CommandFailed { .. }
            | CoreError::GrammarMismatch { .. }
            | CoreError::InvalidTargetPath { .. }
            | CoreError::InvalidReference { .. }
            | CoreError::MissingAttribute { .. }
            | CoreError::NameConflict { .. }
            | CoreError::OverlayConflict { .. } => CliError::Relation {
                help: relation_help(&err),
                message,
            },

            CoreError::InvalidChart { .. }
            | CoreError::DependencyMismatch { .. }
            | CoreError::Subcharts { .. } => CliError::Chart {
                message,
                help: Some("run `helm dependency update` to refresh Chart.lock and charts/".to_string()),
            },
            CoreError::Git { .. } => CliError::Chart {
                message,
                help: None,
            },

            CoreError::ResourceNotFound { .. }
            | CoreError::AmbiguousResource { .. }
            | CoreError::NotAnImage { .. }
            | CoreError::ResourceReference { .. }
            | CoreError::InvalidLabel { .. }
            | CoreError::UnsafeArchivePath { .. }
            | CoreError::UnsupportedArchiveEntry { .. } => CliError::Component { message },

            CoreError::Io(_) => CliError::Io { message },
            CoreError::YamlParse(_) | CoreError::JsonParse(_) => CliError::Other { message },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        CliError::Other {
            message: format!("Failed to render YAML: {}", err),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_errors_map_to_relation_exit_code() {
        let err = CoreError::ShellSyntax {
            command: "echo \"hi\"".to_string(),
        }
        .in_declaration(".Values.x is tag of $(echo \"hi\")");
        let cli: CliError = err.into();
        assert_eq!(cli.exit_code(), exit_codes::RELATION_ERROR);
        match cli {
            CliError::Relation { message, help } => {
                assert!(message.starts_with("while parsing --image-relation"));
                assert!(help.unwrap().contains("bare words"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_chart_errors_carry_help() {
        let cli: CliError = CoreError::Subcharts {
            path: "chart".to_string(),
            message: "did not find expected file charts/redis-17.3.1.tgz".to_string(),
        }
        .into();
        assert_eq!(cli.exit_code(), exit_codes::CHART_ERROR);
        assert!(matches!(cli, CliError::Chart { help: Some(_), .. }));
    }

    #[test]
    fn test_context_prefixes_message() {
        let cli: CliError = CoreError::ResourceNotFound {
            description: "name: \"image-nginx\"".to_string(),
        }
        .into();
        let cli = cli.context("while resolving image relations");
        assert_eq!(
            cli.to_string(),
            "while resolving image relations: did not find any resource with name: \"image-nginx\""
        );
        assert_eq!(cli.exit_code(), exit_codes::COMPONENT_ERROR);
    }
}
