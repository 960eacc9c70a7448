//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    // ============ Declaration Errors ============
    #[error("while parsing --image-relation {input:?}: {source}")]
    Declaration {
        input: String,
        #[source]
        source: Box<CoreError>,
    },

    #[error("missing required environment variable: {name}")]
    UnknownVariable { name: String },

    #[error("refusing to execute command {command:?} which appears to contain shell syntax")]
    ShellSyntax { command: String },

    #[error("refusing to execute command {command:?} which contains no command")]
    EmptyCommand { command: String },

    #[error("command {command:?} failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("does not match expected format /{pattern}/ (pre-processed input was {input:?})")]
    GrammarMismatch { pattern: String, input: String },

    #[error("invalid target path {path:?}: path segments must not be empty")]
    InvalidTargetPath { path: String },

    #[error("{reason} (raw reference was {raw:?})")]
    InvalidReference { raw: String, reason: String },

    #[error("could not find attribute {attribute:?} in image reference {reference:?}")]
    MissingAttribute { attribute: String, reference: String },

    // ============ Bundle Errors ============
    #[error("resource name {name:?} is assigned to both {first:?} and {second:?}")]
    NameConflict {
        name: String,
        first: String,
        second: String,
    },

    #[error("cannot insert value into subpath {subpath:?} of value with type {found}")]
    OverlayConflict { subpath: String, found: String },

    // ============ Component Errors ============
    #[error("did not find any resource with {description}")]
    ResourceNotFound { description: String },

    #[error("expected 1 resource with {description}, but found {count} matching resources")]
    AmbiguousResource { description: String, count: usize },

    #[error("resource {name:?} does not contain an OCI image reference")]
    NotAnImage { name: String },

    #[error("could not parse image reference {reference:?} in resource {name:?}: {source}")]
    ResourceReference {
        name: String,
        reference: String,
        #[source]
        source: Box<CoreError>,
    },

    #[error("could not read label {label:?} on resource {resource:?}: {message}")]
    InvalidLabel {
        label: String,
        resource: String,
        message: String,
    },

    // ============ Chart Errors ============
    #[error("Invalid chart: {message}")]
    InvalidChart { message: String },

    #[error("Chart.yaml and Chart.lock in {path} do not agree: {message}")]
    DependencyMismatch { path: String, message: String },

    #[error("while validating subcharts of {path}: {message}")]
    Subcharts { path: String, message: String },

    // ============ Git Errors ============
    #[error("could not run `git -C {path:?} {args}`: {message}")]
    Git {
        path: String,
        args: String,
        message: String,
    },

    // ============ Archive Errors ============
    #[error(
        "refusing to extract file {path:?} which looks like it wants to exploit a path-traversal vulnerability"
    )]
    UnsafeArchivePath { path: String },

    #[error("do not know how to extract non-regular file {path:?}")]
    UnsupportedArchiveEntry { path: String },

    // ============ Passthrough ============
    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Wrap an error with the raw declaration text that caused it
    pub fn in_declaration(self, input: impl Into<String>) -> Self {
        CoreError::Declaration {
            input: input.into(),
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
