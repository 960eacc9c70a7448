//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Chart error - invalid Chart.yaml, Chart.lock or subcharts
pub const CHART_ERROR: i32 = 3;

/// Component error - the component version lacks or misdescribes a resource
pub const COMPONENT_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Relation error - an image relation could not be parsed, named or localized
///
/// Not 2, which clap uses for malformed command lines.
pub const RELATION_ERROR: i32 = 6;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;

/// Unavailable - a required external program could not be run (sysexits.h EX_UNAVAILABLE)
pub const UNAVAILABLE: i32 = 69;
