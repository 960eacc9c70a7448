//! `${VARIABLE}` and `$(command)` substitution for image relation declarations
//!
//! This is deliberately not a shell: variables are only recognized in the
//! braced form, and a command substitution is a bare list of words that is
//! executed directly, without quoting, globbing or nesting.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::process::{Command, Stdio};

use crate::error::{CoreError, Result};

static VARIABLE_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*)\}").expect("valid regex"));

static COMMAND_SUBSTITUTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\(([^)]*)\)").expect("valid regex"));

/// Characters that indicate the caller expected a real shell
const SHELL_SYNTAX: &[char] = &['(', ')', '[', ']', '{', '}', '`', '"', '\''];

/// Source of environment variables and command output
pub trait Environment {
    /// Look up an environment variable
    fn var(&self, name: &str) -> Option<String>;

    /// Run a program and return its standard output
    fn run_command(&self, program: &str, args: &[&str]) -> Result<String>;
}

/// The environment of the current process
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn run_command(&self, program: &str, args: &[&str]) -> Result<String> {
        tracing::debug!("executing command {:?} with arguments {:?}", program, args);

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| CoreError::CommandFailed {
                command: display_command(program, args),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(CoreError::CommandFailed {
                command: display_command(program, args),
                reason: output.status.to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn display_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Apply variable substitution, then command substitution
pub fn substitute(input: &str, env: &dyn Environment) -> Result<String> {
    let input = expand_variables(input, env)?;
    expand_commands(&input, env)
}

/// Replace every `${NAME}` with the trimmed value of the variable `NAME`
pub fn expand_variables(input: &str, env: &dyn Environment) -> Result<String> {
    try_replace_all(&VARIABLE_REFERENCE, input, |caps| {
        let name = &caps[1];
        env.var(name)
            .map(|value| value.trim().to_string())
            .ok_or_else(|| CoreError::UnknownVariable {
                name: name.to_string(),
            })
    })
}

/// Replace every `$(program args...)` with the trimmed output of that command
pub fn expand_commands(input: &str, env: &dyn Environment) -> Result<String> {
    try_replace_all(&COMMAND_SUBSTITUTION, input, |caps| {
        let command = &caps[1];
        if command.contains(SHELL_SYNTAX) {
            return Err(CoreError::ShellSyntax {
                command: command.to_string(),
            });
        }

        let words: Vec<&str> = command.split_whitespace().collect();
        let Some((program, args)) = words.split_first() else {
            return Err(CoreError::EmptyCommand {
                command: command.to_string(),
            });
        };

        let output = env.run_command(program, args)?;
        Ok(output.trim().to_string())
    })
}

/// Like `Regex::replace_all`, but the replacement may fail
///
/// Matches are visited left to right and the first error stops the fold,
/// so no replacement after a failing one is ever computed.
fn try_replace_all<F>(rx: &Regex, input: &str, mut replace: F) -> Result<String>
where
    F: FnMut(&Captures<'_>) -> Result<String>,
{
    let (mut out, last) = rx.captures_iter(input).try_fold(
        (String::with_capacity(input.len()), 0usize),
        |(mut out, last), caps| {
            let Some(whole) = caps.get(0) else {
                return Ok((out, last));
            };
            out.push_str(&input[last..whole.start()]);
            out.push_str(&replace(&caps)?);
            Ok::<_, CoreError>((out, whole.end()))
        },
    )?;
    out.push_str(&input[last..]);
    Ok(out)
}


#[cfg(test)]
mod tests {
    use super::mock::MockEnvironment;
    use super::*;

    #[test]
    fn test_variables_are_trimmed() {
        let env = MockEnvironment::new().with_var("VERSION", "  1.25\n");
        let out = expand_variables("nginx:${VERSION}", &env).unwrap();
        assert_eq!(out, "nginx:1.25");
    }

    #[test]
    fn test_multiple_variables() {
        let env = MockEnvironment::new()
            .with_var("REGISTRY", "quay.io")
            .with_var("TAG", "v1");
        let out = expand_variables("${REGISTRY}/org/app:${TAG}", &env).unwrap();
        assert_eq!(out, "quay.io/org/app:v1");
    }

    #[test]
    fn test_unbraced_variable_is_left_alone() {
        let env = MockEnvironment::new().with_var("TAG", "v1");
        let out = expand_variables("app:$TAG", &env).unwrap();
        assert_eq!(out, "app:$TAG");
    }

    #[test]
    fn test_missing_variable_names_the_variable() {
        let env = MockEnvironment::new();
        let err = expand_variables("app:${NOPE}", &env).unwrap_err();
        assert!(matches!(err, CoreError::UnknownVariable { ref name } if name == "NOPE"));
        assert!(err.to_string().contains("NOPE"));
    }

    #[test]
    fn test_command_output_is_trimmed() {
        let env = MockEnvironment::new().with_output("cat version.txt", "1.25\n");
        let out = expand_commands("nginx:$(cat version.txt)", &env).unwrap();
        assert_eq!(out, "nginx:1.25");
        assert_eq!(*env.executed.borrow(), vec!["cat version.txt".to_string()]);
    }

    #[test]
    fn test_command_words_split_on_whitespace() {
        let env = MockEnvironment::new().with_output("git describe --tags", "v3");
        let out = expand_commands("app:$(  git\tdescribe   --tags )", &env).unwrap();
        assert_eq!(out, "app:v3");
    }

    #[test]
    fn test_shell_syntax_is_refused_before_spawning() {
        let env = MockEnvironment::new();
        let err = expand_commands("app:$(cat `version.txt)", &env).unwrap_err();
        assert!(matches!(err, CoreError::ShellSyntax { .. }));
        assert!(err.to_string().contains("shell syntax"));
        assert!(env.executed.borrow().is_empty());
    }

    #[test]
    fn test_quotes_are_refused() {
        let env = MockEnvironment::new();
        let err = expand_commands("app:$(echo 'v1')", &env).unwrap_err();
        assert!(matches!(err, CoreError::ShellSyntax { .. }));
    }

    #[test]
    fn test_empty_command() {
        let env = MockEnvironment::new();
        let err = expand_commands("app:$(   )", &env).unwrap_err();
        assert!(matches!(err, CoreError::EmptyCommand { .. }));
    }

    #[test]
    fn test_first_failure_stops_substitution() {
        let env = MockEnvironment::new().with_output("echo b", "b");
        let err = expand_commands("$(false) $(echo b)", &env).unwrap_err();
        assert!(matches!(err, CoreError::CommandFailed { .. }));
        assert_eq!(*env.executed.borrow(), vec!["false".to_string()]);
    }

    #[test]
    fn test_variables_expand_before_commands() {
        let env = MockEnvironment::new()
            .with_var("FILE", "version.txt")
            .with_output("cat version.txt", "2.0");
        let out = substitute("app:$(cat ${FILE})", &env).unwrap();
        assert_eq!(out, "app:2.0");
    }

    #[test]
    fn test_process_environment_runs_commands() {
        let out = ProcessEnvironment.run_command("echo", &["hello", "world"]).unwrap();
        assert_eq!(out.trim(), "hello world");
    }

    #[test]
    fn test_process_environment_propagates_exit_status() {
        let err = ProcessEnvironment.run_command("false", &[]).unwrap_err();
        assert!(matches!(err, CoreError::CommandFailed { .. }));
    }
}
