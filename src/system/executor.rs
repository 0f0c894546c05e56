// src/system/executor.rs

use crate::system::quoting::escape_cmd;
use std::path::Path;
use std::process::{Command as StdCommand, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("No command specified to run.")]
    EmptyCommand,
    #[error("Command '{0}' could not be executed: {1}")]
    CommandFailed(String, #[source] std::io::Error),
    #[error("Command '{command}' exited with a non-zero error code ({}).", describe_code(.code))]
    NonZeroExitStatus { command: String, code: Option<i32> },
}

fn describe_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "terminated by signal".to_string(), |c| c.to_string())
}

/// Runs `argv` to completion with stdio inherited from this process.
///
/// `env` is added on top of the inherited environment. When `cwd` is given the
/// child starts there. Blocks until the child exits; there is no timeout.
pub fn execute_command<S: AsRef<str>>(
    argv: &[S],
    env: &[(String, String)],
    cwd: Option<&Path>,
) -> Result<(), ExecutionError> {
    let (program, args) = argv.split_first().ok_or(ExecutionError::EmptyCommand)?;
    let command_line = escape_cmd(argv);

    let mut command = StdCommand::new(program.as_ref());
    command
        .args(args.iter().map(AsRef::as_ref))
        .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    if let Some(cwd) = cwd {
        command.current_dir(dunce::simplified(cwd));
    }

    let status = command
        .status()
        .map_err(|e| ExecutionError::CommandFailed(command_line.clone(), e))?;

    if status.success() {
        Ok(())
    } else {
        Err(ExecutionError::NonZeroExitStatus {
            command: command_line,
            code: status.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_empty_command() {
        let argv: [&str; 0] = [];
        assert!(matches!(
            execute_command(&argv, &[], None),
            Err(ExecutionError::EmptyCommand)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_env_and_cwd_are_passed() {
        let dir = tempdir().unwrap();
        let env = vec![("BDEBSTRAP_TEST_VALUE".to_string(), "hello".to_string())];
        execute_command(
            &["sh", "-c", "printf '%s' \"$BDEBSTRAP_TEST_VALUE\" > out.txt"],
            &env,
            Some(dir.path()),
        )
        .unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_status() {
        let err = execute_command(&["sh", "-c", "exit 3"], &[], None).unwrap_err();
        match err {
            ExecutionError::NonZeroExitStatus { command, code } => {
                assert_eq!(code, Some(3));
                assert_eq!(command, r#"sh -c "exit 3""#);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_program() {
        let err = execute_command(&["bdebstrap-no-such-program"], &[], None).unwrap_err();
        assert!(matches!(err, ExecutionError::CommandFailed(..)));
    }
}
