//! External tool execution.
//!
//! `psql` and `raster2pgsql` are run as subprocesses with captured
//! stdout/stderr. Binaries resolve through the `TILEGRID_PG_BIN`
//! environment variable (a directory) when set, otherwise plain names on
//! `PATH`.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Directory override for the PostgreSQL client binaries.
pub const PG_BIN_ENV: &str = "TILEGRID_PG_BIN";

/// Captured output of an external tool run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: i32,
}

impl ToolOutput {
    /// Whether the run should be treated as successful. The PostgreSQL
    /// client exits zero even when a statement inside a multi-statement
    /// script fails, so stderr is inspected as well.
    pub fn success(&self) -> bool {
        self.code == 0 && !self.stderr.contains("ERROR")
    }
}

/// Resolve a tool binary, honoring the `TILEGRID_PG_BIN` override.
pub fn tool_path(name: &str) -> PathBuf {
    match std::env::var(PG_BIN_ENV) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir).join(name),
        _ => PathBuf::from(name),
    }
}

/// Run a tool to completion, capturing its output.
///
/// `envs` lets callers pass credentials (e.g. `PGPASSWORD`) without
/// mutating the process environment.
pub async fn run_tool(
    name: &str,
    args: &[String],
    envs: &[(&str, String)],
) -> StoreResult<ToolOutput> {
    let program = tool_path(name);
    debug!(tool = %program.display(), ?args, "running external tool");

    let mut command = Command::new(&program);
    command
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in envs {
        command.env(key, value);
    }

    let output = command.output().await?;
    Ok(ToolOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        code: output.status.code().unwrap_or(-1),
    })
}

/// Convert a failed run into a `StoreError::Tool`, passing success through.
pub fn check(tool: &str, output: ToolOutput) -> StoreResult<ToolOutput> {
    if output.success() {
        Ok(output)
    } else {
        Err(StoreError::Tool {
            tool: tool.to_string(),
            stdout: output.stdout,
            stderr: output.stderr,
            code: output.code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_run_is_success() {
        let output = ToolOutput {
            stdout: "INSERT 0 1".into(),
            stderr: String::new(),
            code: 0,
        };
        assert!(output.success());
    }

    #[test]
    fn nonzero_exit_is_failure() {
        let output = ToolOutput {
            code: 2,
            ..Default::default()
        };
        assert!(!output.success());
    }

    #[test]
    fn error_on_stderr_is_failure_despite_zero_exit() {
        let output = ToolOutput {
            stderr: "psql: ERROR:  relation does not exist".into(),
            code: 0,
            ..Default::default()
        };
        assert!(!output.success());
    }

    #[test]
    fn check_maps_failure_to_tool_error() {
        let output = ToolOutput {
            stderr: "ERROR: boom".into(),
            code: 3,
            ..Default::default()
        };
        let err = check("psql", output).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Tool { tool, code: 3, .. } if tool == "psql"
        ));
    }

    #[tokio::test]
    async fn missing_binary_is_an_io_error() {
        // Resolution falls back to PATH; a name that cannot exist there
        // fails to spawn.
        let result = run_tool("tilegrid-no-such-tool", &[], &[]).await;
        assert!(matches!(result, Err(StoreError::Io(_))));
    }
}
