//! Shell command execution for link-layer and `ovs-vsctl` operations.
//!
//! Every argument that originates from a caller (interface names, MAC
//! addresses, IPs) must go through [`shellquote`] before it is spliced into
//! a command line.
//!
//! ```ignore
//! use ovsnet_common::shell::{self, IP_CMD, shellquote};
//!
//! let cmd = format!("{} link set dev {} up", IP_CMD, shellquote("vport1"));
//! shell::exec_or_throw(&cmd).await?;
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{SwitchError, SwitchResult};

/// Path to the `ip` command for link configuration.
pub const IP_CMD: &str = "/sbin/ip";

/// Path to the `ovs-vsctl` command for OVSDB configuration.
pub const OVS_VSCTL_CMD: &str = "/usr/bin/ovs-vsctl";

/// Characters that need escaping inside shell double quotes:
/// `$`, `` ` ``, `"`, `\` and newline.
static SHELL_ESCAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([$`"\\\n])"#).expect("Invalid regex pattern"));

/// Quotes a string for safe use in shell commands.
///
/// ```
/// use ovsnet_common::shell::shellquote;
///
/// assert_eq!(shellquote("vport1"), "\"vport1\"");
/// assert_eq!(shellquote("a$b"), "\"a\\$b\"");
/// ```
pub fn shellquote(s: &str) -> String {
    let escaped = SHELL_ESCAPE_RE.replace_all(s, r"\$1");
    format!("\"{}\"", escaped)
}

/// Result of a shell command execution.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// Exit code (0 = success, -1 when killed by a signal).
    pub exit_code: i32,
    /// Trimmed stdout.
    pub stdout: String,
    /// Trimmed stderr.
    pub stderr: String,
}

impl ExecResult {
    /// Returns true if the command succeeded.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns stdout and stderr joined, for error messages.
    pub fn combined_output(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }

    /// Iterates over the non-empty stdout lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines().map(str::trim).filter(|l| !l.is_empty())
    }
}

/// Runs a command line through `/bin/sh -c`.
///
/// Only a spawn failure is an error; a non-zero exit is reported in the
/// returned [`ExecResult`].
pub async fn exec(cmd: &str) -> SwitchResult<ExecResult> {
    tracing::debug!(command = %cmd, "Executing shell command");

    let output = Command::new("/bin/sh")
        .arg("-c")
        .arg(cmd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| SwitchError::ShellExec {
            command: cmd.to_string(),
            source: e,
        })?;

    let result = ExecResult {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    };

    if result.success() {
        tracing::trace!(command = %cmd, "Command succeeded");
    } else {
        tracing::warn!(
            command = %cmd,
            exit_code = result.exit_code,
            stderr = %result.stderr,
            "Command failed"
        );
    }

    Ok(result)
}

/// Runs a command and converts a non-zero exit into
/// [`SwitchError::ShellCommandFailed`]. Returns stdout on success.
pub async fn exec_or_throw(cmd: &str) -> SwitchResult<String> {
    let result = exec(cmd).await?;
    if result.success() {
        Ok(result.stdout)
    } else {
        Err(SwitchError::ShellCommandFailed {
            command: cmd.to_string(),
            exit_code: result.exit_code,
            output: result.combined_output(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shellquote_interface_names() {
        assert_eq!(shellquote("vport1"), "\"vport1\"");
        assert_eq!(shellquote("vxif010000000001"), "\"vxif010000000001\"");
        assert_eq!(shellquote(""), "\"\"");
    }

    #[test]
    fn test_shellquote_special_chars() {
        assert_eq!(shellquote("$HOME"), "\"\\$HOME\"");
        assert_eq!(shellquote("`id`"), "\"\\`id\\`\"");
        assert_eq!(shellquote("a\"b"), "\"a\\\"b\"");
        assert_eq!(shellquote("a\\b"), "\"a\\\\b\"");
    }

    #[test]
    fn test_shellquote_injection() {
        let quoted = shellquote("eth0; rm -rf /");
        assert_eq!(quoted, "\"eth0; rm -rf /\"");
    }

    #[test]
    fn test_exec_result_output() {
        let only_err = ExecResult {
            exit_code: 1,
            stdout: String::new(),
            stderr: "Cannot find device".to_string(),
        };
        assert!(!only_err.success());
        assert_eq!(only_err.combined_output(), "Cannot find device");

        let both = ExecResult {
            exit_code: 0,
            stdout: "out".to_string(),
            stderr: "err".to_string(),
        };
        assert_eq!(both.combined_output(), "out\nerr");
    }

    #[test]
    fn test_exec_result_lines() {
        let result = ExecResult {
            exit_code: 0,
            stdout: "vport1\n\n  vport2 \n".to_string(),
            stderr: String::new(),
        };
        let lines: Vec<&str> = result.lines().collect();
        assert_eq!(lines, vec!["vport1", "vport2"]);
    }

    #[tokio::test]
    async fn test_exec_echo() {
        let result = exec("echo hello").await.unwrap();
        assert!(result.success());
        assert_eq!(result.stdout, "hello");
    }

    #[tokio::test]
    async fn test_exec_or_throw_failure() {
        match exec_or_throw("exit 3").await {
            Err(SwitchError::ShellCommandFailed { exit_code, .. }) => assert_eq!(exit_code, 3),
            other => panic!("Expected ShellCommandFailed, got {:?}", other),
        }
    }
}
