//! Error types for switch provisioning operations.
//!
//! Every fallible operation in the workspace returns [`SwitchResult`].
//! Variants are grouped into a small set of [`ErrorKind`]s that describe how
//! the caller is expected to react.

use std::io;
use thiserror::Error;

/// Result type alias for switch operations.
pub type SwitchResult<T> = Result<T, SwitchError>;

/// Coarse classification of a [`SwitchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad network type / forwarding mode combination or malformed config.
    InvalidConfiguration,
    /// A link-layer or config-store operation failed.
    ResourceUnavailable,
    /// The control agent refused a registration.
    ControlAgentRejected,
    /// Operation invoked against a switch of the wrong type.
    Misuse,
}

/// Errors that can occur while provisioning a switch or its ports.
#[derive(Debug, Error)]
pub enum SwitchError {
    /// Failed to execute a shell command (spawn error).
    #[error("Failed to execute shell command '{command}': {source}")]
    ShellExec {
        /// The command that failed to execute.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Shell command returned non-zero exit code.
    #[error("Shell command failed: '{command}' (exit code {exit_code}): {output}")]
    ShellCommandFailed {
        /// The command that failed.
        command: String,
        /// The exit code.
        exit_code: i32,
        /// Combined stdout/stderr output.
        output: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfiguration {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// A backing resource (config store, kernel link) is unavailable.
    #[error("Resource unavailable: {resource}: {message}")]
    ResourceUnavailable {
        /// The resource or operation that failed.
        resource: String,
        /// Error message.
        message: String,
    },

    /// Port has no forwarding port number yet.
    #[error("Port '{port}' not found or not ready")]
    PortNotReady {
        /// The port name.
        port: String,
    },

    /// Control agent refused a registration or query.
    #[error("Control agent rejected {operation}: {message}")]
    ControlAgentRejected {
        /// The agent operation (e.g. "add_local_endpoint").
        operation: String,
        /// Error message.
        message: String,
    },

    /// Operation is not valid for this switch type.
    #[error("Cannot {operation} on switch of type {network_type}")]
    Misuse {
        /// The operation that was attempted.
        operation: String,
        /// The switch network type.
        network_type: String,
    },

    /// The switch has no control agent bound.
    #[error("No control agent bound to switch {bridge}")]
    NoControlAgent {
        /// The bridge name.
        bridge: String,
    },
}

impl SwitchError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a resource unavailable error.
    pub fn resource_unavailable(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ResourceUnavailable {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Creates a port not ready error.
    pub fn port_not_ready(port: impl Into<String>) -> Self {
        Self::PortNotReady { port: port.into() }
    }

    /// Creates a control agent rejection.
    pub fn agent_rejected(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ControlAgentRejected {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a misuse error.
    pub fn misuse(operation: impl Into<String>, network_type: impl ToString) -> Self {
        Self::Misuse {
            operation: operation.into(),
            network_type: network_type.to_string(),
        }
    }

    /// Returns the coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SwitchError::InvalidConfiguration { .. } => ErrorKind::InvalidConfiguration,
            SwitchError::ShellExec { .. }
            | SwitchError::ShellCommandFailed { .. }
            | SwitchError::ResourceUnavailable { .. }
            | SwitchError::PortNotReady { .. } => ErrorKind::ResourceUnavailable,
            SwitchError::ControlAgentRejected { .. } => ErrorKind::ControlAgentRejected,
            SwitchError::Misuse { .. } | SwitchError::NoControlAgent { .. } => ErrorKind::Misuse,
        }
    }

    /// Returns true if the caller violated a switch-type invariant and must
    /// not continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SwitchError::Misuse { .. })
    }

    /// Returns true if this error indicates a transient condition
    /// that may succeed on retry at a higher level.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SwitchError::PortNotReady { .. }
                | SwitchError::ResourceUnavailable { .. }
                | SwitchError::ShellCommandFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SwitchError::port_not_ready("vport1");
        assert_eq!(err.to_string(), "Port 'vport1' not found or not ready");
    }

    #[test]
    fn test_misuse_display() {
        let err = SwitchError::misuse("add uplink", "host");
        assert_eq!(err.to_string(), "Cannot add uplink on switch of type host");
        assert!(err.is_fatal());
        assert_eq!(err.kind(), ErrorKind::Misuse);
    }

    #[test]
    fn test_shell_command_failed() {
        let err = SwitchError::ShellCommandFailed {
            command: "ip link set dev vport1 mtu 1450".to_string(),
            exit_code: 2,
            output: "Cannot find device".to_string(),
        };
        assert!(err.to_string().contains("ip link set dev"));
        assert!(err.to_string().contains("exit code 2"));
        assert_eq!(err.kind(), ErrorKind::ResourceUnavailable);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            SwitchError::invalid_config("fwd_mode", "bad").kind(),
            ErrorKind::InvalidConfiguration
        );
        assert_eq!(
            SwitchError::agent_rejected("add_uplink", "dup").kind(),
            ErrorKind::ControlAgentRejected
        );
        let no_agent = SwitchError::NoControlAgent {
            bridge: "hostbridge".to_string(),
        };
        assert_eq!(no_agent.kind(), ErrorKind::Misuse);
        assert!(!no_agent.is_fatal());
    }

    #[test]
    fn test_is_retryable() {
        assert!(SwitchError::port_not_ready("vport1").is_retryable());
        assert!(SwitchError::resource_unavailable("ovsdb", "timeout").is_retryable());
        assert!(!SwitchError::misuse("add uplink", "vxlan").is_retryable());
    }
}
