//! Verification helpers for testing the switch engine
//!
//! Provides assertion helpers over the fakes' state and the shared call log

use thiserror::Error;

use crate::fixtures::TestEnv;
use crate::recorder::CallLog;

/// Verification error types
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Expected port '{port}' in config store")]
    PortMissing { port: String },

    #[error("Port '{port}' still present in config store")]
    PortLeftover { port: String },

    #[error("Link '{link}' still present")]
    LinkLeftover { link: String },

    #[error("Agent still holds {count} endpoint(s)")]
    EndpointsLeftover { count: usize },

    #[error("Expected a call starting with '{prefix}'")]
    CallMissing { prefix: String },

    #[error("Expected '{first}' before '{second}'")]
    OrderMismatch { first: String, second: String },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Checks that the calls matching `prefixes` happened in that order.
pub fn assert_call_order(log: &CallLog, prefixes: &[&str]) -> VerifyResult<()> {
    let mut previous: Option<(usize, &str)> = None;
    for prefix in prefixes {
        let index = log.index_of(prefix).ok_or_else(|| VerificationError::CallMissing {
            prefix: prefix.to_string(),
        })?;
        if let Some((prev_index, prev_prefix)) = previous {
            if index <= prev_index {
                return Err(VerificationError::OrderMismatch {
                    first: prev_prefix.to_string(),
                    second: prefix.to_string(),
                });
            }
        }
        previous = Some((index, prefix));
    }
    Ok(())
}

/// State verifier over one [`TestEnv`]
pub struct StateVerifier<'a> {
    env: &'a TestEnv,
}

impl<'a> StateVerifier<'a> {
    pub fn new(env: &'a TestEnv) -> Self {
        Self { env }
    }

    pub fn assert_port_present(&self, port: &str) -> VerifyResult<()> {
        if !self.env.store.has_port(port) {
            return Err(VerificationError::PortMissing {
                port: port.to_string(),
            });
        }
        Ok(())
    }

    pub fn assert_port_absent(&self, port: &str) -> VerifyResult<()> {
        if self.env.store.has_port(port) {
            return Err(VerificationError::PortLeftover {
                port: port.to_string(),
            });
        }
        Ok(())
    }

    pub fn assert_link_absent(&self, link: &str) -> VerifyResult<()> {
        if self.env.link.exists(link) {
            return Err(VerificationError::LinkLeftover {
                link: link.to_string(),
            });
        }
        Ok(())
    }

    /// No link, store or agent state left behind for a paired port.
    pub fn assert_port_cleaned(&self, intf_name: &str, port_name: &str) -> VerifyResult<()> {
        self.assert_port_absent(port_name)?;
        self.assert_link_absent(intf_name)?;
        self.assert_link_absent(port_name)?;

        let count = self.env.agent.endpoints().len();
        if count != 0 {
            return Err(VerificationError::EndpointsLeftover { count });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_order() {
        let log = CallLog::new();
        log.record("link", "create_veth_pair", "a b");
        log.record("store", "create_port", "b");

        assert!(assert_call_order(&log, &["link.create_veth_pair", "store.create_port"]).is_ok());
        assert!(matches!(
            assert_call_order(&log, &["store.create_port", "link.create_veth_pair"]),
            Err(VerificationError::OrderMismatch { .. })
        ));
        assert!(matches!(
            assert_call_order(&log, &["agent.add_local_endpoint"]),
            Err(VerificationError::CallMissing { .. })
        ));
    }

    #[test]
    fn test_port_presence() {
        let env = TestEnv::new();
        let verifier = StateVerifier::new(&env);
        env.store.seed_port("vport1");

        assert!(verifier.assert_port_present("vport1").is_ok());
        assert!(verifier.assert_port_absent("vport1").is_err());
        assert!(verifier.assert_port_cleaned("port2", "vport2").is_ok());
    }
}
