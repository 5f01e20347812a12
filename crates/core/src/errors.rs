use thiserror::Error;

use crate::registry::RegistryError;

/// Identity-provider faults. Transport failures and timeouts are converted to
/// per-agent `error` exchange records by the engine and never raise past it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{0}")]
    Exchange(String),
    #[error("identity provider timed out after {0}s")]
    Timeout(u64),
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Faults raised by the external agent-action collaborator. Caught per agent:
/// one agent's execution failure never aborts the others.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("agent action failed: {0}")]
    Failed(String),
    #[error("agent action timed out after {0}s")]
    Timeout(u64),
}

/// The only whole-request failure class. Everything else is captured into the
/// per-agent records of the trace and still yields a completed response.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RoutingFailure {
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[cfg(test)]
mod tests {
    use crate::registry::RegistryError;

    use super::{ProviderError, RoutingFailure};

    #[test]
    fn provider_exchange_message_is_verbatim() {
        let error = ProviderError::Exchange("invalid_grant: audience mismatch".to_string());
        assert_eq!(error.to_string(), "invalid_grant: audience mismatch");
    }

    #[test]
    fn routing_failure_wraps_registry_errors() {
        let failure = RoutingFailure::from(RegistryError::EmptyRegistry);
        assert_eq!(failure.to_string(), "agent registry is empty");
    }
}
