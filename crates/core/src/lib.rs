pub mod access;
pub mod config;
pub mod errors;
pub mod identity;
pub mod registry;
pub mod trace;

pub use access::{AccessPolicy, ScopeGrant};
pub use errors::{ActionError, ProviderError, RoutingFailure};
pub use identity::UserIdentity;
pub use registry::{AgentConfig, AgentCredential, AgentId, AgentRegistry, RegistryError};
pub use trace::{ExchangeStatus, FlowStep, RequestTrace, StepStatus, TokenExchangeRecord};
