//! Orchestration runtime - routing, token exchange, and agent coordination
//!
//! This crate is the "traffic control" of the courtside system:
//! - Routes natural-language requests to the agents whose domain they touch
//! - Performs a per-agent identity-assertion token exchange, gated by the
//!   caller's group memberships and the agent's required scopes
//! - Tolerates partial denial/failure: one agent's denial never aborts the rest
//! - Produces the ordered flow-step and token-exchange trace for operators
//!
//! # Architecture
//!
//! The orchestrator follows a fixed lifecycle:
//! 1. **Routing** (`router`) - Select the ordered agent set for the message
//! 2. **Token Exchange** (`exchange`) - One scoped delegated token per agent
//! 3. **Execution** (`orchestrator`) - Invoke granted agents, skip the rest
//! 4. **Aggregation** - Merge agent outputs and name every denied agent
//!
//! # Key Types
//!
//! - `Orchestrator` - Request lifecycle coordinator (see `orchestrator`)
//! - `TokenExchangeEngine` / `IdentityProvider` - Delegated-token seam
//! - `Router` / `IntentClassifier` - Pluggable classification signal
//!
//! # Safety Principle
//!
//! Authorization is fail-closed: an agent granted only part of its required
//! scope set is never invoked. The classifier only picks domains; it never
//! decides access.

pub mod exchange;
pub mod orchestrator;
pub mod provider;
pub mod router;

pub use exchange::{IdentityProvider, TokenExchangeEngine, UnconfiguredProvider};
pub use orchestrator::{
    AgentAction, AssertedUser, Orchestrator, OrchestratorResponse, RequestPhase,
};
pub use provider::HttpTokenClient;
pub use router::{IntentClassifier, KeywordClassifier, Router};
