use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::registry::AgentId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeStatus {
    Granted,
    Denied,
    Error,
}

/// One token-exchange decision for one agent. Exactly one record exists per
/// routed agent, even when the exchange errors; immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenExchangeRecord {
    pub record_id: String,
    pub agent: AgentId,
    pub agent_name: String,
    pub color: String,
    pub status: ExchangeStatus,
    pub scopes: Vec<String>,
    pub error: Option<String>,
    pub demo_mode: bool,
    pub occurred_at: DateTime<Utc>,
}

impl TokenExchangeRecord {
    pub fn granted(
        agent: AgentId,
        agent_name: impl Into<String>,
        color: impl Into<String>,
        scopes: Vec<String>,
        demo_mode: bool,
    ) -> Self {
        Self::build(agent, agent_name, color, ExchangeStatus::Granted, scopes, None, demo_mode)
    }

    /// Denial is an expected outcome, not a fault: the record carries the
    /// grantable subset for diagnostic display and no error message.
    pub fn denied(
        agent: AgentId,
        agent_name: impl Into<String>,
        color: impl Into<String>,
        grantable_scopes: Vec<String>,
    ) -> Self {
        Self::build(
            agent,
            agent_name,
            color,
            ExchangeStatus::Denied,
            grantable_scopes,
            None,
            false,
        )
    }

    pub fn error(
        agent: AgentId,
        agent_name: impl Into<String>,
        color: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::build(
            agent,
            agent_name,
            color,
            ExchangeStatus::Error,
            Vec::new(),
            Some(message.into()),
            false,
        )
    }

    fn build(
        agent: AgentId,
        agent_name: impl Into<String>,
        color: impl Into<String>,
        status: ExchangeStatus,
        scopes: Vec<String>,
        error: Option<String>,
        demo_mode: bool,
    ) -> Self {
        Self {
            record_id: Uuid::new_v4().to_string(),
            agent,
            agent_name: agent_name.into(),
            color: color.into(),
            status,
            scopes,
            error,
            demo_mode,
            occurred_at: Utc::now(),
        }
    }

    pub fn is_granted(&self) -> bool {
        self.status == ExchangeStatus::Granted
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Granted,
    Denied,
    Error,
}

/// A named stage of orchestration, used purely for external audit and
/// visualization. Steps are appended in strict chronological order and never
/// edited afterward.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStep {
    pub step: String,
    pub action: String,
    pub status: StepStatus,
    pub color: Option<String>,
    pub agents: Option<Vec<AgentId>>,
    pub occurred_at: DateTime<Utc>,
}

impl FlowStep {
    pub fn new(step: impl Into<String>, action: impl Into<String>, status: StepStatus) -> Self {
        Self {
            step: step.into(),
            action: action.into(),
            status,
            color: None,
            agents: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_agents(mut self, agents: Vec<AgentId>) -> Self {
        self.agents = Some(agents);
        self
    }
}

#[derive(Debug, Default)]
struct TraceInner {
    steps: Vec<FlowStep>,
    exchanges: Vec<TokenExchangeRecord>,
}

/// Append-only audit trail for one request. Owned by the orchestrator
/// invocation that created it and discarded once the response is returned.
/// Appends are serialized behind a mutex so records stay attributable even if
/// per-agent work is ever fanned out.
#[derive(Clone, Debug, Default)]
pub struct RequestTrace {
    inner: Arc<Mutex<TraceInner>>,
}

impl RequestTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_step(&self, step: FlowStep) {
        match self.inner.lock() {
            Ok(mut inner) => inner.steps.push(step),
            Err(poisoned) => poisoned.into_inner().steps.push(step),
        }
    }

    pub fn push_exchange(&self, record: TokenExchangeRecord) {
        match self.inner.lock() {
            Ok(mut inner) => inner.exchanges.push(record),
            Err(poisoned) => poisoned.into_inner().exchanges.push(record),
        }
    }

    pub fn steps(&self) -> Vec<FlowStep> {
        match self.inner.lock() {
            Ok(inner) => inner.steps.clone(),
            Err(poisoned) => poisoned.into_inner().steps.clone(),
        }
    }

    pub fn exchanges(&self) -> Vec<TokenExchangeRecord> {
        match self.inner.lock() {
            Ok(inner) => inner.exchanges.clone(),
            Err(poisoned) => poisoned.into_inner().exchanges.clone(),
        }
    }

    /// Consumes the trace into its ordered parts.
    pub fn into_parts(self) -> (Vec<FlowStep>, Vec<TokenExchangeRecord>) {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => {
                let inner = mutex.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
                (inner.steps, inner.exchanges)
            }
            Err(shared) => match shared.lock() {
                Ok(inner) => (inner.steps.clone(), inner.exchanges.clone()),
                Err(poisoned) => {
                    let inner = poisoned.into_inner();
                    (inner.steps.clone(), inner.exchanges.clone())
                }
            },
        }
    }
}
