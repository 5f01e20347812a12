use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use courtside_core::errors::ActionError;
use courtside_core::identity::UserIdentity;
use courtside_core::registry::{AgentId, AgentRegistry};
use courtside_core::trace::{
    ExchangeStatus, FlowStep, RequestTrace, StepStatus, TokenExchangeRecord,
};
use uuid::Uuid;

use crate::exchange::{IdentityProvider, TokenExchangeEngine};
use crate::router::{IntentClassifier, KeywordClassifier, Router};

/// The external collaborator that performs domain work once an agent holds a
/// delegated token. The orchestrator is the only component that calls it.
#[async_trait]
pub trait AgentAction: Send + Sync {
    async fn invoke(
        &self,
        agent: AgentId,
        granted_scopes: &[String],
        message: &str,
    ) -> Result<String, ActionError>;
}

/// A validated identity plus the raw bearer assertion it came from. `None`
/// at the inbound boundary means anonymous: empty groups, no assertion.
#[derive(Clone, Debug)]
pub struct AssertedUser {
    pub identity: UserIdentity,
    pub assertion: String,
}

#[derive(Clone, Debug)]
pub struct OrchestratorResponse {
    pub content: String,
    pub agent_flow: Vec<FlowStep>,
    pub token_exchanges: Vec<TokenExchangeRecord>,
    pub user: UserIdentity,
    pub correlation_id: String,
}

/// Request lifecycle states. `Done` and `Error` are terminal; a new request
/// starts a fresh instance, there is no retry inside the machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestPhase {
    Pending,
    Routed,
    Exchanging,
    Aggregated,
    Done,
    Error,
}

impl RequestPhase {
    /// Allowed transition table. Per-agent Executed/Skipped outcomes live in
    /// the trace; the machine stays in `Exchanging` while agents remain.
    pub fn can_advance_to(self, next: RequestPhase) -> bool {
        use RequestPhase::{Aggregated, Done, Error, Exchanging, Pending, Routed};
        matches!(
            (self, next),
            (Pending, Routed)
                | (Pending, Error)
                | (Routed, Exchanging)
                | (Routed, Aggregated)
                | (Exchanging, Exchanging)
                | (Exchanging, Aggregated)
                | (Aggregated, Done)
        )
    }
}

struct Contribution {
    agent_name: String,
    body: String,
}

struct Skipped {
    agent_name: String,
    status: ExchangeStatus,
    error: Option<String>,
}

/// Top-level coordinator: routes the request, runs one token exchange per
/// selected agent, invokes granted agents, and assembles the trace and final
/// content. Stateless across requests; the registry is the only shared state
/// and it is read-only.
pub struct Orchestrator<P, A, C = KeywordClassifier> {
    registry: Arc<AgentRegistry>,
    router: Router<C>,
    engine: TokenExchangeEngine<P>,
    action: A,
    action_timeout_secs: u64,
}

impl<P, A> Orchestrator<P, A>
where
    P: IdentityProvider,
    A: AgentAction,
{
    pub fn new(
        registry: Arc<AgentRegistry>,
        engine: TokenExchangeEngine<P>,
        action: A,
        action_timeout_secs: u64,
    ) -> Self {
        Self { registry, router: Router::new(), engine, action, action_timeout_secs }
    }
}

impl<P, A, C> Orchestrator<P, A, C>
where
    P: IdentityProvider,
    A: AgentAction,
    C: IntentClassifier,
{
    pub fn with_classifier(
        registry: Arc<AgentRegistry>,
        router: Router<C>,
        engine: TokenExchangeEngine<P>,
        action: A,
        action_timeout_secs: u64,
    ) -> Self {
        Self { registry, router, engine, action, action_timeout_secs }
    }

    /// Processes one request end to end. Per-agent denial and failure are
    /// captured into the trace and never abort the request; only a routing
    /// failure produces an error response, and even that returns normally.
    pub async fn handle_request(
        &self,
        message: &str,
        user: Option<AssertedUser>,
    ) -> OrchestratorResponse {
        let correlation_id = Uuid::new_v4().to_string();
        let (identity, assertion) = match user {
            Some(asserted) => (asserted.identity, Some(asserted.assertion)),
            None => (UserIdentity::anonymous(), None),
        };

        tracing::info!(
            event_name = "orchestrator.request_received",
            correlation_id = %correlation_id,
            subject = %identity.subject,
            "processing request"
        );

        let trace = RequestTrace::new();
        let mut phase = RequestPhase::Pending;

        let routed = match self.router.route(message, &self.registry) {
            Ok(agents) => agents,
            Err(error) => {
                self.advance(phase, RequestPhase::Error, &correlation_id);
                trace.push_step(FlowStep::new("error", error.to_string(), StepStatus::Error));
                let (agent_flow, token_exchanges) = trace.into_parts();
                return OrchestratorResponse {
                    content: format!(
                        "I could not route this request to any agent: {error}. Please try again later."
                    ),
                    agent_flow,
                    token_exchanges,
                    user: identity,
                    correlation_id,
                };
            }
        };

        phase = self.advance(phase, RequestPhase::Routed, &correlation_id);
        trace.push_step(
            FlowStep::new(
                "routing",
                format!("selected {} agent(s)", routed.len()),
                StepStatus::Completed,
            )
            .with_agents(routed.clone()),
        );

        let mut contributions: Vec<Contribution> = Vec::new();
        let mut skipped: Vec<Skipped> = Vec::new();

        for agent_id in &routed {
            phase = self.advance(phase, RequestPhase::Exchanging, &correlation_id);

            let config = match self.registry.get(*agent_id) {
                Ok(config) => config,
                Err(error) => {
                    // Router only emits configured agents; keep the
                    // one-record-per-routed-agent invariant regardless.
                    let record = TokenExchangeRecord::error(
                        *agent_id,
                        agent_id.to_string(),
                        String::new(),
                        error.to_string(),
                    );
                    skipped.push(Skipped {
                        agent_name: agent_id.to_string(),
                        status: ExchangeStatus::Error,
                        error: Some(error.to_string()),
                    });
                    trace.push_step(FlowStep::new(
                        "token_exchange",
                        format!("{agent_id} token exchange"),
                        StepStatus::Error,
                    ));
                    trace.push_exchange(record);
                    continue;
                }
            };

            let record = self.engine.exchange(&identity, assertion.as_deref(), config).await;
            trace.push_step(
                FlowStep::new(
                    "token_exchange",
                    format!("{} token exchange", config.name),
                    step_status(record.status),
                )
                .with_color(config.color.clone()),
            );

            let granted_scopes = record.scopes.clone();
            let outcome = (record.status, record.error.clone());
            trace.push_exchange(record);

            match outcome {
                (ExchangeStatus::Granted, _) => {
                    let invocation = self.invoke_action(*agent_id, &granted_scopes, message).await;
                    match invocation {
                        Ok(output) => {
                            trace.push_step(
                                FlowStep::new(
                                    "execution",
                                    format!("{} responded", config.name),
                                    StepStatus::Completed,
                                )
                                .with_color(config.color.clone()),
                            );
                            contributions
                                .push(Contribution { agent_name: config.name.clone(), body: output });
                        }
                        Err(error) => {
                            // Execution faults surface as that agent's
                            // contribution without touching its granted record.
                            trace.push_step(
                                FlowStep::new(
                                    "execution",
                                    format!("{} failed: {error}", config.name),
                                    StepStatus::Error,
                                )
                                .with_color(config.color.clone()),
                            );
                            contributions.push(Contribution {
                                agent_name: config.name.clone(),
                                body: format!("The agent could not complete the request: {error}"),
                            });
                        }
                    }
                }
                (status, error) => {
                    skipped.push(Skipped { agent_name: config.name.clone(), status, error });
                }
            }
        }

        phase = self.advance(phase, RequestPhase::Aggregated, &correlation_id);
        let content = aggregate(&contributions, &skipped);
        trace.push_step(FlowStep::new(
            "aggregation",
            format!("{} executed, {} skipped", contributions.len(), skipped.len()),
            StepStatus::Completed,
        ));
        phase = self.advance(phase, RequestPhase::Done, &correlation_id);

        tracing::info!(
            event_name = "orchestrator.request_done",
            correlation_id = %correlation_id,
            routed = routed.len(),
            executed = contributions.len(),
            skipped = skipped.len(),
            "request complete"
        );
        debug_assert_eq!(phase, RequestPhase::Done);

        let (agent_flow, token_exchanges) = trace.into_parts();
        OrchestratorResponse { content, agent_flow, token_exchanges, user: identity, correlation_id }
    }

    async fn invoke_action(
        &self,
        agent: AgentId,
        granted_scopes: &[String],
        message: &str,
    ) -> Result<String, ActionError> {
        let invoke = self.action.invoke(agent, granted_scopes, message);
        tokio::time::timeout(Duration::from_secs(self.action_timeout_secs), invoke)
            .await
            .unwrap_or(Err(ActionError::Timeout(self.action_timeout_secs)))
    }

    fn advance(
        &self,
        current: RequestPhase,
        next: RequestPhase,
        correlation_id: &str,
    ) -> RequestPhase {
        debug_assert!(current.can_advance_to(next), "invalid transition {current:?} -> {next:?}");
        tracing::debug!(
            event_name = "orchestrator.phase",
            correlation_id = %correlation_id,
            from = ?current,
            to = ?next,
            "phase transition"
        );
        next
    }
}

fn step_status(status: ExchangeStatus) -> StepStatus {
    match status {
        ExchangeStatus::Granted => StepStatus::Granted,
        ExchangeStatus::Denied => StepStatus::Denied,
        ExchangeStatus::Error => StepStatus::Error,
    }
}

fn aggregate(contributions: &[Contribution], skipped: &[Skipped]) -> String {
    if contributions.is_empty() {
        let mut lines =
            vec!["No agent was authorized to act on this request.".to_string()];
        for entry in skipped {
            lines.push(skip_line(entry));
        }
        return lines.join("\n");
    }

    let mut sections = contributions
        .iter()
        .map(|contribution| format!("**{}**\n{}", contribution.agent_name, contribution.body))
        .collect::<Vec<_>>();

    if !skipped.is_empty() {
        let mut lines = vec!["Some agents could not participate:".to_string()];
        for entry in skipped {
            lines.push(skip_line(entry));
        }
        sections.push(lines.join("\n"));
    }

    sections.join("\n\n")
}

fn skip_line(entry: &Skipped) -> String {
    match (entry.status, &entry.error) {
        (ExchangeStatus::Denied, _) => {
            format!("- {}: access was not authorized for your groups", entry.agent_name)
        }
        (_, Some(error)) => format!("- {}: token exchange failed ({error})", entry.agent_name),
        (_, None) => format!("- {}: token exchange failed", entry.agent_name),
    }
}

#[cfg(test)]
mod tests {
    use super::RequestPhase;

    #[test]
    fn phase_table_allows_the_documented_lifecycle() {
        use RequestPhase::{Aggregated, Done, Error, Exchanging, Pending, Routed};
        assert!(Pending.can_advance_to(Routed));
        assert!(Pending.can_advance_to(Error));
        assert!(Routed.can_advance_to(Exchanging));
        assert!(Exchanging.can_advance_to(Exchanging));
        assert!(Exchanging.can_advance_to(Aggregated));
        assert!(Aggregated.can_advance_to(Done));
        // routing an empty agent set still aggregates
        assert!(Routed.can_advance_to(Aggregated));
    }

    #[test]
    fn terminal_phases_do_not_advance() {
        use RequestPhase::{Done, Error, Pending, Routed};
        assert!(!Done.can_advance_to(Pending));
        assert!(!Error.can_advance_to(Routed));
        assert!(!Done.can_advance_to(Done));
    }
}
