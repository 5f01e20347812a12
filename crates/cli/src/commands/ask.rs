use serde::Serialize;

use courtside_agent::{
    AssertedUser, HttpTokenClient, IdentityProvider, Orchestrator, OrchestratorResponse,
    TokenExchangeEngine, UnconfiguredProvider,
};
use courtside_core::config::{AppConfig, LoadOptions};
use courtside_core::identity::UserIdentity;
use courtside_core::trace::{ExchangeStatus, FlowStep, StepStatus, TokenExchangeRecord};
use courtside_tools::DomainAgentAction;
use std::sync::Arc;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct AskReport {
    correlation_id: String,
    content: String,
    user: UserIdentity,
    agent_flow: Vec<FlowStep>,
    token_exchanges: Vec<TokenExchangeRecord>,
}

pub fn run(
    message: &str,
    user: Option<&str>,
    groups: &[String],
    assertion: Option<&str>,
    json_output: bool,
) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "config_validation",
                format!("configuration issue: {error}"),
                crate::commands::EXIT_CONFIG,
            );
        }
    };
    crate::init_logging(&config);

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                crate::commands::EXIT_RUNTIME,
            );
        }
    };

    let provider: Box<dyn IdentityProvider> = match HttpTokenClient::from_config(&config.idp) {
        Some(client) => Box::new(client),
        None => Box::new(UnconfiguredProvider),
    };
    let engine =
        TokenExchangeEngine::new(config.access_policy(), provider, config.idp.timeout_secs);
    let orchestrator = Orchestrator::new(
        Arc::new(config.build_registry()),
        engine,
        DomainAgentAction::default(),
        config.agents.action_timeout_secs,
    );

    let asserted = user.map(|subject| AssertedUser {
        identity: UserIdentity::new(subject, subject, groups.iter().cloned()),
        assertion: assertion.unwrap_or_default().to_string(),
    });

    let response = runtime.block_on(orchestrator.handle_request(message, asserted));

    let output = if json_output { render_json(&response) } else { render_human(&response) };
    CommandResult::ok(output)
}

fn render_json(response: &OrchestratorResponse) -> String {
    let report = AskReport {
        correlation_id: response.correlation_id.clone(),
        content: response.content.clone(),
        user: response.user.clone(),
        agent_flow: response.agent_flow.clone(),
        token_exchanges: response.token_exchanges.clone(),
    };
    serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
        format!(
            "{{\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

fn render_human(response: &OrchestratorResponse) -> String {
    let mut lines = Vec::new();
    lines.push(response.content.clone());
    lines.push(String::new());

    lines.push("Agent flow:".to_string());
    for step in &response.agent_flow {
        lines.push(format!("- [{}] {}: {}", step_marker(step.status), step.step, step.action));
    }

    lines.push(String::new());
    lines.push("Token exchanges:".to_string());
    if response.token_exchanges.is_empty() {
        lines.push("- none".to_string());
    }
    for record in &response.token_exchanges {
        lines.push(exchange_line(record));
    }

    lines.join("\n")
}

fn exchange_line(record: &TokenExchangeRecord) -> String {
    let mode = if record.demo_mode { " (demo)" } else { "" };
    match record.status {
        ExchangeStatus::Granted => {
            format!("- {}: granted [{}]{}", record.agent_name, record.scopes.join(", "), mode)
        }
        ExchangeStatus::Denied => format!("- {}: denied", record.agent_name),
        ExchangeStatus::Error => format!(
            "- {}: error ({})",
            record.agent_name,
            record.error.as_deref().unwrap_or("unknown")
        ),
    }
}

fn step_marker(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Completed => "ok",
        StepStatus::Granted => "granted",
        StepStatus::Denied => "denied",
        StepStatus::Error => "error",
    }
}
