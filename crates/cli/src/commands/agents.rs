use serde::Serialize;

use courtside_core::config::{AppConfig, LoadOptions};

#[derive(Debug, Serialize)]
struct AgentListing {
    id: String,
    name: String,
    description: String,
    color: String,
    required_scopes: Vec<String>,
    mode: &'static str,
}

pub fn run(json_output: bool) -> crate::commands::CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return crate::commands::CommandResult::failure(
                "agents",
                "config_validation",
                format!("configuration issue: {error}"),
                crate::commands::EXIT_CONFIG,
            );
        }
    };

    let registry = config.build_registry();
    let listings: Vec<AgentListing> = registry
        .configs()
        .values()
        .map(|agent| AgentListing {
            id: agent.id.as_str().to_string(),
            name: agent.name.clone(),
            description: agent.description.clone(),
            color: agent.color.clone(),
            required_scopes: agent.required_scopes.clone(),
            mode: if agent.is_demo() { "demo" } else { "configured" },
        })
        .collect();

    let output = if json_output {
        serde_json::to_string_pretty(&listings)
            .unwrap_or_else(|error| format!("{{\"error\":\"{error}\"}}"))
    } else {
        render_human(&listings)
    };
    crate::commands::CommandResult::ok(output)
}

fn render_human(listings: &[AgentListing]) -> String {
    let mut lines = vec![format!("{} registered agent(s):", listings.len())];
    for agent in listings {
        lines.push(format!(
            "- {} ({}, {}) [{}]: {}",
            agent.name,
            agent.id,
            agent.mode,
            agent.required_scopes.join(", "),
            agent.description,
        ));
    }
    lines.join("\n")
}
