use courtside_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_identity_provider(&config));
            checks.push(check_agent_registry(&config));
            checks.push(check_access_rules(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["identity_provider_readiness", "agent_registry", "access_rules"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_identity_provider(config: &AppConfig) -> DoctorCheck {
    let credentialed = config.agents.credentials.len();
    match (&config.idp.issuer, credentialed) {
        (Some(issuer), _) => DoctorCheck {
            name: "identity_provider_readiness",
            status: CheckStatus::Pass,
            details: format!("token endpoint configured at `{issuer}/v1/token`"),
        },
        (None, 0) => DoctorCheck {
            name: "identity_provider_readiness",
            status: CheckStatus::Pass,
            details: "no issuer configured; all agents run in demo mode".to_string(),
        },
        // Unreachable after validation, but doctor reports rather than assumes.
        (None, count) => DoctorCheck {
            name: "identity_provider_readiness",
            status: CheckStatus::Fail,
            details: format!("{count} agent credential(s) configured without an issuer"),
        },
    }
}

fn check_agent_registry(config: &AppConfig) -> DoctorCheck {
    let registry = config.build_registry();
    if registry.is_empty() {
        return DoctorCheck {
            name: "agent_registry",
            status: CheckStatus::Fail,
            details: "no agents registered".to_string(),
        };
    }
    let demo = registry.configs().values().filter(|agent| agent.is_demo()).count();
    DoctorCheck {
        name: "agent_registry",
        status: CheckStatus::Pass,
        details: format!(
            "{} agent(s) registered ({} demo, {} credentialed)",
            registry.len(),
            demo,
            registry.len() - demo,
        ),
    }
}

fn check_access_rules(config: &AppConfig) -> DoctorCheck {
    if config.access.rules.is_empty() {
        return DoctorCheck {
            name: "access_rules",
            status: CheckStatus::Fail,
            details: "no group rules configured; every exchange would be denied".to_string(),
        };
    }
    let scopes: usize = config.access.rules.values().map(|scopes| scopes.len()).sum();
    DoctorCheck {
        name: "access_rules",
        status: CheckStatus::Pass,
        details: format!(
            "{} group rule(s) covering {} scope grant(s)",
            config.access.rules.len(),
            scopes,
        ),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
