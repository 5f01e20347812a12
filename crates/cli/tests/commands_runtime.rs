use std::env;
use std::sync::{Mutex, OnceLock};

use courtside_cli::commands::{self, agents, ask, config, doctor};
use serde_json::Value;

#[test]
fn ask_routes_pricing_question_through_demo_agents() {
    with_env(&[], || {
        let groups = vec!["ProGear-Sales".to_string()];
        let result = ask::run(
            "What's the price of the Elite Basketball?",
            Some("avery@example.com"),
            &groups,
            None,
            true,
        );
        assert_eq!(result.exit_code, 0, "expected successful ask run");

        let payload = parse_payload(&result.output);
        assert!(payload["content"]
            .as_str()
            .expect("content should be a string")
            .contains("Courtside Pricing Agent"));
        assert!(payload["content"].as_str().unwrap_or_default().contains("$149.99"));

        let exchanges = payload["token_exchanges"].as_array().expect("exchanges array");
        assert_eq!(exchanges.len(), 1);
        assert_eq!(exchanges[0]["status"], "granted");
        assert_eq!(exchanges[0]["demo_mode"], true);
    });
}

#[test]
fn ask_without_matching_keywords_defaults_to_sales() {
    with_env(&[], || {
        let result = ask::run("Tell me something interesting", None, &[], None, true);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["user"]["subject"], "anonymous");
        let exchanges = payload["token_exchanges"].as_array().expect("exchanges array");
        assert_eq!(exchanges.len(), 1);
        assert_eq!(exchanges[0]["agent"], "sales");
    });
}

#[test]
fn ask_returns_config_failure_with_invalid_timeout() {
    with_env(&[("COURTSIDE_IDP_TIMEOUT_SECS", "0")], || {
        let result = ask::run("anything", None, &[], None, false);
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "ask");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
        assert_eq!(payload["exit_code"], u64::from(commands::EXIT_CONFIG));
    });
}

#[test]
fn agents_lists_the_four_demo_agents() {
    with_env(&[], || {
        let result = agents::run(true);
        assert_eq!(result.exit_code, 0);

        let listings: Value = parse_payload(&result.output);
        let entries = listings.as_array().expect("agents array");
        assert_eq!(entries.len(), 4);
        assert!(entries.iter().all(|entry| entry["mode"] == "demo"));
        assert!(entries
            .iter()
            .any(|entry| entry["id"] == "pricing" && entry["color"] == "#f59e0b"));
    });
}

#[test]
fn doctor_passes_with_demo_defaults() {
    with_env(&[], || {
        let output = doctor::run(true);
        let payload = parse_payload(&output);
        assert_eq!(payload["overall_status"], "pass");

        let checks = payload["checks"].as_array().expect("checks array");
        let names: Vec<&str> =
            checks.iter().filter_map(|check| check["name"].as_str()).collect();
        assert_eq!(
            names,
            ["config_validation", "identity_provider_readiness", "agent_registry", "access_rules"]
        );
    });
}

#[test]
fn doctor_reports_config_failures_and_skips_downstream_checks() {
    with_env(&[("COURTSIDE_IDP_TIMEOUT_SECS", "0")], || {
        let output = doctor::run(true);
        let payload = parse_payload(&output);
        assert_eq!(payload["overall_status"], "fail");

        let checks = payload["checks"].as_array().expect("checks array");
        assert_eq!(checks[0]["status"], "fail");
        assert!(checks[1..].iter().all(|check| check["status"] == "skipped"));
    });
}

#[test]
fn config_reports_defaults_with_source_attribution() {
    with_env(&[], || {
        let output = config::run();
        assert!(output.contains("- idp.issuer = <unset> (source: default)"));
        assert!(output.contains("- idp.timeout_secs = 5 (source: default)"));
        assert!(output.contains("- logging.level = info (source: default)"));
    });
}

#[test]
fn config_attributes_env_overrides() {
    with_env(&[("COURTSIDE_LOGGING_LEVEL", "debug")], || {
        let output = config::run();
        assert!(output.contains("- logging.level = debug (source: env (COURTSIDE_LOGGING_LEVEL))"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "COURTSIDE_IDP_ISSUER",
        "COURTSIDE_IDP_AUDIENCE",
        "COURTSIDE_IDP_TIMEOUT_SECS",
        "COURTSIDE_ACTION_TIMEOUT_SECS",
        "COURTSIDE_LOGGING_LEVEL",
        "COURTSIDE_LOGGING_FORMAT",
        "COURTSIDE_LOG_LEVEL",
        "COURTSIDE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
