use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use courtside_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "idp.issuer",
        config.idp.issuer.as_deref().unwrap_or("<unset>"),
        field_source(
            "idp.issuer",
            Some("COURTSIDE_IDP_ISSUER"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "idp.audience",
        config.idp.audience.as_deref().unwrap_or("<unset>"),
        field_source(
            "idp.audience",
            Some("COURTSIDE_IDP_AUDIENCE"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "idp.timeout_secs",
        &config.idp.timeout_secs.to_string(),
        field_source(
            "idp.timeout_secs",
            Some("COURTSIDE_IDP_TIMEOUT_SECS"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "agents.action_timeout_secs",
        &config.agents.action_timeout_secs.to_string(),
        field_source(
            "agents.action_timeout_secs",
            Some("COURTSIDE_ACTION_TIMEOUT_SECS"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    for (agent, credential) in &config.agents.credentials {
        let key_path = format!("agents.{agent}.client_id");
        lines.push(render_line(
            &key_path,
            &credential.client_id,
            field_source(&key_path, None, config_file_doc.as_ref(), config_file_path.as_deref()),
        ));
        let key_path = format!("agents.{agent}.private_key");
        lines.push(render_line(
            &key_path,
            "<redacted>",
            field_source(&key_path, None, config_file_doc.as_ref(), config_file_path.as_deref()),
        ));
    }

    lines.push(render_line(
        "access.rules",
        &format!("{} group rule(s)", config.access.rules.len()),
        field_source(
            "access.rules",
            None,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        field_source(
            "logging.level",
            Some("COURTSIDE_LOGGING_LEVEL"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        field_source(
            "logging.format",
            Some("COURTSIDE_LOGGING_FORMAT"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("courtside.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/courtside.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
