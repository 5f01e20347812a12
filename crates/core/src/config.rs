use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::access::AccessPolicy;
use crate::registry::{demo_agent_configs, AgentCredential, AgentId, AgentRegistry};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub idp: IdpConfig,
    pub agents: AgentsConfig,
    pub access: AccessConfig,
    pub logging: LoggingConfig,
}

/// Identity-provider parameters for the real delegated-token exchange.
/// `issuer` may be absent: agents without credentials run in demo mode and
/// never contact a provider.
#[derive(Clone, Debug)]
pub struct IdpConfig {
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AgentsConfig {
    pub action_timeout_secs: u64,
    pub credentials: BTreeMap<AgentId, CredentialConfig>,
}

#[derive(Clone, Debug)]
pub struct CredentialConfig {
    pub client_id: String,
    pub private_key: SecretString,
}

#[derive(Clone, Debug)]
pub struct AccessConfig {
    pub rules: BTreeMap<String, BTreeSet<String>>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub idp_issuer: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            idp: IdpConfig { issuer: None, audience: None, timeout_secs: 5 },
            agents: AgentsConfig { action_timeout_secs: 10, credentials: BTreeMap::new() },
            access: AccessConfig { rules: AccessPolicy::demo().rules().clone() },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("courtside.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Access policy built from the configured group-to-scope rules.
    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy::new(self.access.rules.clone())
    }

    /// Registry of the known agents with credentials attached from config.
    /// Agents with no configured credential stay in demo mode.
    pub fn build_registry(&self) -> AgentRegistry {
        let configs = demo_agent_configs()
            .into_iter()
            .map(|mut config| {
                if let Some(credential) = self.agents.credentials.get(&config.id) {
                    config.credential = Some(AgentCredential {
                        client_id: credential.client_id.clone(),
                        private_key: credential.private_key.clone(),
                    });
                }
                (config.id, config)
            })
            .collect();
        AgentRegistry::new(configs)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(idp) = patch.idp {
            if let Some(issuer) = idp.issuer {
                self.idp.issuer = Some(issuer);
            }
            if let Some(audience) = idp.audience {
                self.idp.audience = Some(audience);
            }
            if let Some(timeout_secs) = idp.timeout_secs {
                self.idp.timeout_secs = timeout_secs;
            }
        }

        if let Some(agents) = patch.agents {
            if let Some(action_timeout_secs) = agents.action_timeout_secs {
                self.agents.action_timeout_secs = action_timeout_secs;
            }
            for (agent_id, credential) in agents.credentials {
                self.agents.credentials.insert(
                    agent_id,
                    CredentialConfig {
                        client_id: credential.client_id,
                        private_key: credential.private_key.into(),
                    },
                );
            }
        }

        if let Some(access) = patch.access {
            if let Some(rules) = access.rules {
                self.access.rules = rules;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("COURTSIDE_IDP_ISSUER") {
            self.idp.issuer = Some(value);
        }
        if let Some(value) = read_env("COURTSIDE_IDP_AUDIENCE") {
            self.idp.audience = Some(value);
        }
        if let Some(value) = read_env("COURTSIDE_IDP_TIMEOUT_SECS") {
            self.idp.timeout_secs = parse_u64("COURTSIDE_IDP_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("COURTSIDE_ACTION_TIMEOUT_SECS") {
            self.agents.action_timeout_secs = parse_u64("COURTSIDE_ACTION_TIMEOUT_SECS", &value)?;
        }

        let log_level =
            read_env("COURTSIDE_LOGGING_LEVEL").or_else(|| read_env("COURTSIDE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("COURTSIDE_LOGGING_FORMAT").or_else(|| read_env("COURTSIDE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(idp_issuer) = overrides.idp_issuer {
            self.idp.issuer = Some(idp_issuer);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_idp(&self.idp, &self.agents)?;
        validate_agents(&self.agents)?;
        validate_access(&self.access)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("courtside.toml"), PathBuf::from("config/courtside.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_idp(idp: &IdpConfig, agents: &AgentsConfig) -> Result<(), ConfigError> {
    if idp.timeout_secs == 0 || idp.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "idp.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !agents.credentials.is_empty() {
        let issuer = idp.issuer.as_deref().map(str::trim).unwrap_or_default();
        if issuer.is_empty() {
            return Err(ConfigError::Validation(
                "idp.issuer is required when any agent credential is configured".to_string(),
            ));
        }
        if !issuer.starts_with("https://") {
            return Err(ConfigError::Validation("idp.issuer must be an https URL".to_string()));
        }
    }

    Ok(())
}

fn validate_agents(agents: &AgentsConfig) -> Result<(), ConfigError> {
    if agents.action_timeout_secs == 0 || agents.action_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "agents.action_timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    for (agent_id, credential) in &agents.credentials {
        if credential.client_id.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "agents.{agent_id}.client_id must not be empty"
            )));
        }
        if credential.private_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "agents.{agent_id}.private_key must not be empty"
            )));
        }
    }

    Ok(())
}

fn validate_access(access: &AccessConfig) -> Result<(), ConfigError> {
    for (group, scopes) in &access.rules {
        if group.trim().is_empty() {
            return Err(ConfigError::Validation(
                "access.rules contains an empty group name".to_string(),
            ));
        }
        for scope in scopes {
            if !scope.contains(':') {
                return Err(ConfigError::Validation(format!(
                    "access rule for `{group}` has malformed scope `{scope}` (expected `domain:action`)"
                )));
            }
        }
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    idp: Option<IdpPatch>,
    agents: Option<AgentsPatch>,
    access: Option<AccessPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct IdpPatch {
    issuer: Option<String>,
    audience: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentsPatch {
    action_timeout_secs: Option<u64>,
    #[serde(flatten)]
    credentials: BTreeMap<AgentId, CredentialPatch>,
}

#[derive(Debug, Deserialize)]
struct CredentialPatch {
    client_id: String,
    private_key: String,
}

#[derive(Debug, Default, Deserialize)]
struct AccessPatch {
    rules: Option<BTreeMap<String, BTreeSet<String>>>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
