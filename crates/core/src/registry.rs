use std::collections::BTreeMap;
use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of known agents. Dispatch is resolved through this enum and the
/// registry, never through open-ended reflection over free-form tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentId {
    Sales,
    Inventory,
    Customer,
    Pricing,
}

impl AgentId {
    pub const ALL: [AgentId; 4] =
        [AgentId::Sales, AgentId::Inventory, AgentId::Customer, AgentId::Pricing];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Inventory => "inventory",
            Self::Customer => "customer",
            Self::Pricing => "pricing",
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentId {
    type Err = RegistryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sales" => Ok(Self::Sales),
            "inventory" => Ok(Self::Inventory),
            "customer" => Ok(Self::Customer),
            "pricing" => Ok(Self::Pricing),
            other => Err(RegistryError::UnknownAgent(other.to_string())),
        }
    }
}

/// Downstream credential material for a real identity-provider exchange.
/// Absence of a credential puts the agent in demo mode.
#[derive(Clone, Debug)]
pub struct AgentCredential {
    pub client_id: String,
    pub private_key: SecretString,
}

/// Static per-agent configuration. Immutable after load; one instance per
/// agent identifier, owned by the registry for the process lifetime.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub id: AgentId,
    pub name: String,
    pub description: String,
    pub color: String,
    pub required_scopes: Vec<String>,
    pub credential: Option<AgentCredential>,
}

impl AgentConfig {
    pub fn is_demo(&self) -> bool {
        self.credential.is_none()
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown agent: {0}")]
    UnknownAgent(String),
    #[error("agent registry is empty")]
    EmptyRegistry,
}

/// Read-only mapping from agent identifier to configuration, loaded once at
/// process start.
#[derive(Clone, Debug)]
pub struct AgentRegistry {
    configs: BTreeMap<AgentId, AgentConfig>,
}

impl AgentRegistry {
    /// An empty registry is representable but unusable: the router reports it
    /// as a configuration error on the first request.
    pub fn new(configs: BTreeMap<AgentId, AgentConfig>) -> Self {
        Self { configs }
    }

    /// Demo registry mirroring the reference deployment: four agents, no
    /// downstream credentials, so every exchange short-circuits to demo mode.
    pub fn demo() -> Self {
        let configs = demo_agent_configs()
            .into_iter()
            .map(|config| (config.id, config))
            .collect::<BTreeMap<_, _>>();
        Self { configs }
    }

    pub fn configs(&self) -> &BTreeMap<AgentId, AgentConfig> {
        &self.configs
    }

    pub fn get(&self, id: AgentId) -> Result<&AgentConfig, RegistryError> {
        self.configs.get(&id).ok_or_else(|| RegistryError::UnknownAgent(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

pub fn demo_agent_configs() -> Vec<AgentConfig> {
    vec![
        AgentConfig {
            id: AgentId::Sales,
            name: "Courtside Sales Agent".to_string(),
            description: "Orders, quotes, and sales pipeline".to_string(),
            color: "#3b82f6".to_string(),
            required_scopes: scopes(&["sales:read", "sales:quote", "sales:order"]),
            credential: None,
        },
        AgentConfig {
            id: AgentId::Inventory,
            name: "Courtside Inventory Agent".to_string(),
            description: "Stock levels, products, and warehouse".to_string(),
            color: "#10b981".to_string(),
            required_scopes: scopes(&["inventory:read", "inventory:write", "inventory:alert"]),
            credential: None,
        },
        AgentConfig {
            id: AgentId::Customer,
            name: "Courtside Customer Agent".to_string(),
            description: "Accounts, contacts, and purchase history".to_string(),
            color: "#8b5cf6".to_string(),
            required_scopes: scopes(&["customer:read", "customer:lookup", "customer:history"]),
            credential: None,
        },
        AgentConfig {
            id: AgentId::Pricing,
            name: "Courtside Pricing Agent".to_string(),
            description: "Pricing, margins, and discounts".to_string(),
            color: "#f59e0b".to_string(),
            required_scopes: scopes(&["pricing:read", "pricing:margin", "pricing:discount"]),
            credential: None,
        },
    ]
}

fn scopes(values: &[&str]) -> Vec<String> {
    values.iter().map(|scope| (*scope).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{AgentId, AgentRegistry, RegistryError};

    #[test]
    fn demo_registry_covers_all_known_agents() {
        let registry = AgentRegistry::demo();
        assert_eq!(registry.len(), AgentId::ALL.len());
        for id in AgentId::ALL {
            let config = registry.get(id).expect("demo agent configured");
            assert_eq!(config.id, id);
            assert!(config.is_demo());
            assert!(!config.required_scopes.is_empty());
        }
    }

    #[test]
    fn empty_registry_is_representable_but_flagged() {
        let registry = AgentRegistry::new(BTreeMap::new());
        assert!(registry.is_empty());
        assert_eq!(
            registry.get(AgentId::Sales).err(),
            Some(RegistryError::UnknownAgent("sales".to_string()))
        );
    }

    #[test]
    fn agent_id_parses_case_insensitively() {
        assert_eq!("Pricing".parse::<AgentId>().ok(), Some(AgentId::Pricing));
        assert!(matches!(
            "shipping".parse::<AgentId>(),
            Err(RegistryError::UnknownAgent(name)) if name == "shipping"
        ));
    }
}
