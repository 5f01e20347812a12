use courtside_core::errors::RoutingFailure;
use courtside_core::registry::{AgentId, AgentRegistry, RegistryError};

/// Externally supplied classification signal: which agent domains a request
/// plausibly touches. Could be keyword matching or a model call; the default
/// implementation is deterministic keyword matching.
pub trait IntentClassifier {
    fn classify(&self, message: &str) -> Vec<AgentId>;
}

/// Deterministic keyword classifier. The LLM-free default: it never decides
/// authorization, only which domains a message mentions.
#[derive(Clone, Debug, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }
}

const SALES_KEYWORDS: &[&str] =
    &["order", "orders", "quote", "quotes", "buy", "purchase", "sale", "sales", "pipeline", "ship"];

const INVENTORY_KEYWORDS: &[&str] = &[
    "inventory",
    "stock",
    "warehouse",
    "units",
    "reorder",
    "restock",
    "availability",
    "available",
    "in stock",
    "low stock",
];

const CUSTOMER_KEYWORDS: &[&str] =
    &["customer", "customers", "account", "accounts", "client", "tier", "contact", "history"];

const PRICING_KEYWORDS: &[&str] = &[
    "price",
    "prices",
    "pricing",
    "cost",
    "costs",
    "margin",
    "margins",
    "discount",
    "discounts",
    "how much",
];

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, message: &str) -> Vec<AgentId> {
        let normalized = message.to_ascii_lowercase();
        let mut matches = Vec::new();

        // Declaration order doubles as confidence order and is preserved
        // through exchange and execution.
        for (agent, keywords) in [
            (AgentId::Sales, SALES_KEYWORDS),
            (AgentId::Inventory, INVENTORY_KEYWORDS),
            (AgentId::Customer, CUSTOMER_KEYWORDS),
            (AgentId::Pricing, PRICING_KEYWORDS),
        ] {
            if keywords.iter().any(|keyword| normalized.contains(keyword)) {
                matches.push(agent);
            }
        }

        matches
    }
}

/// Selects the ordered list of agents that should participate in a request.
#[derive(Clone, Debug, Default)]
pub struct Router<C = KeywordClassifier> {
    classifier: C,
}

impl Router<KeywordClassifier> {
    pub fn new() -> Self {
        Self { classifier: KeywordClassifier }
    }
}

impl<C> Router<C>
where
    C: IntentClassifier,
{
    pub fn with_classifier(classifier: C) -> Self {
        Self { classifier }
    }

    /// Returns the ordered agents whose domain the message touches, filtered
    /// to agents actually present in the registry. If nothing matches, the
    /// request still gets handled: the sales agent is the default.
    pub fn route(
        &self,
        message: &str,
        registry: &AgentRegistry,
    ) -> Result<Vec<AgentId>, RoutingFailure> {
        if registry.is_empty() {
            return Err(RoutingFailure::Registry(RegistryError::EmptyRegistry));
        }

        let selected = self
            .classifier
            .classify(message)
            .into_iter()
            .filter(|agent| registry.configs().contains_key(agent))
            .collect::<Vec<_>>();

        if !selected.is_empty() {
            return Ok(selected);
        }

        if registry.configs().contains_key(&AgentId::Sales) {
            return Ok(vec![AgentId::Sales]);
        }

        // Registry without a sales agent: fall back to its first configured
        // agent so every request is handled by at least one.
        let first = *registry
            .configs()
            .keys()
            .next()
            .ok_or(RoutingFailure::Registry(RegistryError::EmptyRegistry))?;
        Ok(vec![first])
    }
}

#[cfg(test)]
mod tests {
    use courtside_core::registry::{AgentId, AgentRegistry};

    use super::{IntentClassifier, KeywordClassifier, Router};

    #[test]
    fn pricing_question_routes_to_pricing_only() {
        let router = Router::new();
        let registry = AgentRegistry::demo();
        let agents = router
            .route("What's the price of the Elite Basketball?", &registry)
            .expect("routing succeeds");
        assert_eq!(agents, vec![AgentId::Pricing]);
    }

    #[test]
    fn multi_domain_message_preserves_declaration_order() {
        let router = Router::new();
        let registry = AgentRegistry::demo();
        let agents = router
            .route("Check stock levels and the discount for Metro High School", &registry)
            .expect("routing succeeds");
        assert_eq!(agents, vec![AgentId::Inventory, AgentId::Pricing]);
    }

    #[test]
    fn unmatched_message_defaults_to_sales() {
        let router = Router::new();
        let registry = AgentRegistry::demo();
        let agents = router.route("hello there", &registry).expect("routing succeeds");
        assert_eq!(agents, vec![AgentId::Sales]);
    }

    #[test]
    fn classifier_is_case_insensitive() {
        let classifier = KeywordClassifier::new();
        let agents = classifier.classify("SHOW ME LOW STOCK ALERTS");
        assert_eq!(agents, vec![AgentId::Inventory]);
    }

    #[test]
    fn customer_and_sales_terms_route_to_both() {
        let classifier = KeywordClassifier::new();
        let agents = classifier.classify("open orders for customer State University");
        assert_eq!(agents, vec![AgentId::Sales, AgentId::Customer]);
    }
}
