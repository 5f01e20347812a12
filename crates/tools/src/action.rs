//! Bridges the orchestrator's action seam to the demo tool functions. Each
//! dispatch checks the delegated scopes before touching the store, so an
//! agent holding a narrowed grant can only perform the work those scopes
//! actually cover.

use async_trait::async_trait;
use tracing::debug;

use courtside_agent::AgentAction;
use courtside_core::errors::ActionError;
use courtside_core::registry::AgentId;

use crate::store::DemoStore;
use crate::{customer, inventory, pricing, sales};

#[derive(Clone, Debug, Default)]
pub struct DomainAgentAction {
    store: DemoStore,
}

impl DomainAgentAction {
    pub fn new(store: DemoStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &DemoStore {
        &self.store
    }
}

fn require_scope(granted: &[String], scope: &str) -> Result<(), ActionError> {
    if granted.iter().any(|held| held == scope) {
        Ok(())
    } else {
        Err(ActionError::Failed(format!(
            "the delegated token does not carry the {scope} scope"
        )))
    }
}

// Quantities and dollar amounts are clamped so downstream cent math cannot
// overflow on an absurd request.
const MAX_PARSED_NUMBER: i64 = 1_000_000_000;

fn first_number(message: &str) -> Option<i64> {
    message
        .split(|ch: char| !ch.is_ascii_digit())
        .find(|chunk| !chunk.is_empty())
        .and_then(|chunk| chunk.parse().ok())
        .map(|value: i64| value.min(MAX_PARSED_NUMBER))
}

fn mentioned_tier(message: &str) -> Option<&'static str> {
    let normalized = message.to_ascii_lowercase();
    ["Platinum", "Gold", "Silver", "Bronze"]
        .into_iter()
        .find(|tier| normalized.contains(&tier.to_ascii_lowercase()))
}

#[async_trait]
impl AgentAction for DomainAgentAction {
    async fn invoke(
        &self,
        agent: AgentId,
        granted_scopes: &[String],
        message: &str,
    ) -> Result<String, ActionError> {
        debug!(
            event_name = "tools.dispatch",
            agent = agent.as_str(),
            scopes = granted_scopes.len(),
            "dispatching agent action"
        );
        match agent {
            AgentId::Inventory => self.inventory(granted_scopes, message),
            AgentId::Pricing => self.pricing(granted_scopes, message),
            AgentId::Customer => self.customer(granted_scopes, message),
            AgentId::Sales => self.sales(granted_scopes, message),
        }
    }
}

impl DomainAgentAction {
    fn inventory(&self, granted: &[String], message: &str) -> Result<String, ActionError> {
        let normalized = message.to_ascii_lowercase();
        if normalized.contains("low stock") || normalized.contains("reorder") {
            require_scope(granted, "inventory:alert")?;
            return Ok(inventory::low_stock_report(&self.store));
        }
        if normalized.contains("restock") || normalized.contains("add ") || normalized.contains("remove ") {
            require_scope(granted, "inventory:write")?;
            if let (Some(product), Some(amount)) =
                (self.store.best_product_match(message), first_number(message))
            {
                let delta = if normalized.contains("remove ") { -amount } else { amount };
                return Ok(inventory::adjustment_report(&self.store, &product.name, delta));
            }
        }
        require_scope(granted, "inventory:read")?;
        if let Some(product) = self.store.best_product_match(message) {
            return Ok(inventory::stock_report(&self.store, &product.name));
        }
        if normalized.contains("search") {
            return Ok(inventory::search_report(&self.store, message.trim()));
        }
        Ok(inventory::summary_report(&self.store))
    }

    fn pricing(&self, granted: &[String], message: &str) -> Result<String, ActionError> {
        let normalized = message.to_ascii_lowercase();
        if normalized.contains("discount") {
            require_scope(granted, "pricing:discount")?;
            let tier = mentioned_tier(message)
                .or_else(|| {
                    self.store
                        .best_customer_match(message)
                        .map(|account| match account.tier.as_str() {
                            "Platinum" => "Platinum",
                            "Gold" => "Gold",
                            "Silver" => "Silver",
                            _ => "Bronze",
                        })
                })
                .unwrap_or("Bronze");
            let quantity = first_number(message).unwrap_or(1);
            return Ok(pricing::discount_report(&self.store, tier, quantity));
        }
        if normalized.contains("set") && normalized.contains("price") {
            require_scope(granted, "pricing:margin")?;
            if let (Some(product), Some(dollars)) =
                (self.store.best_product_match(message), first_number(message))
            {
                return Ok(pricing::price_change_report(
                    &self.store,
                    &product.name,
                    dollars.saturating_mul(100),
                ));
            }
        }
        if normalized.contains("margin") {
            require_scope(granted, "pricing:margin")?;
            return Ok(pricing::summary_report(&self.store));
        }
        require_scope(granted, "pricing:read")?;
        if let Some(product) = self.store.best_product_match(message) {
            return Ok(pricing::price_report(&self.store, &product.name));
        }
        for category in ["basketballs", "hoops", "uniforms", "training", "court"] {
            if normalized.contains(category) {
                return Ok(pricing::category_report(&self.store, category));
            }
        }
        Ok(pricing::summary_report(&self.store))
    }

    fn customer(&self, granted: &[String], message: &str) -> Result<String, ActionError> {
        let normalized = message.to_ascii_lowercase();
        if normalized.contains("history") || normalized.contains("past orders") {
            require_scope(granted, "customer:history")?;
            if let Some(account) = self.store.best_customer_match(message) {
                return Ok(customer::history_report(&self.store, &account.name));
            }
        }
        if let Some(tier) = mentioned_tier(message) {
            require_scope(granted, "customer:read")?;
            return Ok(customer::tier_report(&self.store, tier));
        }
        require_scope(granted, "customer:lookup")?;
        if normalized.contains("search") {
            return Ok(customer::search_report(&self.store, message.trim()));
        }
        if let Some(account) = self.store.best_customer_match(message) {
            return Ok(customer::lookup_report(&self.store, &account.name));
        }
        Ok(customer::summary_report(&self.store))
    }

    fn sales(&self, granted: &[String], message: &str) -> Result<String, ActionError> {
        let normalized = message.to_ascii_lowercase();
        if normalized.contains("quote") {
            require_scope(granted, "sales:quote")?;
            if let Some(product) = self.store.best_product_match(message) {
                let account = self.store.best_customer_match(message);
                let quantity = first_number(message).unwrap_or(1);
                return Ok(sales::quote_report(
                    &self.store,
                    &product.name,
                    account.as_ref().map(|record| record.name.as_str()),
                    quantity,
                ));
            }
            return Ok("I need a product name to prepare a quote.".to_string());
        }
        if normalized.contains("order") {
            require_scope(granted, "sales:order")?;
            if let Some(account) = self.store.best_customer_match(message) {
                return Ok(sales::order_status_report(&self.store, &account.name));
            }
            return Ok(sales::orders_report(&self.store));
        }
        require_scope(granted, "sales:read")?;
        Ok(sales::summary_report(&self.store))
    }
}

#[cfg(test)]
mod tests {
    use super::DomainAgentAction;
    use courtside_agent::AgentAction;
    use courtside_core::errors::ActionError;
    use courtside_core::registry::AgentId;

    fn scopes(names: &[&str]) -> Vec<String> {
        names.iter().map(|scope| scope.to_string()).collect()
    }

    #[tokio::test]
    async fn absurd_quote_quantity_is_clamped_instead_of_overflowing() {
        let action = DomainAgentAction::default();
        let reply = action
            .invoke(
                AgentId::Sales,
                &scopes(&["sales:quote"]),
                "Quote 9223372036854775807 Elite Basketballs for State University",
            )
            .await
            .expect("quote with a huge quantity");
        assert!(reply.contains("Quote:"));
        assert!(reply.contains(&super::MAX_PARSED_NUMBER.to_string()));
    }

    #[tokio::test]
    async fn inventory_read_answers_stock_questions() {
        let action = DomainAgentAction::default();
        let reply = action
            .invoke(
                AgentId::Inventory,
                &scopes(&["inventory:read"]),
                "How many Elite Basketballs do we have?",
            )
            .await
            .expect("inventory read");
        assert!(reply.contains("2847"));
    }

    #[tokio::test]
    async fn write_without_write_scope_is_refused() {
        let action = DomainAgentAction::default();
        let result = action
            .invoke(
                AgentId::Inventory,
                &scopes(&["inventory:read"]),
                "Please remove 50 Elite Basketball units",
            )
            .await;
        match result {
            Err(ActionError::Failed(message)) => assert!(message.contains("inventory:write")),
            other => panic!("expected a scope refusal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn pricing_read_scope_covers_flagship_price_question() {
        let action = DomainAgentAction::default();
        let reply = action
            .invoke(
                AgentId::Pricing,
                &scopes(&["pricing:read"]),
                "What's the price of the Elite Basketball?",
            )
            .await
            .expect("pricing read");
        assert!(reply.contains("$149.99"));
    }

    #[tokio::test]
    async fn discount_question_needs_discount_scope() {
        let action = DomainAgentAction::default();
        let result = action
            .invoke(
                AgentId::Pricing,
                &scopes(&["pricing:read"]),
                "What discount does a Platinum customer get on 100 units?",
            )
            .await;
        assert!(matches!(result, Err(ActionError::Failed(_))));

        let reply = action
            .invoke(
                AgentId::Pricing,
                &scopes(&["pricing:read", "pricing:discount"]),
                "What discount does a Platinum customer get on 100 units?",
            )
            .await
            .expect("discount scope held");
        assert!(reply.contains("20% total"));
    }

    #[tokio::test]
    async fn price_update_needs_margin_scope() {
        let action = DomainAgentAction::default();
        let message = "Set the price of the Team Shorts to 55";
        let result =
            action.invoke(AgentId::Pricing, &scopes(&["pricing:read"]), message).await;
        assert!(matches!(result, Err(ActionError::Failed(_))));

        let reply = action
            .invoke(AgentId::Pricing, &scopes(&["pricing:read", "pricing:margin"]), message)
            .await
            .expect("margin scope held");
        assert!(reply.contains("$49.99 -> $55.00"));
    }

    #[tokio::test]
    async fn sales_quote_blends_product_and_account() {
        let action = DomainAgentAction::default();
        let reply = action
            .invoke(
                AgentId::Sales,
                &scopes(&["sales:read", "sales:quote"]),
                "Quote 100 Elite Basketballs for State University Athletics",
            )
            .await
            .expect("sales quote");
        assert!(reply.contains("Prepared for State University Athletics"));
    }

    #[tokio::test]
    async fn customer_lookup_finds_partial_names() {
        let action = DomainAgentAction::default();
        let reply = action
            .invoke(
                AgentId::Customer,
                &scopes(&["customer:read", "customer:lookup"]),
                "Who is the contact at Riverside?",
            )
            .await
            .expect("customer lookup");
        assert!(reply.contains("League Director Chen"));
    }
}
