use std::time::Duration;

use async_trait::async_trait;
use courtside_core::access::AccessPolicy;
use courtside_core::errors::ProviderError;
use courtside_core::identity::UserIdentity;
use courtside_core::registry::{AgentConfig, AgentCredential};
use courtside_core::trace::TokenExchangeRecord;

/// Seam to the external identity provider that issues scoped delegated
/// tokens. The engine owns timeouts and record construction; implementations
/// only perform the exchange itself.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn exchange_token(
        &self,
        user_assertion: &str,
        credential: &AgentCredential,
        requested_scopes: &[String],
    ) -> Result<Vec<String>, ProviderError>;
}

#[async_trait]
impl IdentityProvider for Box<dyn IdentityProvider> {
    async fn exchange_token(
        &self,
        user_assertion: &str,
        credential: &AgentCredential,
        requested_scopes: &[String],
    ) -> Result<Vec<String>, ProviderError> {
        (**self).exchange_token(user_assertion, credential, requested_scopes).await
    }
}

/// Provider used when no issuer is configured. Reachable only through a
/// misconfiguration (credentialed agent, no issuer), which config validation
/// rejects; kept as a hard fail-closed backstop.
#[derive(Clone, Debug, Default)]
pub struct UnconfiguredProvider;

#[async_trait]
impl IdentityProvider for UnconfiguredProvider {
    async fn exchange_token(
        &self,
        _user_assertion: &str,
        _credential: &AgentCredential,
        _requested_scopes: &[String],
    ) -> Result<Vec<String>, ProviderError> {
        Err(ProviderError::Exchange("identity provider is not configured".to_string()))
    }
}

/// Performs the per-agent identity-assertion token exchange.
///
/// Access-policy denial is never retried here (same identity, same result),
/// and no retry is performed on provider errors either; retrying is the
/// caller's call.
pub struct TokenExchangeEngine<P> {
    policy: AccessPolicy,
    provider: P,
    provider_timeout_secs: u64,
}

impl<P> TokenExchangeEngine<P>
where
    P: IdentityProvider,
{
    pub fn new(policy: AccessPolicy, provider: P, provider_timeout_secs: u64) -> Self {
        Self { policy, provider, provider_timeout_secs }
    }

    /// Produces exactly one record per call; nothing raises past this method.
    pub async fn exchange(
        &self,
        user: &UserIdentity,
        user_assertion: Option<&str>,
        agent: &AgentConfig,
    ) -> TokenExchangeRecord {
        // No downstream credential: simulate the exchange so the system runs
        // without full identity-provider infrastructure.
        let Some(credential) = &agent.credential else {
            tracing::debug!(
                event_name = "exchange.demo_grant",
                agent = %agent.id,
                "no credential configured, granting demo-mode token"
            );
            return TokenExchangeRecord::granted(
                agent.id,
                agent.name.clone(),
                agent.color.clone(),
                agent.required_scopes.clone(),
                true,
            );
        };

        let grant = self.policy.evaluate(&user.groups, &agent.required_scopes);
        if !grant.is_full() {
            // Fail-closed: a partial grant gates as denial. The grantable
            // subset rides along for diagnostic display.
            tracing::info!(
                event_name = "exchange.denied",
                agent = %agent.id,
                subject = %user.subject,
                grantable = grant.granted.len(),
                required = agent.required_scopes.len(),
                "access policy denied full scope set"
            );
            return TokenExchangeRecord::denied(
                agent.id,
                agent.name.clone(),
                agent.color.clone(),
                grant.granted,
            );
        }

        let Some(assertion) = user_assertion else {
            return TokenExchangeRecord::error(
                agent.id,
                agent.name.clone(),
                agent.color.clone(),
                "no user assertion presented for delegated exchange",
            );
        };

        let exchange = self.provider.exchange_token(assertion, credential, &agent.required_scopes);
        let outcome =
            tokio::time::timeout(Duration::from_secs(self.provider_timeout_secs), exchange)
                .await
                .unwrap_or(Err(ProviderError::Timeout(self.provider_timeout_secs)));

        match outcome {
            Ok(scopes) => {
                // A granted record must carry a non-empty subset of the
                // agent's required scopes. Anything else the provider sends
                // back is clamped out, and an unusable token fails closed.
                let granted = scopes
                    .into_iter()
                    .filter(|scope| agent.required_scopes.contains(scope))
                    .collect::<Vec<_>>();
                if granted.is_empty() {
                    tracing::warn!(
                        event_name = "exchange.unusable_token",
                        agent = %agent.id,
                        subject = %user.subject,
                        "provider token carried none of the required scopes"
                    );
                    return TokenExchangeRecord::error(
                        agent.id,
                        agent.name.clone(),
                        agent.color.clone(),
                        "delegated token carried none of the required scopes",
                    );
                }
                tracing::info!(
                    event_name = "exchange.granted",
                    agent = %agent.id,
                    subject = %user.subject,
                    scopes = granted.len(),
                    "delegated token issued"
                );
                TokenExchangeRecord::granted(
                    agent.id,
                    agent.name.clone(),
                    agent.color.clone(),
                    granted,
                    false,
                )
            }
            Err(error) => {
                tracing::warn!(
                    event_name = "exchange.provider_error",
                    agent = %agent.id,
                    subject = %user.subject,
                    error = %error,
                    "identity provider exchange failed"
                );
                TokenExchangeRecord::error(
                    agent.id,
                    agent.name.clone(),
                    agent.color.clone(),
                    error.to_string(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use courtside_core::access::AccessPolicy;
    use courtside_core::errors::ProviderError;
    use courtside_core::identity::UserIdentity;
    use courtside_core::registry::{demo_agent_configs, AgentCredential, AgentId};
    use courtside_core::trace::ExchangeStatus;

    use super::{IdentityProvider, TokenExchangeEngine, UnconfiguredProvider};

    struct StaticProvider {
        result: Result<Vec<String>, ProviderError>,
    }

    #[async_trait]
    impl IdentityProvider for StaticProvider {
        async fn exchange_token(
            &self,
            _user_assertion: &str,
            _credential: &AgentCredential,
            _requested_scopes: &[String],
        ) -> Result<Vec<String>, ProviderError> {
            self.result.clone()
        }
    }

    struct HangingProvider;

    #[async_trait]
    impl IdentityProvider for HangingProvider {
        async fn exchange_token(
            &self,
            _user_assertion: &str,
            _credential: &AgentCredential,
            _requested_scopes: &[String],
        ) -> Result<Vec<String>, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
    }

    fn agent_config(id: AgentId, credentialed: bool) -> courtside_core::registry::AgentConfig {
        let mut config = demo_agent_configs()
            .into_iter()
            .find(|config| config.id == id)
            .expect("known agent");
        if credentialed {
            config.credential = Some(AgentCredential {
                client_id: "0oa-test-client".to_string(),
                private_key: "pem-material".to_string().into(),
            });
        }
        config
    }

    fn pricing_viewer() -> UserIdentity {
        UserIdentity::new("sub-1", "viewer@example.com", vec!["pricing-viewers".to_string()])
    }

    fn pricing_admin() -> UserIdentity {
        UserIdentity::new("sub-2", "admin@example.com", vec!["ProGear-Pricing".to_string()])
    }

    #[tokio::test]
    async fn credential_free_agent_gets_demo_grant() {
        let engine =
            TokenExchangeEngine::new(AccessPolicy::demo(), UnconfiguredProvider, 5);
        let agent = agent_config(AgentId::Pricing, false);

        let record = engine.exchange(&UserIdentity::anonymous(), None, &agent).await;
        assert_eq!(record.status, ExchangeStatus::Granted);
        assert!(record.demo_mode);
        assert_eq!(record.scopes, agent.required_scopes);
    }

    #[tokio::test]
    async fn partial_grant_is_denied_with_grantable_subset() {
        let engine =
            TokenExchangeEngine::new(AccessPolicy::demo(), UnconfiguredProvider, 5);
        let agent = agent_config(AgentId::Pricing, true);

        let record = engine.exchange(&pricing_viewer(), Some("assertion-jwt"), &agent).await;
        assert_eq!(record.status, ExchangeStatus::Denied);
        assert_eq!(record.scopes, vec!["pricing:read".to_string()]);
        assert!(record.error.is_none());
    }

    #[tokio::test]
    async fn anonymous_caller_is_denied_for_credentialed_agent() {
        let engine =
            TokenExchangeEngine::new(AccessPolicy::demo(), UnconfiguredProvider, 5);
        let agent = agent_config(AgentId::Pricing, true);

        let record = engine.exchange(&UserIdentity::anonymous(), None, &agent).await;
        assert_eq!(record.status, ExchangeStatus::Denied);
        assert!(record.scopes.is_empty());
    }

    #[tokio::test]
    async fn anonymous_rule_authorizes_but_exchange_still_needs_an_assertion() {
        let mut rules = std::collections::BTreeMap::new();
        rules.insert(
            "anonymous".to_string(),
            ["pricing:read", "pricing:margin", "pricing:discount"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        );
        let engine = TokenExchangeEngine::new(AccessPolicy::new(rules), UnconfiguredProvider, 5);
        let agent = agent_config(AgentId::Pricing, true);

        // The rule authorizes the full scope set, so this is not a denial;
        // with no assertion there is still nothing to exchange.
        let record = engine.exchange(&UserIdentity::anonymous(), None, &agent).await;
        assert_eq!(record.status, ExchangeStatus::Error);
        assert_eq!(
            record.error.as_deref(),
            Some("no user assertion presented for delegated exchange")
        );
    }

    #[tokio::test]
    async fn full_grant_uses_provider_scopes() {
        let provider = StaticProvider {
            result: Ok(vec![
                "pricing:read".to_string(),
                "pricing:margin".to_string(),
                "pricing:discount".to_string(),
            ]),
        };
        let engine = TokenExchangeEngine::new(AccessPolicy::demo(), provider, 5);
        let agent = agent_config(AgentId::Pricing, true);

        let record = engine.exchange(&pricing_admin(), Some("assertion-jwt"), &agent).await;
        assert_eq!(record.status, ExchangeStatus::Granted);
        assert!(!record.demo_mode);
        assert_eq!(record.scopes.len(), 3);
    }

    #[tokio::test]
    async fn empty_provider_scope_set_is_finalized_as_error() {
        let provider = StaticProvider { result: Ok(Vec::new()) };
        let engine = TokenExchangeEngine::new(AccessPolicy::demo(), provider, 5);
        let agent = agent_config(AgentId::Pricing, true);

        let record = engine.exchange(&pricing_admin(), Some("assertion-jwt"), &agent).await;
        assert_eq!(record.status, ExchangeStatus::Error);
        assert_eq!(
            record.error.as_deref(),
            Some("delegated token carried none of the required scopes")
        );
        assert!(record.scopes.is_empty());
    }

    #[tokio::test]
    async fn provider_scopes_are_clamped_to_the_required_set() {
        let provider = StaticProvider {
            result: Ok(vec![
                "pricing:read".to_string(),
                "openid".to_string(),
                "inventory:write".to_string(),
            ]),
        };
        let engine = TokenExchangeEngine::new(AccessPolicy::demo(), provider, 5);
        let agent = agent_config(AgentId::Pricing, true);

        let record = engine.exchange(&pricing_admin(), Some("assertion-jwt"), &agent).await;
        assert_eq!(record.status, ExchangeStatus::Granted);
        assert_eq!(record.scopes, vec!["pricing:read".to_string()]);
    }

    #[tokio::test]
    async fn provider_failure_becomes_error_record_with_verbatim_message() {
        let provider = StaticProvider {
            result: Err(ProviderError::Exchange("invalid_grant: audience mismatch".to_string())),
        };
        let engine = TokenExchangeEngine::new(AccessPolicy::demo(), provider, 5);
        let agent = agent_config(AgentId::Pricing, true);

        let record = engine.exchange(&pricing_admin(), Some("assertion-jwt"), &agent).await;
        assert_eq!(record.status, ExchangeStatus::Error);
        assert_eq!(record.error.as_deref(), Some("invalid_grant: audience mismatch"));
    }

    #[tokio::test]
    async fn hung_provider_is_finalized_as_timeout_error() {
        let engine = TokenExchangeEngine::new(AccessPolicy::demo(), HangingProvider, 1);
        let agent = agent_config(AgentId::Pricing, true);

        let record = engine.exchange(&pricing_admin(), Some("assertion-jwt"), &agent).await;
        assert_eq!(record.status, ExchangeStatus::Error);
        assert_eq!(record.error.as_deref(), Some("identity provider timed out after 1s"));
    }
}
