use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// The subset of an agent's required scopes a user's groups entitle them to.
///
/// `full` is true only when every required scope was granted. A partial grant
/// is reported for diagnostics but gates as an overall denial: an agent given
/// only some of its required scopes must not be invoked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeGrant {
    pub granted: Vec<String>,
    pub full: bool,
}

impl ScopeGrant {
    pub fn is_full(&self) -> bool {
        self.full
    }
}

/// Group-to-scope rules injected from configuration. The evaluator hardcodes
/// no policy: a scope is granted iff at least one rule authorizes it for one
/// of the caller's groups.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    rules: BTreeMap<String, BTreeSet<String>>,
}

impl AccessPolicy {
    pub fn new(rules: BTreeMap<String, BTreeSet<String>>) -> Self {
        Self { rules }
    }

    /// Demo rule table mirroring the reference deployment's directory groups.
    pub fn demo() -> Self {
        let mut rules = BTreeMap::new();
        grant(&mut rules, "ProGear-Sales", &[
            "sales:read",
            "sales:quote",
            "sales:order",
            "inventory:read",
            "customer:read",
            "customer:lookup",
            "customer:history",
            "pricing:read",
        ]);
        grant(&mut rules, "ProGear-Warehouse", &[
            "inventory:read",
            "inventory:write",
            "inventory:alert",
        ]);
        grant(&mut rules, "ProGear-Pricing", &[
            "pricing:read",
            "pricing:margin",
            "pricing:discount",
        ]);
        grant(&mut rules, "pricing-viewers", &["pricing:read"]);
        grant(&mut rules, "inventory-viewers", &["inventory:read"]);
        Self { rules }
    }

    pub fn rules(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.rules
    }

    /// Pure evaluation of (user groups, required scopes) to a grant.
    /// Deterministic, no I/O: identical inputs always yield identical grants.
    pub fn evaluate(&self, groups: &BTreeSet<String>, required_scopes: &[String]) -> ScopeGrant {
        let granted = required_scopes
            .iter()
            .filter(|scope| self.scope_authorized(groups, scope))
            .cloned()
            .collect::<Vec<_>>();
        let full = granted.len() == required_scopes.len() && !required_scopes.is_empty();
        ScopeGrant { granted, full }
    }

    fn scope_authorized(&self, groups: &BTreeSet<String>, scope: &str) -> bool {
        groups.iter().any(|group| {
            self.rules.get(group).map(|scopes| scopes.contains(scope)).unwrap_or(false)
        })
    }
}

fn grant(rules: &mut BTreeMap<String, BTreeSet<String>>, group: &str, scopes: &[&str]) {
    rules
        .entry(group.to_string())
        .or_default()
        .extend(scopes.iter().map(|scope| (*scope).to_string()));
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::AccessPolicy;

    fn groups(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| (*name).to_string()).collect()
    }

    fn required(scopes: &[&str]) -> Vec<String> {
        scopes.iter().map(|scope| (*scope).to_string()).collect()
    }

    #[test]
    fn full_grant_requires_every_scope() {
        let policy = AccessPolicy::demo();
        let grant = policy.evaluate(
            &groups(&["ProGear-Pricing"]),
            &required(&["pricing:read", "pricing:margin", "pricing:discount"]),
        );
        assert!(grant.is_full());
        assert_eq!(grant.granted.len(), 3);
    }

    #[test]
    fn partial_grant_is_not_full() {
        let policy = AccessPolicy::demo();
        let grant = policy.evaluate(
            &groups(&["pricing-viewers"]),
            &required(&["pricing:read", "pricing:margin"]),
        );
        assert!(!grant.is_full());
        assert_eq!(grant.granted, vec!["pricing:read".to_string()]);
    }

    #[test]
    fn anonymous_groups_grant_nothing() {
        let policy = AccessPolicy::demo();
        let grant = policy.evaluate(&BTreeSet::new(), &required(&["sales:read"]));
        assert!(!grant.is_full());
        assert!(grant.granted.is_empty());
    }

    #[test]
    fn rule_naming_the_anonymous_group_matches_the_sentinel() {
        let mut rules = std::collections::BTreeMap::new();
        rules.insert("anonymous".to_string(), groups(&["pricing:read"]));
        let policy = AccessPolicy::new(rules);

        let identity = crate::identity::UserIdentity::anonymous();
        let grant = policy.evaluate(&identity.groups, &required(&["pricing:read"]));
        assert!(grant.is_full());
    }

    #[test]
    fn empty_required_set_never_counts_as_full() {
        let policy = AccessPolicy::demo();
        let grant = policy.evaluate(&groups(&["ProGear-Sales"]), &[]);
        assert!(!grant.is_full());
    }

    #[test]
    fn evaluation_is_idempotent() {
        let policy = AccessPolicy::demo();
        let user_groups = groups(&["ProGear-Sales", "pricing-viewers"]);
        let scopes = required(&["pricing:read", "pricing:margin", "sales:read"]);
        let first = policy.evaluate(&user_groups, &scopes);
        let second = policy.evaluate(&user_groups, &scopes);
        assert_eq!(first, second);
    }
}
