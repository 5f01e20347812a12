use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The sentinel subject used when no assertion was presented or validation failed.
pub const ANONYMOUS_SUBJECT: &str = "anonymous";

/// Identity extracted from a validated user assertion.
///
/// Created once per incoming request and never mutated. Group names drive
/// scope evaluation; an anonymous caller carries only the `anonymous` group,
/// so every credentialed agent denies it unless a rule explicitly names that
/// group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub subject: String,
    pub email: String,
    pub groups: BTreeSet<String>,
}

impl UserIdentity {
    pub fn new(
        subject: impl Into<String>,
        email: impl Into<String>,
        groups: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            email: email.into(),
            groups: groups.into_iter().collect(),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            subject: ANONYMOUS_SUBJECT.to_string(),
            email: ANONYMOUS_SUBJECT.to_string(),
            groups: BTreeSet::from([ANONYMOUS_SUBJECT.to_string()]),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.subject == ANONYMOUS_SUBJECT
    }
}

#[cfg(test)]
mod tests {
    use super::UserIdentity;

    #[test]
    fn anonymous_identity_carries_only_the_anonymous_group() {
        let identity = UserIdentity::anonymous();
        assert!(identity.is_anonymous());
        assert_eq!(identity.groups.len(), 1);
        assert!(identity.groups.contains(super::ANONYMOUS_SUBJECT));
    }

    #[test]
    fn asserted_identity_deduplicates_groups() {
        let identity = UserIdentity::new(
            "00u8xdeptoh4cK9pG0g7",
            "sarah.sales@example.com",
            vec!["ProGear-Sales".to_string(), "ProGear-Sales".to_string()],
        );
        assert!(!identity.is_anonymous());
        assert_eq!(identity.groups.len(), 1);
    }
}
