//! Rule registry
//!
//! Provides [`RuleSet`], mapping each domain to its [`TransitionRules`].

use crate::organisation::OrganisationRules;
use crate::rbac::RbacRules;
use crate::retention::RetentionRules;
use crate::rules::TransitionRules;
use cfg_snapshot::ConfigDomain;
use std::collections::HashMap;
use std::sync::Arc;

/// Rules per domain
///
/// Rules are shared trait objects so a console can hold its domain's rules
/// without borrowing the set.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: HashMap<ConfigDomain, Arc<dyn TransitionRules>>,
}

impl RuleSet {
    /// Create empty rule set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Rule set with the built-in rules for every domain
    #[must_use]
    pub fn standard() -> Self {
        let mut set = Self::new();
        set.register(Arc::new(OrganisationRules::new()));
        set.register(Arc::new(RbacRules::new()));
        set.register(Arc::new(RetentionRules::new()));
        set
    }

    /// Register rules, replacing any previous rules for the same domain
    pub fn register(&mut self, rules: Arc<dyn TransitionRules>) -> Option<Arc<dyn TransitionRules>> {
        self.rules.insert(rules.domain(), rules)
    }

    /// Rules for a domain
    #[inline]
    #[must_use]
    pub fn get(&self, domain: ConfigDomain) -> Option<Arc<dyn TransitionRules>> {
        self.rules.get(&domain).cloned()
    }

    /// Whether a domain has rules
    #[inline]
    #[must_use]
    pub fn contains(&self, domain: ConfigDomain) -> bool {
        self.rules.contains_key(&domain)
    }

    /// Number of registered domains
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if set is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Built-in rules for one domain
#[must_use]
pub fn standard_rules(domain: ConfigDomain) -> Arc<dyn TransitionRules> {
    match domain {
        ConfigDomain::Organisation => Arc::new(OrganisationRules::new()),
        ConfigDomain::Rbac => Arc::new(RbacRules::new()),
        ConfigDomain::Retention => Arc::new(RetentionRules::new()),
    }
}
