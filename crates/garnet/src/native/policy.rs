//! Capability policy for native type access

use std::sync::Arc;

use dashmap::DashMap;

use crate::config::{AccessMode, MachineConfig};

/// Decides which host types and members scripts may reach.
///
/// Consulted before a native type becomes reachable and before each member
/// dispatch. A `false` answer makes the evaluator raise `TypeAccessError`.
pub trait TypeAccessPolicy: Send + Sync {
    /// Whether the qualified type name may be reached.
    fn is_type_allowed(&self, type_name: &str) -> bool;

    /// Whether a member of an allowed type may be invoked.
    fn is_member_allowed(&self, type_name: &str, _member: &str) -> bool {
        self.is_type_allowed(type_name)
    }
}

/// Every registered type is reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl TypeAccessPolicy for AllowAll {
    fn is_type_allowed(&self, _type_name: &str) -> bool {
        true
    }
}

/// No native type is reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl TypeAccessPolicy for DenyAll {
    fn is_type_allowed(&self, _type_name: &str) -> bool {
        false
    }
}

/// Allows types whose qualified name equals an entry or lies under it
/// (`Host::Text` allows `Host::Text::Builder`). Decisions are cached.
#[derive(Debug, Default)]
pub struct AllowListPolicy {
    prefixes: Vec<String>,
    cache: DashMap<String, bool>,
}

impl AllowListPolicy {
    /// Build from qualified-name prefixes.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
            cache: DashMap::new(),
        }
    }

    fn matches(&self, type_name: &str) -> bool {
        self.prefixes.iter().any(|prefix| {
            type_name == prefix
                || type_name
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with("::"))
        })
    }
}

impl TypeAccessPolicy for AllowListPolicy {
    fn is_type_allowed(&self, type_name: &str) -> bool {
        if let Some(hit) = self.cache.get(type_name) {
            return *hit;
        }
        let allowed = self.matches(type_name);
        self.cache.insert(type_name.to_string(), allowed);
        allowed
    }
}

/// The policy a configuration asks for.
pub fn policy_for(config: &MachineConfig) -> Arc<dyn TypeAccessPolicy> {
    match config.access_mode {
        AccessMode::AllowAll => Arc::new(AllowAll),
        AccessMode::DenyAll => Arc::new(DenyAll),
        AccessMode::AllowList => Arc::new(AllowListPolicy::new(config.allowed_types.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list_prefix_matching() {
        let policy = AllowListPolicy::new(["Host::Text"]);
        assert!(policy.is_type_allowed("Host::Text"));
        assert!(policy.is_type_allowed("Host::Text::Builder"));
        assert!(!policy.is_type_allowed("Host::TextReader"));
        assert!(!policy.is_type_allowed("Host::IO::File"));
    }

    #[test]
    fn test_allow_list_caches_decisions() {
        let policy = AllowListPolicy::new(["A"]);
        assert!(policy.is_type_allowed("A::B"));
        assert!(policy.is_type_allowed("A::B"));
        assert_eq!(policy.cache.len(), 1);
    }

    #[test]
    fn test_policy_for_config() {
        let deny = policy_for(&MachineConfig::new().with_access_mode(AccessMode::DenyAll));
        assert!(!deny.is_type_allowed("Anything"));
        let allow = policy_for(&MachineConfig::new());
        assert!(allow.is_member_allowed("Anything", "run"));
        let listed = policy_for(&MachineConfig::new().allow_type("Host"));
        assert!(listed.is_type_allowed("Host::Clock"));
        assert!(!listed.is_type_allowed("Other"));
    }
}
