//! Error types for depot-resolver.

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error(transparent)]
    Registry(#[from] depot_registry::RegistryError),

    #[error("no version of {name} ({uuid}) satisfies the constraints placed on it")]
    EmptyDomain { uuid: Uuid, name: String },

    #[error("no assignment satisfies every constraint among {{{}}}: {detail}", names.join(", "))]
    Conflict { names: Vec<String>, detail: String },

    #[error("{uuid} is neither a fixed node, a known stdlib, nor registered in any configured registry")]
    UnknownDependency { uuid: Uuid },
}

impl ResolverError {
    /// `true` for the two kinds a tiered driver should catch and retry at a
    /// looser preservation level; all other kinds propagate immediately.
    #[must_use]
    pub fn is_resolver_conflict(&self) -> bool {
        matches!(self, ResolverError::EmptyDomain { .. } | ResolverError::Conflict { .. })
    }
}
