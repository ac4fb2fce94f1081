//! # Authorization Predicate
//!
//! Role resolution is a pure function from an opaque identity claim to a
//! capability set. Callers inject an `Authorizer`; nothing downstream inspects
//! raw role strings or email domains.

use crate::ids::ParticipantId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Something a caller is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    /// Present and scan tokens (students).
    Scan,
    /// Seed, close, snapshot and broadcast (teachers).
    ManageChains,
    /// Read traces and snapshot comparisons.
    ViewAudit,
}

/// Set of granted capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    /// No capabilities.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a capability (builder style).
    #[must_use]
    pub fn with(mut self, capability: Capability) -> Self {
        self.0.insert(capability);
        self
    }

    /// Whether `capability` is granted.
    pub fn allows(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Opaque identity assertion produced by the external authentication service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaim {
    pub subject: ParticipantId,
    pub role: String,
}

impl IdentityClaim {
    pub fn new(subject: impl Into<ParticipantId>, role: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            role: role.into(),
        }
    }
}

/// Maps an identity claim to what it may do.
pub trait Authorizer: Send + Sync {
    fn capabilities(&self, claim: &IdentityClaim) -> CapabilitySet;

    /// Convenience check for a single capability.
    fn permits(&self, claim: &IdentityClaim, capability: Capability) -> bool {
        self.capabilities(claim).allows(capability)
    }
}

/// Table-driven authorizer keyed on the claim's role value.
///
/// Unknown roles get no capabilities.
#[derive(Debug, Clone)]
pub struct RoleClaimAuthorizer {
    roles: HashMap<String, CapabilitySet>,
}

impl RoleClaimAuthorizer {
    /// Empty table.
    pub fn empty() -> Self {
        Self {
            roles: HashMap::new(),
        }
    }

    /// Grant `capabilities` to every claim carrying `role`.
    #[must_use]
    pub fn with_role(mut self, role: &str, capabilities: CapabilitySet) -> Self {
        self.roles.insert(role.to_ascii_lowercase(), capabilities);
        self
    }
}

impl Default for RoleClaimAuthorizer {
    /// `student` scans; `teacher` manages chains and reads audit; `auditor` reads audit.
    fn default() -> Self {
        Self::empty()
            .with_role("student", CapabilitySet::empty().with(Capability::Scan))
            .with_role(
                "teacher",
                CapabilitySet::empty()
                    .with(Capability::ManageChains)
                    .with(Capability::ViewAudit),
            )
            .with_role("auditor", CapabilitySet::empty().with(Capability::ViewAudit))
    }
}

impl Authorizer for RoleClaimAuthorizer {
    fn capabilities(&self, claim: &IdentityClaim) -> CapabilitySet {
        self.roles
            .get(&claim.role.to_ascii_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}
