use crate::ids::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Extra permission a user can hold on top of the regular booking rights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    /// May book the whole property as non-sharable (NC).
    CanCreateNonSharable,
    /// May publish holidays (FR) and vacation periods (VC).
    CanCreateAdminEvents,
}

impl Capability {
    pub const ALL: [Capability; 2] = [
        Capability::CanCreateNonSharable,
        Capability::CanCreateAdminEvents,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Capability::CanCreateNonSharable => "CAN_CREATE_NON_SHARABLE",
            Capability::CanCreateAdminEvents => "CAN_CREATE_ADMIN_EVENTS",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn grant(&mut self, capability: Capability) {
        self.0.insert(capability);
    }

    pub fn union(&self, other: &CapabilitySet) -> CapabilitySet {
        CapabilitySet(self.0.union(&other.0).copied().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        CapabilitySet(iter.into_iter().collect())
    }
}

/// Authenticated requester, resolved once when the token is verified and carried through
/// every decision the core makes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub capabilities: CapabilitySet,
}

impl Session {
    pub fn new(user_id: ObjectId, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            capabilities: CapabilitySet::new(),
        }
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.grant(capability);
        self
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_serialize_as_codes() {
        let set: CapabilitySet = [Capability::CanCreateAdminEvents].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, "[\"CAN_CREATE_ADMIN_EVENTS\"]");
    }

    #[test]
    fn test_union_merges_grants() {
        let stored: CapabilitySet = [Capability::CanCreateNonSharable].into_iter().collect();
        let configured: CapabilitySet = [Capability::CanCreateAdminEvents].into_iter().collect();
        let merged = stored.union(&configured);
        assert!(merged.contains(Capability::CanCreateNonSharable));
        assert!(merged.contains(Capability::CanCreateAdminEvents));
    }
}
