//! Role → capability table implementing [`PermissionGate`].

use apiman_kernel::gateway::{Decision, PermissionGate};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Immutable mapping from role name to the capabilities it may invoke.
///
/// Authorization is exact-string membership; a role missing from the table
/// has no capabilities.
#[derive(Debug, Clone, Default)]
pub struct RoleTable {
    roles: HashMap<String, HashSet<String>>,
}

impl RoleTable {
    pub fn new(roles: &BTreeMap<String, Vec<String>>) -> Self {
        Self {
            roles: roles
                .iter()
                .map(|(role, caps)| (role.clone(), caps.iter().cloned().collect()))
                .collect(),
        }
    }

    /// The reference seed: `user → {ocr, ner}`, `admin → {ocr, ner, config}`.
    pub fn reference() -> Self {
        Self::new(&crate::config::AuthSettings::default().roles)
    }

    pub fn capabilities(&self, role: &str) -> Option<&HashSet<String>> {
        self.roles.get(role)
    }
}

impl PermissionGate for RoleTable {
    fn authorize(&self, role: &str, capability: &str) -> Decision {
        self.roles
            .get(role)
            .is_some_and(|caps| caps.contains(capability))
            .into()
    }
}
