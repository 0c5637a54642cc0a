use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

pub trait PermissionChecker {
    /// Whether the viewer may moderate `giver`'s responses in `section`.
    fn can_moderate(&self, section: &str, session: &str, giver: &str) -> bool;
    fn can_modify_session(&self) -> bool;
}

/// Privileges of the instructor viewing the results, at course, section and
/// session granularity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstructorPrivileges {
    #[serde(default)]
    pub modify_session: bool,
    #[serde(default)]
    pub moderate_all_sections: bool,
    #[serde(default)]
    pub moderate_sections: BTreeSet<String>,
    /// Session name to the sections it may be moderated in.
    #[serde(default)]
    pub session_sections: BTreeMap<String, BTreeSet<String>>,
}

impl InstructorPrivileges {
    /// Privileges of a course co-owner.
    pub fn co_owner() -> Self {
        Self {
            modify_session: true,
            moderate_all_sections: true,
            ..Self::default()
        }
    }
}

impl PermissionChecker for InstructorPrivileges {
    fn can_moderate(&self, section: &str, session: &str, _giver: &str) -> bool {
        self.moderate_all_sections
            || self.moderate_sections.contains(section)
            || self
                .session_sections
                .get(session)
                .is_some_and(|sections| sections.contains(section))
    }

    fn can_modify_session(&self) -> bool {
        self.modify_session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn co_owner_moderates_everywhere() {
        let privileges = InstructorPrivileges::co_owner();
        assert!(privileges.can_moderate("A", "Peer Review 1", "alice@example.com"));
        assert!(privileges.can_modify_session());
    }

    #[test]
    fn section_privileges_are_scoped() {
        let privileges = InstructorPrivileges {
            moderate_sections: BTreeSet::from(["A".to_string()]),
            ..InstructorPrivileges::default()
        };
        assert!(privileges.can_moderate("A", "Peer Review 1", "alice@example.com"));
        assert!(!privileges.can_moderate("B", "Peer Review 1", "carol@example.com"));
        assert!(!privileges.can_modify_session());
    }

    #[test]
    fn session_privileges_apply_only_to_that_session() {
        let privileges = InstructorPrivileges {
            session_sections: BTreeMap::from([(
                "Peer Review 1".to_string(),
                BTreeSet::from(["B".to_string()]),
            )]),
            ..InstructorPrivileges::default()
        };
        assert!(privileges.can_moderate("B", "Peer Review 1", "carol@example.com"));
        assert!(!privileges.can_moderate("B", "Peer Review 2", "carol@example.com"));
    }
}
