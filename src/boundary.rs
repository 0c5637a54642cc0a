use crate::models::DEFAULT_SECTION;

/// What changed between the previous entry and the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    /// No previous entry; there is nothing to close.
    pub first: bool,
    pub section_changed: bool,
    /// Also set whenever the section changes.
    pub team_changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct GroupKey {
    section: String,
    team: String,
}

/// Tracks the section and team of the last entry of a sorted stream.
#[derive(Debug, Clone, Default)]
pub struct BoundaryDetector {
    prev: Option<GroupKey>,
}

impl BoundaryDetector {
    pub fn advance(&mut self, section: Option<&str>, team: &str) -> Boundary {
        let current = GroupKey {
            section: section.unwrap_or(DEFAULT_SECTION).to_string(),
            team: team.to_string(),
        };

        let boundary = match &self.prev {
            None => Boundary {
                first: true,
                section_changed: true,
                team_changed: true,
            },
            Some(prev) => {
                let section_changed = prev.section != current.section;
                Boundary {
                    first: false,
                    section_changed,
                    team_changed: section_changed || prev.team != current.team,
                }
            }
        };

        self.prev = Some(current);
        boundary
    }

    pub fn section(&self) -> Option<&str> {
        self.prev.as_ref().map(|key| key.section.as_str())
    }

    pub fn team(&self) -> Option<&str> {
        self.prev.as_ref().map(|key| key.team.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_entry_opens_both_groups() {
        let mut detector = BoundaryDetector::default();
        let boundary = detector.advance(Some("A"), "T1");
        assert!(boundary.first);
        assert!(boundary.section_changed);
        assert!(boundary.team_changed);
    }

    #[test]
    fn same_group_reports_no_change() {
        let mut detector = BoundaryDetector::default();
        detector.advance(Some("A"), "T1");
        let boundary = detector.advance(Some("A"), "T1");
        assert_eq!(
            boundary,
            Boundary {
                first: false,
                section_changed: false,
                team_changed: false,
            }
        );
    }

    #[test]
    fn team_change_within_section() {
        let mut detector = BoundaryDetector::default();
        detector.advance(Some("A"), "T1");
        let boundary = detector.advance(Some("A"), "T2");
        assert!(!boundary.section_changed);
        assert!(boundary.team_changed);
    }

    #[test]
    fn section_change_implies_team_change_even_for_equal_team_names() {
        let mut detector = BoundaryDetector::default();
        detector.advance(Some("A"), "T1");
        let boundary = detector.advance(Some("B"), "T1");
        assert!(boundary.section_changed);
        assert!(boundary.team_changed);
    }

    #[test]
    fn missing_section_uses_default_sentinel() {
        let mut detector = BoundaryDetector::default();
        detector.advance(None, "T1");
        assert_eq!(detector.section(), Some(DEFAULT_SECTION));
        let boundary = detector.advance(Some(DEFAULT_SECTION), "T1");
        assert!(!boundary.section_changed);
        assert_eq!(detector.team(), Some("T1"));
    }
}
