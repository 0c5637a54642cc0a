use std::collections::{BTreeSet, HashSet};

use crate::models::ParticipantType;

/// Maps a participant identifier to the form used in expected sets. For team
/// participants this is the team's display name, so that a team identifier
/// and its name compare equal.
pub trait CanonicalName {
    fn canonical_name(&self, identifier: &str) -> String;
}

/// `expected - observed`, ascending.
pub fn missing<'a, I>(expected: I, observed: &HashSet<String>) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let remaining: BTreeSet<&String> = expected
        .into_iter()
        .filter(|key| !observed.contains(*key))
        .collect();
    remaining.into_iter().cloned().collect()
}

/// Shrinking set of participants that could have responded but have not
/// been seen yet.
#[derive(Debug, Clone)]
pub struct ExpectedSetTracker {
    kind: ParticipantType,
    pending: BTreeSet<String>,
}

impl ExpectedSetTracker {
    pub fn new<I>(kind: ParticipantType, expected: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            kind,
            pending: expected.into_iter().collect(),
        }
    }

    pub fn empty(kind: ParticipantType) -> Self {
        Self::new(kind, Vec::new())
    }

    /// Marks `identifier` as seen. Returns whether it was still pending.
    pub fn observe<N>(&mut self, names: &N, identifier: &str) -> bool
    where
        N: CanonicalName + ?Sized,
    {
        if self.kind.is_team() {
            let canonical = names.canonical_name(identifier);
            self.pending.remove(&canonical)
        } else {
            self.pending.remove(identifier)
        }
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn missing(&self) -> Vec<String> {
        self.pending.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Names(HashMap<String, String>);

    impl CanonicalName for Names {
        fn canonical_name(&self, identifier: &str) -> String {
            self.0
                .get(identifier)
                .cloned()
                .unwrap_or_else(|| identifier.to_string())
        }
    }

    fn names() -> Names {
        Names(HashMap::from([(
            "alice@example.com".to_string(),
            "Team 1".to_string(),
        )]))
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn missing_is_sorted_difference() {
        let expected = strings(&["carol", "alice", "bob"]);
        let observed: HashSet<String> = strings(&["bob", "zed"]).into_iter().collect();
        assert_eq!(missing(&expected, &observed), strings(&["alice", "carol"]));
    }

    #[test]
    fn missing_with_nothing_observed_returns_everything() {
        let expected = strings(&["b", "a"]);
        assert_eq!(missing(&expected, &HashSet::new()), strings(&["a", "b"]));
    }

    #[test]
    fn team_identifiers_are_normalized_before_removal() {
        let mut tracker =
            ExpectedSetTracker::new(ParticipantType::Teams, strings(&["Team 1", "Team 2"]));
        assert!(tracker.observe(&names(), "alice@example.com"));
        assert_eq!(tracker.missing(), strings(&["Team 2"]));
    }

    #[test]
    fn non_team_identifiers_are_matched_verbatim() {
        let mut tracker = ExpectedSetTracker::new(
            ParticipantType::Students,
            strings(&["alice@example.com", "bob@example.com"]),
        );
        assert!(tracker.observe(&names(), "alice@example.com"));
        assert!(!tracker.observe(&names(), "alice@example.com"));
        assert_eq!(tracker.missing(), strings(&["bob@example.com"]));
    }

    #[test]
    fn clear_discards_everything_pending() {
        let mut tracker =
            ExpectedSetTracker::new(ParticipantType::Students, strings(&["a", "b"]));
        tracker.clear();
        assert!(tracker.missing().is_empty());
    }
}
