//! Builds section panels for the views grouped by giver or by recipient.
//!
//! Entries arrive sorted so that participants of one team, and teams of one
//! section, are next to each other. The assembler walks them once, closing a
//! team or a section whenever the key changes, and fills in placeholder
//! panels for roster members, teams and sections that had no responses.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::boundary::BoundaryDetector;
use crate::bundle::ParticipantEntry;
use crate::error::RenderError;
use crate::models::{Primary, DEFAULT_SECTION, USER_TEAM_FOR_INSTRUCTOR};
use crate::panels::{ParticipantPanel, QuestionTable, SectionPanel};
use crate::tracker;
use crate::view::ViewStrategy;

/// Roster queries the assembler needs.
pub trait RosterLookup {
    fn is_instructor(&self, identifier: &str) -> bool;
    fn roster_team_of(&self, identifier: &str) -> Option<String>;
    fn display_name_of(&self, identifier: &str) -> String;
    fn teams_in_section(&self, section: &str) -> BTreeSet<String>;
    fn members_of_team(&self, team: &str) -> BTreeSet<String>;
    fn sections(&self) -> BTreeSet<String>;
}

/// Builds the panels that go inside a section.
pub trait PanelFactory {
    fn participant_panel(&self, entry: &ParticipantEntry<'_>, index: usize) -> ParticipantPanel;
    fn placeholder_panel(&self, identifier: &str) -> ParticipantPanel;
    fn team_statistics(&self, team: &str) -> Vec<QuestionTable>;
}

/// Team a participant's panel is filed under: instructors share one team,
/// participants without a roster team stand on their own.
pub fn participant_team<R>(roster: &R, identifier: &str) -> String
where
    R: RosterLookup + ?Sized,
{
    if roster.is_instructor(identifier) {
        return USER_TEAM_FOR_INSTRUCTOR.to_string();
    }
    match roster.roster_team_of(identifier) {
        Some(team) if !team.is_empty() => team,
        _ => roster.display_name_of(identifier),
    }
}

#[derive(Debug, Default)]
struct AssemblyState {
    detector: BoundaryDetector,
    finished: Vec<SectionPanel>,
    current: Option<SectionPanel>,
    sections_emitted: HashSet<String>,
    teams_emitted: Vec<String>,
    participants_emitted: HashSet<String>,
}

pub struct PanelAssembler<'r, R: ?Sized, F: ?Sized> {
    roster: &'r R,
    factory: &'r F,
    strategy: &'static ViewStrategy,
    primary: Primary,
    start_index: usize,
}

impl<'r, R, F> PanelAssembler<'r, R, F>
where
    R: RosterLookup + ?Sized,
    F: PanelFactory + ?Sized,
{
    pub fn new(
        roster: &'r R,
        factory: &'r F,
        strategy: &'static ViewStrategy,
    ) -> Result<Self, RenderError> {
        let primary = strategy
            .primary
            .ok_or(RenderError::NotGroupedByParticipant(strategy.name))?;
        Ok(Self {
            roster,
            factory,
            strategy,
            primary,
            start_index: 0,
        })
    }

    /// Offset added to participant indices, for sections loaded separately.
    pub fn with_start_index(mut self, start_index: usize) -> Self {
        self.start_index = start_index;
        self
    }

    pub fn assemble<'e>(
        &self,
        entries: &[ParticipantEntry<'e>],
        all_sections: bool,
    ) -> Vec<SectionPanel> {
        if entries.is_empty() {
            return Vec::new();
        }

        let state = entries
            .iter()
            .enumerate()
            .fold(AssemblyState::default(), |state, (position, entry)| {
                self.step(state, entry, self.start_index + position)
            });
        let mut state = self.flush(state);

        if all_sections {
            self.add_missing_sections(&mut state);
        }

        debug!(
            view = self.strategy.name,
            sections = state.finished.len(),
            "assembled section panels"
        );
        state.finished
    }

    fn step(
        &self,
        mut state: AssemblyState,
        entry: &ParticipantEntry<'_>,
        index: usize,
    ) -> AssemblyState {
        let team = participant_team(self.roster, &entry.identifier);
        let section = entry.section(self.primary).unwrap_or(DEFAULT_SECTION);

        let prev_team = state.detector.team().map(str::to_string);
        let prev_section = state.detector.section().map(str::to_string);
        let boundary = state.detector.advance(Some(section), &team);

        if boundary.team_changed && !boundary.first {
            if let Some(prev_team) = prev_team {
                self.close_team(&mut state, &prev_team);
            }
        }

        if boundary.section_changed {
            if let Some(prev_section) = prev_section {
                self.close_section(&mut state, &prev_section);
            }
            state.current = Some(SectionPanel::new(section));
        }

        if boundary.team_changed && !state.teams_emitted.contains(&team) {
            state.teams_emitted.push(team.clone());
        }

        let panel = self.factory.participant_panel(entry, index);
        if let Some(current) = state.current.as_mut() {
            let group = current.team_mut(&team);
            group.has_responses = true;
            group.participants.push(panel);
        }
        debug!(
            participant = %entry.identifier,
            team = %team,
            responses = entry.response_count(),
            "added participant panel"
        );
        state.participants_emitted.insert(entry.identifier.clone());
        state
    }

    /// Closes whatever team and section were still open after the last entry.
    fn flush(&self, mut state: AssemblyState) -> AssemblyState {
        let last_team = state.detector.team().map(str::to_string);
        let last_section = state.detector.section().map(str::to_string);
        if let Some(team) = last_team {
            self.close_team(&mut state, &team);
        }
        if let Some(section) = last_section {
            self.close_section(&mut state, &section);
        }
        state
    }

    /// Appends placeholder panels for roster members of `team` that had no
    /// panel of their own.
    fn close_team(&self, state: &mut AssemblyState, team: &str) {
        let members = self.roster.members_of_team(team);
        let missing = tracker::missing(&members, &state.participants_emitted);
        if let Some(current) = state.current.as_mut() {
            for member in &missing {
                current.push_participant(team, self.factory.placeholder_panel(member));
            }
        }
        state.participants_emitted.clear();
    }

    fn close_section(&self, state: &mut AssemblyState, section: &str) {
        let Some(mut panel) = state.current.take() else {
            return;
        };

        self.finalize(&mut panel);
        for team in &state.teams_emitted {
            let tables = self.factory.team_statistics(team);
            if let Some(group) = panel.teams.iter_mut().find(|group| &group.team == team) {
                group.statistics_tables = tables;
            }
        }

        let observed: HashSet<String> = state.teams_emitted.iter().cloned().collect();
        let teams_without_responses =
            tracker::missing(&self.roster.teams_in_section(section), &observed);
        for team in &teams_without_responses {
            self.add_team_placeholders(&mut panel, team);
        }

        debug!(
            section,
            teams = panel.teams.len(),
            participants = panel.participant_count(),
            "closed section panel"
        );
        state.sections_emitted.insert(section.to_string());
        state.finished.push(panel);
        state.teams_emitted.clear();
    }

    /// Section panel holding only placeholders for the roster teams of
    /// `section`.
    pub fn placeholder_section(&self, section: &str) -> SectionPanel {
        let mut panel = SectionPanel::new(section);
        self.finalize(&mut panel);
        for team in self.roster.teams_in_section(section) {
            self.add_team_placeholders(&mut panel, &team);
        }
        panel
    }

    fn add_missing_sections(&self, state: &mut AssemblyState) {
        let missing_sections = tracker::missing(&self.roster.sections(), &state.sections_emitted);
        for section in missing_sections {
            let panel = self.placeholder_section(&section);
            state.sections_emitted.insert(section);
            state.finished.push(panel);
        }
    }

    fn add_team_placeholders(&self, panel: &mut SectionPanel, team: &str) {
        // A team without members still gets its (empty) group.
        panel.team_mut(team);
        for member in self.roster.members_of_team(team) {
            panel.push_participant(team, self.factory.placeholder_panel(&member));
        }
    }

    fn finalize(&self, panel: &mut SectionPanel) {
        panel.statistics_header = self.strategy.statistics_header.map(str::to_string);
        panel.detailed_responses_header = self.strategy.detailed_responses_header.map(str::to_string);
        panel.displaying_team_statistics = true;
    }
}
