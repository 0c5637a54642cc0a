//! Display model handed to the templating layer.
//!
//! Everything here is plain data: the page builders fill it in, the report
//! writers and serde read it back out.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::{DEFAULT_SECTION, DISPLAY_NAME_FOR_DEFAULT_SECTION};

pub const PENDING_RESPONSE_ROW_CLASS: &str = "pending_response_row";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnHeader {
    pub label: String,
    /// DOM id of the sort toggle, absent for plain headers.
    pub sort_id: Option<String>,
    pub sort_column: Option<u8>,
    pub initially_ascending: bool,
    pub width_percent: Option<u8>,
    pub sortable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModerationButton {
    pub allowed: bool,
    pub disabled: bool,
    pub style: ButtonStyle,
    pub giver_identifier: String,
    pub course_id: String,
    pub session_name: String,
    pub question_number: Option<u32>,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseRow {
    pub giver_name: String,
    pub giver_team: String,
    pub recipient_name: String,
    pub recipient_team: String,
    pub answer_html: String,
    pub moderation: Option<ModerationButton>,
    pub is_missing: bool,
    pub giver_displayed: bool,
    pub recipient_displayed: bool,
    pub actions_displayed: bool,
    pub giver_picture_column: bool,
    pub recipient_picture_column: bool,
    pub giver_picture: Option<String>,
    pub recipient_picture: Option<String>,
    pub row_class: Option<String>,
}

impl ResponseRow {
    pub fn new(
        giver_name: String,
        giver_team: String,
        recipient_name: String,
        recipient_team: String,
        answer_html: String,
        moderation: Option<ModerationButton>,
    ) -> Self {
        Self {
            giver_name,
            giver_team,
            recipient_name,
            recipient_team,
            answer_html,
            moderation,
            is_missing: false,
            giver_displayed: true,
            recipient_displayed: true,
            actions_displayed: false,
            giver_picture_column: false,
            recipient_picture_column: false,
            giver_picture: None,
            recipient_picture: None,
            row_class: None,
        }
    }

    /// Placeholder for a giver/recipient pair without a response.
    pub fn pending(
        giver_name: String,
        giver_team: String,
        recipient_name: String,
        recipient_team: String,
        placeholder_html: String,
        moderation: Option<ModerationButton>,
    ) -> Self {
        let mut row = Self::new(
            giver_name,
            giver_team,
            recipient_name,
            recipient_team,
            placeholder_html,
            moderation,
        );
        row.is_missing = true;
        row.row_class = Some(PENDING_RESPONSE_ROW_CLASS.to_string());
        row
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionTable {
    pub question_id: String,
    pub question_number: u32,
    pub question_text: String,
    pub question_kind: String,
    pub response_count: usize,
    pub statistics_html: String,
    pub rows: Vec<ResponseRow>,
    pub columns: Vec<ColumnHeader>,
    pub show_response_rows: bool,
    pub collapsible: bool,
    pub bold_question_number: bool,
    pub additional_info_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantPanel {
    pub identifier: String,
    pub name: String,
    pub picture_link: Option<String>,
    pub is_giver: bool,
    pub has_responses: bool,
    pub question_tables: Vec<QuestionTable>,
    pub moderation: Option<ModerationButton>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamGroup {
    pub team: String,
    pub has_responses: bool,
    pub participants: Vec<ParticipantPanel>,
    pub statistics_tables: Vec<QuestionTable>,
}

impl TeamGroup {
    fn new(team: &str) -> Self {
        Self {
            team: team.to_string(),
            has_responses: false,
            participants: Vec::new(),
            statistics_tables: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionPanel {
    pub section_name: String,
    pub display_name: String,
    pub teams: Vec<TeamGroup>,
    pub statistics_header: Option<String>,
    pub detailed_responses_header: Option<String>,
    pub displaying_team_statistics: bool,
    /// Content is fetched by a follow-up request.
    pub load_by_ajax: bool,
    pub able_to_load: bool,
}

impl SectionPanel {
    pub fn new(section: &str) -> Self {
        Self {
            section_name: section.to_string(),
            display_name: section_display_name(section).to_string(),
            teams: Vec::new(),
            statistics_header: None,
            detailed_responses_header: None,
            displaying_team_statistics: false,
            load_by_ajax: false,
            able_to_load: true,
        }
    }

    pub fn team_mut(&mut self, team: &str) -> &mut TeamGroup {
        let index = match self.teams.iter().position(|group| group.team == team) {
            Some(index) => index,
            None => {
                self.teams.push(TeamGroup::new(team));
                self.teams.len() - 1
            }
        };
        &mut self.teams[index]
    }

    pub fn push_participant(&mut self, team: &str, panel: ParticipantPanel) {
        self.team_mut(team).participants.push(panel);
    }

    pub fn participant_count(&self) -> usize {
        self.teams.iter().map(|group| group.participants.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

pub fn section_display_name(section: &str) -> &str {
    if section == DEFAULT_SECTION {
        DISPLAY_NAME_FOR_DEFAULT_SECTION
    } else {
        section
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionPanel {
    pub course_id: String,
    pub session_name: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub published: bool,
    pub selected_section: String,
    pub edit_link: Option<String>,
    pub publish_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterPanel {
    pub stats_shown: bool,
    pub panels_collapsed: bool,
    pub all_sections_selected: bool,
    pub selected_section: String,
    pub grouped_by_team: bool,
    pub sort_type: String,
    pub results_link: String,
    pub sections: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "panels", rename_all = "snake_case")]
pub enum PageBody {
    Questions(Vec<QuestionTable>),
    Sections(Vec<SectionPanel>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsPage {
    pub session_panel: SessionPanel,
    pub filter_panel: FilterPanel,
    pub body: PageBody,
    pub panels_collapsed: bool,
    pub advisory: Option<String>,
}

impl ResultsPage {
    pub fn sections(&self) -> &[SectionPanel] {
        match &self.body {
            PageBody::Sections(panels) => panels,
            PageBody::Questions(_) => &[],
        }
    }

    pub fn question_tables(&self) -> &[QuestionTable] {
        match &self.body {
            PageBody::Questions(tables) => tables,
            PageBody::Sections(_) => &[],
        }
    }
}

#[cfg(test)]
impl TeamGroup {
    pub fn participant(&self, identifier: &str) -> Option<&ParticipantPanel> {
        self.participants.iter().find(|p| p.identifier == identifier)
    }
}

#[cfg(test)]
impl SectionPanel {
    pub fn team(&self, team: &str) -> Option<&TeamGroup> {
        self.teams.iter().find(|group| group.team == team)
    }
}

#[cfg(test)]
impl ResultsPage {
    pub fn section(&self, name: &str) -> Option<&SectionPanel> {
        self.sections().iter().find(|panel| panel.section_name == name)
    }
}
