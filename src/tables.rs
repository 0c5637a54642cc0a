use std::collections::HashMap;

use crate::assembler::PanelFactory;
use crate::bundle::{ParticipantEntry, QuestionResponses};
use crate::models::{Primary, Question, Response};
use crate::panels::{ButtonStyle, ParticipantPanel, QuestionTable};
use crate::rows::RowBuilder;

const MODERATE_RESPONSES: &str = "Moderate Responses";

/// Question tables and participant panels for one render.
pub struct TableBuilder<'a> {
    rows: RowBuilder<'a>,
    show_stats: bool,
    team_responses: HashMap<String, Vec<QuestionResponses<'a>>>,
}

impl<'a> TableBuilder<'a> {
    pub fn new(rows: RowBuilder<'a>, show_stats: bool) -> Self {
        let team_responses = match rows.strategy().primary {
            Some(primary) if show_stats => rows.bundle().responses_grouped_by_team(primary),
            _ => HashMap::new(),
        };
        Self {
            rows,
            show_stats,
            team_responses,
        }
    }

    /// Table of the by-question view: all responses to `question` plus the
    /// placeholders for missing ones.
    pub fn question_table(&self, question: &Question, responses: &[&Response]) -> QuestionTable {
        let strategy = self.rows.strategy();
        QuestionTable {
            question_id: question.id.clone(),
            question_number: question.number,
            question_text: question.text.clone(),
            question_kind: question.details.label().to_string(),
            response_count: responses.len(),
            statistics_html: self.statistics(question, responses),
            rows: self.rows.rows_for_question(question, responses),
            columns: strategy.column_headers(),
            show_response_rows: true,
            collapsible: strategy.tables_collapsible,
            bold_question_number: true,
            additional_info_id: (strategy.additional_info_id)(0, question.number as usize),
        }
    }

    fn participant_table(
        &self,
        group: &QuestionResponses<'_>,
        participant: &str,
        participant_index: usize,
        position: usize,
    ) -> QuestionTable {
        let strategy = self.rows.strategy();
        let question = group.question;
        QuestionTable {
            question_id: question.id.clone(),
            question_number: question.number,
            question_text: question.text.clone(),
            question_kind: question.details.label().to_string(),
            response_count: group.responses.len(),
            statistics_html: self.statistics(question, &group.responses),
            rows: self.rows.rows_for_participant(
                question,
                &group.responses,
                participant,
                self.primary(),
            ),
            columns: strategy.column_headers(),
            show_response_rows: true,
            collapsible: strategy.tables_collapsible,
            bold_question_number: false,
            additional_info_id: (strategy.additional_info_id)(participant_index, position),
        }
    }

    /// Statistics-only table; none when the question type has nothing to show.
    fn statistics_table(&self, group: &QuestionResponses<'_>) -> Option<QuestionTable> {
        let question = group.question;
        let statistics_html = question.details.statistics_fragment(&group.responses);
        if statistics_html.is_empty() {
            return None;
        }
        Some(QuestionTable {
            question_id: question.id.clone(),
            question_number: question.number,
            question_text: question.text.clone(),
            question_kind: question.details.label().to_string(),
            response_count: group.responses.len(),
            statistics_html,
            rows: Vec::new(),
            columns: Vec::new(),
            show_response_rows: false,
            collapsible: false,
            bold_question_number: false,
            additional_info_id: String::new(),
        })
    }

    fn statistics(&self, question: &Question, responses: &[&Response]) -> String {
        if self.show_stats {
            question.details.statistics_fragment(responses)
        } else {
            String::new()
        }
    }

    fn primary(&self) -> Primary {
        self.rows.strategy().primary.unwrap_or(Primary::Giver)
    }

    /// Name on a participant panel. Anonymous when the first response hides
    /// the participant.
    fn panel_name(&self, entry: &ParticipantEntry<'_>) -> (String, bool) {
        let bundle = self.rows.bundle();
        let first = entry
            .questions
            .iter()
            .find_map(|group| group.responses.first().map(|r| (group.question, *r)));
        match (first, self.primary()) {
            (Some((question, response)), Primary::Giver) => (
                bundle.giver_name_for(question, response),
                bundle.is_giver_visible(response),
            ),
            (Some((question, response)), Primary::Recipient) => (
                bundle.recipient_name_for(question, response),
                bundle.is_recipient_visible(response),
            ),
            (None, _) => (bundle.display_name_of(&entry.identifier), true),
        }
    }
}

impl PanelFactory for TableBuilder<'_> {
    fn participant_panel(&self, entry: &ParticipantEntry<'_>, index: usize) -> ParticipantPanel {
        let bundle = self.rows.bundle();
        let strategy = self.rows.strategy();
        let (name, visible) = self.panel_name(entry);

        let mut groups: Vec<&QuestionResponses<'_>> = entry
            .questions
            .iter()
            .filter(|group| !group.responses.is_empty())
            .collect();
        groups.sort_by_key(|group| group.question.number);
        // Tables are numbered from 1 by position, skipping unanswered questions.
        let question_tables: Vec<QuestionTable> = groups
            .into_iter()
            .enumerate()
            .map(|(position, group)| {
                self.participant_table(group, &entry.identifier, index, position + 1)
            })
            .collect();

        let moderation = (visible
            && strategy.moderation_on_panels
            && bundle.is_student(&entry.identifier))
        .then(|| {
            self.rows.moderation_button(
                None,
                &entry.identifier,
                ButtonStyle::Primary,
                MODERATE_RESPONSES,
            )
        });

        ParticipantPanel {
            identifier: entry.identifier.clone(),
            name,
            picture_link: visible
                .then(|| self.rows.profile_picture_link(&entry.identifier))
                .flatten(),
            is_giver: self.primary() == Primary::Giver,
            has_responses: true,
            question_tables,
            moderation,
        }
    }

    fn placeholder_panel(&self, identifier: &str) -> ParticipantPanel {
        let strategy = self.rows.strategy();
        let moderation = strategy.moderation_on_panels.then(|| {
            self.rows
                .moderation_button(None, identifier, ButtonStyle::Default, MODERATE_RESPONSES)
        });
        ParticipantPanel {
            identifier: identifier.to_string(),
            name: self.rows.bundle().display_name_of(identifier),
            picture_link: self.rows.profile_picture_link(identifier),
            is_giver: self.primary() == Primary::Giver,
            has_responses: false,
            question_tables: Vec::new(),
            moderation,
        }
    }

    fn team_statistics(&self, team: &str) -> Vec<QuestionTable> {
        self.team_responses
            .get(team)
            .map(|groups| {
                groups
                    .iter()
                    .filter_map(|group| self.statistics_table(group))
                    .collect()
            })
            .unwrap_or_default()
    }
}
