//! Response rows, real and synthesized.
//!
//! Besides one row per response, every giver/recipient pair that could have
//! had a response but did not gets a placeholder row, unless the question
//! type hides those or anonymity would make the gap itself revealing.

use crate::bundle::ResultsBundle;
use crate::config::RenderConfig;
use crate::models::{ParticipantType, Primary, Question, Response, TEAM_OF_EMAIL_OWNER};
use crate::page::SectionFilter;
use crate::panels::{ButtonStyle, ModerationButton, ResponseRow};
use crate::permissions::PermissionChecker;
use crate::tracker::{CanonicalName, ExpectedSetTracker};
use crate::view::{RowPictures, ViewStrategy};

const MODERATE_RESPONSE: &str = "Moderate Response";

pub struct RowBuilder<'a> {
    bundle: &'a ResultsBundle,
    strategy: &'static ViewStrategy,
    permissions: &'a dyn PermissionChecker,
    config: &'a RenderConfig,
    section: &'a SectionFilter,
}

impl<'a> RowBuilder<'a> {
    pub fn new(
        bundle: &'a ResultsBundle,
        strategy: &'static ViewStrategy,
        permissions: &'a dyn PermissionChecker,
        config: &'a RenderConfig,
        section: &'a SectionFilter,
    ) -> Self {
        Self {
            bundle,
            strategy,
            permissions,
            config,
            section,
        }
    }

    pub fn bundle(&self) -> &'a ResultsBundle {
        self.bundle
    }

    pub fn strategy(&self) -> &'static ViewStrategy {
        self.strategy
    }

    /// Only participants identified by an email address have a picture.
    pub fn profile_picture_link(&self, identifier: &str) -> Option<String> {
        identifier.contains('@').then(|| {
            format!(
                "{}?studentemail={}&courseid={}",
                self.config.profile_picture_base, identifier, self.bundle.session.course_id
            )
        })
    }

    pub fn moderation_button(
        &self,
        question: Option<&Question>,
        giver: &str,
        style: ButtonStyle,
        label: &str,
    ) -> ModerationButton {
        let session = &self.bundle.session;
        let allowed =
            self.permissions
                .can_moderate(&self.bundle.section_of(giver), &session.name, giver);

        let strip_team_prefix = question.map_or(true, |q| q.giver_type.is_team());
        let giver_identifier = if strip_team_prefix {
            giver.strip_prefix(TEAM_OF_EMAIL_OWNER).unwrap_or(giver)
        } else {
            giver
        };

        ModerationButton {
            allowed,
            disabled: !allowed,
            style,
            giver_identifier: giver_identifier.to_string(),
            course_id: session.course_id.clone(),
            session_name: session.name.clone(),
            question_number: question.map(|q| q.number),
            label: label.to_string(),
        }
    }

    /// Rows for the by-question view: every response, then placeholders for
    /// each giver's unanswered recipients, then placeholders for givers that
    /// never responded.
    pub fn rows_for_question(&self, question: &Question, responses: &[&Response]) -> Vec<ResponseRow> {
        let bundle = self.bundle;
        let mut rows = Vec::new();
        let mut remaining_givers =
            ExpectedSetTracker::new(question.giver_type, bundle.possible_givers(question));
        let mut pending_recipients = ExpectedSetTracker::empty(question.recipient_type);
        let mut prev_giver: Option<&str> = None;

        for &response in responses {
            if prev_giver != Some(response.giver.as_str()) {
                if let Some(prev) = prev_giver {
                    rows.extend(self.missing_rows_for_giver(
                        question,
                        &pending_recipients.missing(),
                        prev,
                    ));
                }
                let giver_identifier = if question.giver_type == ParticipantType::Teams {
                    bundle.canonical_name(&response.giver)
                } else {
                    response.giver.clone()
                };
                pending_recipients = ExpectedSetTracker::new(
                    question.recipient_type,
                    bundle.possible_recipients(question, &giver_identifier),
                );
            }

            // Who is missing would give away who answered; drop the rest of
            // this giver's placeholders and every pending giver.
            if !bundle.is_giver_visible(response) || !bundle.is_recipient_visible(response) {
                remaining_givers.clear();
                pending_recipients.clear();
            }

            remaining_givers.observe(bundle, &response.giver);
            pending_recipients.observe(bundle, &response.recipient);
            prev_giver = Some(response.giver.as_str());

            rows.push(self.response_row(question, response));
        }

        if let Some(prev) = prev_giver {
            rows.extend(self.missing_rows_for_giver(question, &pending_recipients.missing(), prev));
            remaining_givers.observe(bundle, prev);
        }

        for giver in remaining_givers.missing() {
            if let SectionFilter::Section(section) = self.section {
                if &bundle.section_of(&giver) != section {
                    continue;
                }
            }
            let recipients = bundle.possible_recipients(question, &giver);
            rows.extend(self.missing_rows_for_giver(question, &recipients, &giver));
        }

        rows
    }

    /// Rows of one participant's question table in the grouped views: their
    /// responses, then placeholders for the counterparts they are missing.
    pub fn rows_for_participant(
        &self,
        question: &Question,
        responses: &[&Response],
        participant: &str,
        primary: Primary,
    ) -> Vec<ResponseRow> {
        let bundle = self.bundle;
        let mut pending = match primary {
            Primary::Giver => ExpectedSetTracker::new(
                question.recipient_type,
                bundle.possible_recipients(question, participant),
            ),
            Primary::Recipient => ExpectedSetTracker::new(
                question.giver_type,
                bundle.possible_givers_for(question, participant),
            ),
        };

        let mut rows = Vec::with_capacity(responses.len());
        for &response in responses {
            if !bundle.is_giver_visible(response) || !bundle.is_recipient_visible(response) {
                pending.clear();
            }
            let counterpart = match primary {
                Primary::Giver => &response.recipient,
                Primary::Recipient => &response.giver,
            };
            pending.observe(bundle, counterpart);
            rows.push(self.response_row(question, response));
        }

        match primary {
            Primary::Giver => {
                rows.extend(self.missing_rows_for_giver(question, &pending.missing(), participant))
            }
            Primary::Recipient => rows.extend(self.missing_rows_for_recipient(
                question,
                &pending.missing(),
                participant,
            )),
        }
        rows
    }

    fn response_row(&self, question: &Question, response: &Response) -> ResponseRow {
        let bundle = self.bundle;
        let giver_visible = bundle.is_giver_visible(response);
        let recipient_visible = bundle.is_recipient_visible(response);

        let moderation = giver_visible.then(|| {
            self.moderation_button(
                Some(question),
                &response.giver,
                ButtonStyle::Default,
                MODERATE_RESPONSE,
            )
        });
        let giver_team = if giver_visible {
            bundle.team_of(&response.giver)
        } else {
            String::new()
        };
        let recipient_team = if recipient_visible {
            bundle.team_of(&response.recipient)
        } else {
            String::new()
        };

        let mut row = ResponseRow::new(
            bundle.giver_name_for(question, response),
            giver_team,
            bundle.recipient_name_for(question, response),
            recipient_team,
            question.details.answer_html(&response.answer),
            moderation,
        );
        let pictures = RowPictures {
            giver: giver_visible
                .then(|| self.profile_picture_link(&response.giver))
                .flatten(),
            recipient: recipient_visible
                .then(|| self.profile_picture_link(&response.recipient))
                .flatten(),
        };
        (self.strategy.configure_row)(&mut row, pictures);
        row
    }

    fn missing_rows_for_giver(
        &self,
        question: &Question,
        possible_recipients: &[String],
        giver: &str,
    ) -> Vec<ResponseRow> {
        let giver_name = self.bundle.display_name_of(giver);
        let giver_team = self.bundle.team_of(giver);
        possible_recipients
            .iter()
            .filter(|recipient| question.details.should_show_no_response(giver, recipient))
            .map(|recipient| {
                self.pending_row(question, giver, recipient, giver_name.clone(), giver_team.clone())
            })
            .collect()
    }

    fn missing_rows_for_recipient(
        &self,
        question: &Question,
        possible_givers: &[String],
        recipient: &str,
    ) -> Vec<ResponseRow> {
        possible_givers
            .iter()
            .filter(|giver| question.details.should_show_no_response(giver, recipient))
            .map(|giver| {
                let giver_name = self.bundle.display_name_of(giver);
                let giver_team = self.bundle.team_of(giver);
                self.pending_row(question, giver, recipient, giver_name, giver_team)
            })
            .collect()
    }

    fn pending_row(
        &self,
        question: &Question,
        giver: &str,
        recipient: &str,
        giver_name: String,
        giver_team: String,
    ) -> ResponseRow {
        let moderation =
            self.moderation_button(Some(question), giver, ButtonStyle::Default, MODERATE_RESPONSE);
        let mut row = ResponseRow::pending(
            giver_name,
            giver_team,
            self.bundle.display_name_of(recipient),
            self.bundle.team_of(recipient),
            question.details.no_response_text(giver, recipient),
            Some(moderation),
        );
        let pictures = RowPictures {
            giver: self.profile_picture_link(giver),
            recipient: self.profile_picture_link(recipient),
        };
        (self.strategy.configure_row)(&mut row, pictures);
        row
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::bundle::fixtures::*;
    use crate::permissions::InstructorPrivileges;
    use crate::questions::QuestionKind;
    use crate::view::ViewMode;

    fn students() -> Vec<crate::models::Student> {
        vec![
            student("alice@example.com", "Alice", "T1", "A"),
            student("bob@example.com", "Bob", "T1", "A"),
            student("carol@example.com", "Carol", "T2", "B"),
        ]
    }

    fn bundle_with(responses: Vec<Response>) -> ResultsBundle {
        let q1 = question("q1", 1, ParticipantType::Students, ParticipantType::Students);
        ResultsBundle::new(data(students(), vec![q1], responses)).expect("valid bundle")
    }

    fn question_rows(bundle: &ResultsBundle, section: &SectionFilter) -> Vec<ResponseRow> {
        let privileges = InstructorPrivileges::co_owner();
        let config = RenderConfig::default();
        let builder = RowBuilder::new(
            bundle,
            ViewMode::Question.strategy(),
            &privileges,
            &config,
            section,
        );
        let map = bundle.question_response_map();
        builder.rows_for_question(map[0].question, &map[0].responses)
    }

    #[test]
    fn every_pair_has_exactly_one_row_with_full_visibility() {
        let s = students();
        let bundle = bundle_with(vec![
            response(&s, "q1", "alice@example.com", "bob@example.com", "good"),
            response(&s, "q1", "carol@example.com", "alice@example.com", "fine"),
        ]);
        let rows = question_rows(&bundle, &SectionFilter::All);

        assert_eq!(rows.len(), 9);
        let pairs: HashSet<(String, String)> = rows
            .iter()
            .map(|r| (r.giver_name.clone(), r.recipient_name.clone()))
            .collect();
        assert_eq!(pairs.len(), 9);
        assert_eq!(rows.iter().filter(|r| !r.is_missing).count(), 2);
        assert!(rows.iter().all(|r| r.actions_displayed));
    }

    #[test]
    fn placeholders_follow_each_givers_real_rows() {
        let s = students();
        let bundle = bundle_with(vec![response(
            &s,
            "q1",
            "alice@example.com",
            "bob@example.com",
            "good",
        )]);
        let rows = question_rows(&bundle, &SectionFilter::All);

        assert!(!rows[0].is_missing);
        assert_eq!(rows[1].giver_name, "Alice");
        assert_eq!(rows[1].recipient_name, "Alice");
        assert_eq!(rows[2].recipient_name, "Carol");
        assert_eq!(rows[3].giver_name, "Bob");
        assert_eq!(rows.len(), 9);
    }

    #[test]
    fn hidden_response_suppresses_gap_filling_for_that_giver() {
        let s = students();
        let hidden = response(&s, "q1", "alice@example.com", "bob@example.com", "good");
        let mut data = data(
            students(),
            vec![question("q1", 1, ParticipantType::Students, ParticipantType::Students)],
            vec![
                hidden.clone(),
                response(&s, "q1", "carol@example.com", "alice@example.com", "fine"),
            ],
        );
        data.hidden_givers.insert(hidden.id);
        let bundle = ResultsBundle::new(data).expect("valid bundle");
        let rows = question_rows(&bundle, &SectionFilter::All);

        let alice_placeholders = rows
            .iter()
            .filter(|r| r.is_missing && r.giver_name == "Alice")
            .count();
        assert_eq!(alice_placeholders, 0);
        // Bob never answered, but the pending giver list was discarded.
        assert!(rows.iter().all(|r| r.giver_name != "Bob"));
        let carol_placeholders = rows
            .iter()
            .filter(|r| r.is_missing && r.giver_name == "Carol")
            .count();
        assert_eq!(carol_placeholders, 2);
        assert_eq!(rows[0].giver_name, "Anonymous student");
        assert!(rows[0].moderation.is_none());
    }

    #[test]
    fn givers_without_responses_are_limited_to_selected_section() {
        let s = students();
        let bundle = bundle_with(vec![response(
            &s,
            "q1",
            "alice@example.com",
            "bob@example.com",
            "good",
        )]);
        let rows = question_rows(&bundle, &SectionFilter::Section("A".to_string()));

        assert!(rows.iter().any(|r| r.giver_name == "Bob"));
        assert!(rows.iter().all(|r| r.giver_name != "Carol"));
    }

    #[test]
    fn contribution_questions_never_get_placeholders() {
        let s = students();
        let mut q1 = question("q1", 1, ParticipantType::Students, ParticipantType::OwnTeamMembersIncludingSelf);
        q1.details = QuestionKind::Contribution;
        let responses = vec![response(&s, "q1", "alice@example.com", "alice@example.com", "100")];
        let bundle = ResultsBundle::new(data(students(), vec![q1], responses)).expect("valid bundle");
        let rows = question_rows(&bundle, &SectionFilter::All);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].answer_html, "Equal Share");
    }

    #[test]
    fn participant_rows_fill_missing_recipients_for_giver() {
        let s = students();
        let bundle = bundle_with(vec![response(
            &s,
            "q1",
            "alice@example.com",
            "bob@example.com",
            "good",
        )]);
        let privileges = InstructorPrivileges::co_owner();
        let config = RenderConfig::default();
        let builder = RowBuilder::new(
            &bundle,
            ViewMode::GiverQuestionRecipient.strategy(),
            &privileges,
            &config,
            &SectionFilter::All,
        );
        let map = bundle.question_response_map();
        let rows = builder.rows_for_participant(
            map[0].question,
            &map[0].responses,
            "alice@example.com",
            Primary::Giver,
        );

        let recipients: Vec<&str> = rows.iter().map(|r| r.recipient_name.as_str()).collect();
        assert_eq!(recipients, vec!["Bob", "Alice", "Carol"]);
        assert!(rows.iter().all(|r| !r.giver_displayed && !r.actions_displayed));
        assert!(rows[1].is_missing);
    }

    #[test]
    fn participant_rows_fill_missing_givers_for_recipient() {
        let s = students();
        let bundle = bundle_with(vec![response(
            &s,
            "q1",
            "alice@example.com",
            "bob@example.com",
            "good",
        )]);
        let privileges = InstructorPrivileges::co_owner();
        let config = RenderConfig::default();
        let builder = RowBuilder::new(
            &bundle,
            ViewMode::RecipientQuestionGiver.strategy(),
            &privileges,
            &config,
            &SectionFilter::All,
        );
        let map = bundle.question_response_map();
        let rows = builder.rows_for_participant(
            map[0].question,
            &map[0].responses,
            "bob@example.com",
            Primary::Recipient,
        );

        let givers: Vec<&str> = rows.iter().map(|r| r.giver_name.as_str()).collect();
        assert_eq!(givers, vec!["Alice", "Bob", "Carol"]);
        assert!(rows.iter().all(|r| !r.recipient_displayed));
    }

    #[test]
    fn moderation_respects_section_privileges() {
        let bundle = bundle_with(Vec::new());
        let privileges = InstructorPrivileges {
            moderate_sections: ["A".to_string()].into_iter().collect(),
            ..InstructorPrivileges::default()
        };
        let config = RenderConfig::default();
        let builder = RowBuilder::new(
            &bundle,
            ViewMode::Question.strategy(),
            &privileges,
            &config,
            &SectionFilter::All,
        );

        let alice = builder.moderation_button(None, "alice@example.com", ButtonStyle::Primary, "Moderate Responses");
        assert!(alice.allowed && !alice.disabled);
        let carol = builder.moderation_button(None, "carol@example.com", ButtonStyle::Primary, "Moderate Responses");
        assert!(!carol.allowed && carol.disabled);
        let team = builder.moderation_button(None, "Team of carol@example.com", ButtonStyle::Default, "Moderate Responses");
        assert_eq!(team.giver_identifier, "carol@example.com");
    }

    #[test]
    fn pictures_only_for_email_identifiers() {
        let bundle = bundle_with(Vec::new());
        let privileges = InstructorPrivileges::co_owner();
        let config = RenderConfig::default();
        let builder = RowBuilder::new(
            &bundle,
            ViewMode::Question.strategy(),
            &privileges,
            &config,
            &SectionFilter::All,
        );
        assert_eq!(
            builder.profile_picture_link("alice@example.com").as_deref(),
            Some("/page/studentProfilePic?studentemail=alice@example.com&courseid=CS2103")
        );
        assert_eq!(builder.profile_picture_link("T1"), None);
    }
}
