//! Indexed, read-only view over one session's results.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use uuid::Uuid;

use crate::assembler::{participant_team, RosterLookup};
use crate::error::RenderError;
use crate::models::{
    FeedbackSession, Instructor, ParticipantType, Primary, Question, Response, ResultsData,
    Student, DEFAULT_SECTION, GENERAL_RECIPIENT, GENERAL_RECIPIENT_DISPLAY_NAME,
    TEAM_OF_EMAIL_OWNER, USER_TEAM_FOR_INSTRUCTOR,
};
use crate::tracker::CanonicalName;

/// Responses to one question, in display order.
#[derive(Debug, Clone)]
pub struct QuestionResponses<'a> {
    pub question: &'a Question,
    pub responses: Vec<&'a Response>,
}

/// All responses given (or received) by one participant, grouped by question.
#[derive(Debug, Clone)]
pub struct ParticipantEntry<'a> {
    pub identifier: String,
    pub questions: Vec<QuestionResponses<'a>>,
}

impl<'a> ParticipantEntry<'a> {
    /// Section recorded on the first response of the first non-empty question.
    pub fn section(&self, primary: Primary) -> Option<&'a str> {
        self.questions
            .iter()
            .find_map(|group| group.responses.first().copied())
            .map(|response: &'a Response| response.section_of(primary))
    }

    pub fn response_count(&self) -> usize {
        self.questions.iter().map(|group| group.responses.len()).sum()
    }
}

#[derive(Debug, Clone)]
pub struct ResultsBundle {
    pub session: FeedbackSession,
    pub questions: Vec<Question>,
    pub responses: Vec<Response>,
    pub is_complete: bool,
    students: Vec<Student>,
    instructors: Vec<Instructor>,
    hidden_givers: BTreeSet<Uuid>,
    hidden_recipients: BTreeSet<Uuid>,
    student_index: HashMap<String, usize>,
    instructor_index: HashMap<String, usize>,
    question_index: HashMap<String, usize>,
    team_members: BTreeMap<String, BTreeSet<String>>,
    section_teams: BTreeMap<String, BTreeSet<String>>,
}

impl ResultsBundle {
    pub fn new(data: ResultsData) -> Result<Self, RenderError> {
        let mut questions = data.questions;
        questions.sort_by(|a, b| a.number.cmp(&b.number).then_with(|| a.id.cmp(&b.id)));

        let mut question_index = HashMap::new();
        for (index, question) in questions.iter().enumerate() {
            if question_index.insert(question.id.clone(), index).is_some() {
                return Err(RenderError::DuplicateQuestion(question.id.clone()));
            }
        }

        for response in &data.responses {
            if !question_index.contains_key(&response.question_id) {
                return Err(RenderError::UnknownQuestion {
                    response: response.id,
                    question: response.question_id.clone(),
                });
            }
        }

        let students = data.roster.students;
        let instructors = data.roster.instructors;

        let mut student_index = HashMap::new();
        let mut team_members: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut section_teams: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (index, student) in students.iter().enumerate() {
            student_index.insert(student.email.clone(), index);
            team_members
                .entry(student.team.clone())
                .or_default()
                .insert(student.email.clone());
            section_teams
                .entry(student.section.clone())
                .or_default()
                .insert(student.team.clone());
        }

        let mut instructor_index = HashMap::new();
        for (index, instructor) in instructors.iter().enumerate() {
            instructor_index.insert(instructor.email.clone(), index);
            team_members
                .entry(USER_TEAM_FOR_INSTRUCTOR.to_string())
                .or_default()
                .insert(instructor.email.clone());
        }

        Ok(Self {
            session: data.session,
            questions,
            responses: data.responses,
            is_complete: data.is_complete,
            students,
            instructors,
            hidden_givers: data.hidden_givers,
            hidden_recipients: data.hidden_recipients,
            student_index,
            instructor_index,
            question_index,
            team_members,
            section_teams,
        })
    }

    fn student(&self, identifier: &str) -> Option<&Student> {
        self.student_index
            .get(identifier)
            .map(|&index| &self.students[index])
    }

    fn instructor(&self, identifier: &str) -> Option<&Instructor> {
        self.instructor_index
            .get(identifier)
            .map(|&index| &self.instructors[index])
    }

    pub fn is_student(&self, identifier: &str) -> bool {
        self.student_index.contains_key(identifier)
    }

    pub fn is_team(&self, identifier: &str) -> bool {
        identifier != USER_TEAM_FOR_INSTRUCTOR && self.team_members.contains_key(identifier)
    }

    pub fn is_giver_visible(&self, response: &Response) -> bool {
        !self.hidden_givers.contains(&response.id)
    }

    pub fn is_recipient_visible(&self, response: &Response) -> bool {
        !self.hidden_recipients.contains(&response.id)
    }

    /// Roster team of a student, empty when the identifier has none.
    pub fn team_of(&self, identifier: &str) -> String {
        if let Some(student) = self.student(identifier) {
            student.team.clone()
        } else if self.is_instructor(identifier) {
            USER_TEAM_FOR_INSTRUCTOR.to_string()
        } else if self.is_team(identifier) {
            identifier.to_string()
        } else {
            String::new()
        }
    }

    pub fn section_of(&self, identifier: &str) -> String {
        if let Some(student) = self.student(identifier) {
            return student.section.clone();
        }
        let team = identifier.strip_prefix(TEAM_OF_EMAIL_OWNER).unwrap_or(identifier);
        self.section_teams
            .iter()
            .find(|(_, teams)| teams.contains(team))
            .map(|(section, _)| section.clone())
            .unwrap_or_else(|| DEFAULT_SECTION.to_string())
    }

    pub fn display_name_of(&self, identifier: &str) -> String {
        if let Some(student) = self.student(identifier) {
            student.name.clone()
        } else if let Some(instructor) = self.instructor(identifier) {
            instructor.name.clone()
        } else if identifier == GENERAL_RECIPIENT {
            GENERAL_RECIPIENT_DISPLAY_NAME.to_string()
        } else {
            identifier.to_string()
        }
    }

    pub fn giver_name_for(&self, question: &Question, response: &Response) -> String {
        if self.is_giver_visible(response) {
            self.display_name_of(&response.giver)
        } else {
            anonymous_name(question.giver_type)
        }
    }

    pub fn recipient_name_for(&self, question: &Question, response: &Response) -> String {
        if self.is_recipient_visible(response) {
            self.display_name_of(&response.recipient)
        } else {
            anonymous_name(question.recipient_type)
        }
    }

    /// Every question with its responses, in question-number order.
    pub fn question_response_map(&self) -> Vec<QuestionResponses<'_>> {
        self.questions
            .iter()
            .map(|question| {
                let mut responses: Vec<&Response> = self
                    .responses
                    .iter()
                    .filter(|r| r.question_id == question.id)
                    .collect();
                responses.sort_by(|a, b| {
                    self.participant_order(&a.giver, &b.giver)
                        .then_with(|| self.participant_order(&a.recipient, &b.recipient))
                });
                QuestionResponses { question, responses }
            })
            .collect()
    }

    /// Responses grouped by giver or recipient, sorted so that participants
    /// sharing a section and team are contiguous.
    pub fn responses_grouped_by(&self, primary: Primary) -> Vec<ParticipantEntry<'_>> {
        let secondary = match primary {
            Primary::Giver => Primary::Recipient,
            Primary::Recipient => Primary::Giver,
        };

        let mut keyed: Vec<(String, &Response)> =
            self.grouping_keys(primary).into_iter().zip(&self.responses).collect();
        keyed.sort_by(|(key_a, a), (key_b, b)| {
            a.section_of(primary)
                .cmp(b.section_of(primary))
                .then_with(|| self.participant_order(key_a, key_b))
                .then_with(|| self.question_number(a).cmp(&self.question_number(b)))
                .then_with(|| {
                    self.participant_order(a.participant(secondary), b.participant(secondary))
                })
        });

        let mut entries: Vec<ParticipantEntry<'_>> = Vec::new();
        for (identifier, response) in keyed {
            let starts_entry = entries
                .last()
                .map_or(true, |entry| entry.identifier != identifier);
            if starts_entry {
                entries.push(ParticipantEntry {
                    identifier,
                    questions: Vec::new(),
                });
            }
            let Some(entry) = entries.last_mut() else {
                continue;
            };
            push_response(&mut entry.questions, self.question_for(response), response);
        }
        entries
    }

    /// Responses grouped by the team of the giver (or recipient).
    pub fn responses_grouped_by_team(
        &self,
        primary: Primary,
    ) -> HashMap<String, Vec<QuestionResponses<'_>>> {
        let mut grouped: HashMap<String, Vec<QuestionResponses<'_>>> = HashMap::new();
        for (key, response) in self.grouping_keys(primary).iter().zip(&self.responses) {
            let team = participant_team(self, key);
            let groups = grouped.entry(team).or_default();
            push_response(groups, self.question_for(response), response);
        }
        for groups in grouped.values_mut() {
            groups.sort_by_key(|group| group.question.number);
        }
        grouped
    }

    /// Identifier each response is grouped under on the `primary` side, in
    /// response order. A participant hidden by a response is keyed as
    /// "Anonymous student 1" and so on, numbered by first appearance. The key
    /// has no roster team or section, so panels and back-fill stay anonymous.
    fn grouping_keys(&self, primary: Primary) -> Vec<String> {
        let mut anonymous: HashMap<&str, String> = HashMap::new();
        let mut keys = Vec::with_capacity(self.responses.len());
        for response in &self.responses {
            let identifier = response.participant(primary);
            let visible = match primary {
                Primary::Giver => self.is_giver_visible(response),
                Primary::Recipient => self.is_recipient_visible(response),
            };
            if visible {
                keys.push(identifier.to_string());
                continue;
            }
            let next = anonymous.len() + 1;
            let question = self.question_for(response);
            let kind = match primary {
                Primary::Giver => question.giver_type,
                Primary::Recipient => question.recipient_type,
            };
            let key = anonymous
                .entry(identifier)
                .or_insert_with(|| format!("{} {next}", anonymous_name(kind)));
            keys.push(key.clone());
        }
        keys
    }

    pub fn possible_givers(&self, question: &Question) -> Vec<String> {
        let mut givers: Vec<String> = match question.giver_type {
            ParticipantType::Myself => vec![self.session.creator_email.clone()],
            ParticipantType::Students => self.students.iter().map(|s| s.email.clone()).collect(),
            ParticipantType::Instructors => {
                self.instructors.iter().map(|i| i.email.clone()).collect()
            }
            ParticipantType::Teams => self.student_teams(),
            _ => Vec::new(),
        };
        givers.sort();
        givers.dedup();
        givers
    }

    /// Givers that could have responded to `recipient`.
    pub fn possible_givers_for(&self, question: &Question, recipient: &str) -> Vec<String> {
        let target = if question.recipient_type.is_team() {
            self.canonical_name(recipient)
        } else {
            recipient.to_string()
        };
        self.possible_givers(question)
            .into_iter()
            .filter(|giver| self.possible_recipients(question, giver).contains(&target))
            .collect()
    }

    pub fn possible_recipients(&self, question: &Question, giver: &str) -> Vec<String> {
        let giver_team = self.giver_team(giver);
        let mut recipients: Vec<String> = match question.recipient_type {
            ParticipantType::Myself => vec![giver.to_string()],
            ParticipantType::Students => self.students.iter().map(|s| s.email.clone()).collect(),
            ParticipantType::Instructors => {
                self.instructors.iter().map(|i| i.email.clone()).collect()
            }
            ParticipantType::Teams => self
                .student_teams()
                .into_iter()
                .filter(|team| Some(team) != giver_team.as_ref())
                .collect(),
            ParticipantType::OwnTeam => giver_team.into_iter().collect(),
            ParticipantType::OwnTeamMembers => giver_team
                .map(|team| self.roster_members_of_team(&team))
                .unwrap_or_default()
                .into_iter()
                .filter(|member| member != giver)
                .collect(),
            ParticipantType::OwnTeamMembersIncludingSelf => giver_team
                .map(|team| self.roster_members_of_team(&team))
                .unwrap_or_default()
                .into_iter()
                .collect(),
            ParticipantType::None => vec![GENERAL_RECIPIENT.to_string()],
        };
        recipients.sort();
        recipients.dedup();
        recipients
    }

    pub fn roster_teams_in_section(&self, section: &str) -> BTreeSet<String> {
        self.section_teams.get(section).cloned().unwrap_or_default()
    }

    pub fn roster_members_of_team(&self, team: &str) -> BTreeSet<String> {
        self.team_members.get(team).cloned().unwrap_or_default()
    }

    pub fn all_roster_sections(&self) -> BTreeSet<String> {
        self.section_teams.keys().cloned().collect()
    }

    /// Copy of the bundle keeping only responses that belong to `section`:
    /// on the primary side for grouped views, on either side otherwise.
    pub fn restricted_to_section(&self, section: &str, primary: Option<Primary>) -> Self {
        let mut restricted = self.clone();
        restricted.responses.retain(|r| match primary {
            Some(primary) => r.section_of(primary) == section,
            None => r.giver_section == section || r.recipient_section == section,
        });
        restricted
    }

    fn student_teams(&self) -> Vec<String> {
        self.team_members
            .keys()
            .filter(|team| team.as_str() != USER_TEAM_FOR_INSTRUCTOR)
            .cloned()
            .collect()
    }

    fn giver_team(&self, giver: &str) -> Option<String> {
        let team = self.canonical_name(giver);
        self.is_team(&team).then_some(team)
    }

    fn question_for(&self, response: &Response) -> &Question {
        // Every response was checked against the question index in `new`.
        &self.questions[self.question_index[&response.question_id]]
    }

    fn question_number(&self, response: &Response) -> u32 {
        self.question_for(response).number
    }

    fn participant_order(&self, a: &str, b: &str) -> Ordering {
        participant_team(self, a)
            .cmp(&participant_team(self, b))
            .then_with(|| self.display_name_of(a).cmp(&self.display_name_of(b)))
            .then_with(|| a.cmp(b))
    }
}

impl CanonicalName for ResultsBundle {
    /// Team-type participants may be named by the team, by the email of a
    /// member, or as "Team of <email>"; all resolve to the team name.
    fn canonical_name(&self, identifier: &str) -> String {
        let owner = identifier.strip_prefix(TEAM_OF_EMAIL_OWNER).unwrap_or(identifier);
        match self.student(owner) {
            Some(student) => student.team.clone(),
            None => owner.to_string(),
        }
    }
}

impl RosterLookup for ResultsBundle {
    fn is_instructor(&self, identifier: &str) -> bool {
        self.instructor_index.contains_key(identifier)
    }

    fn roster_team_of(&self, identifier: &str) -> Option<String> {
        self.student(identifier).map(|student| student.team.clone())
    }

    fn display_name_of(&self, identifier: &str) -> String {
        ResultsBundle::display_name_of(self, identifier)
    }

    fn teams_in_section(&self, section: &str) -> BTreeSet<String> {
        self.roster_teams_in_section(section)
    }

    fn members_of_team(&self, team: &str) -> BTreeSet<String> {
        self.roster_members_of_team(team)
    }

    fn sections(&self) -> BTreeSet<String> {
        self.all_roster_sections()
    }
}

fn push_response<'a>(
    groups: &mut Vec<QuestionResponses<'a>>,
    question: &'a Question,
    response: &'a Response,
) {
    match groups.iter_mut().find(|group| group.question.id == question.id) {
        Some(group) => group.responses.push(response),
        None => groups.push(QuestionResponses {
            question,
            responses: vec![response],
        }),
    }
}

fn anonymous_name(kind: ParticipantType) -> String {
    let noun = match kind {
        ParticipantType::Teams | ParticipantType::OwnTeam => "team",
        ParticipantType::Instructors => "instructor",
        _ => "student",
    };
    format!("Anonymous {noun}")
}

#[cfg(test)]
impl ResultsBundle {
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.question_index.get(id).map(|&index| &self.questions[index])
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::Roster;
    use crate::questions::QuestionKind;

    pub fn student(email: &str, name: &str, team: &str, section: &str) -> Student {
        Student {
            email: email.to_string(),
            name: name.to_string(),
            team: team.to_string(),
            section: section.to_string(),
        }
    }

    pub fn question(id: &str, number: u32, giver: ParticipantType, recipient: ParticipantType) -> Question {
        Question {
            id: id.to_string(),
            number,
            text: format!("Question {number}"),
            giver_type: giver,
            recipient_type: recipient,
            details: QuestionKind::Text,
        }
    }

    pub fn response(bundle_students: &[Student], question: &str, giver: &str, recipient: &str, answer: &str) -> Response {
        let section = |id: &str| {
            bundle_students
                .iter()
                .find(|s| s.email == id)
                .map(|s| s.section.clone())
                .unwrap_or_else(|| DEFAULT_SECTION.to_string())
        };
        Response {
            id: Uuid::new_v4(),
            question_id: question.to_string(),
            giver: giver.to_string(),
            recipient: recipient.to_string(),
            giver_section: section(giver),
            recipient_section: section(recipient),
            answer: answer.to_string(),
        }
    }

    pub fn session() -> FeedbackSession {
        let start = NaiveDate::from_ymd_opt(2026, 3, 1)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .expect("valid start");
        let end = NaiveDate::from_ymd_opt(2026, 3, 8)
            .and_then(|d| d.and_hms_opt(23, 59, 0))
            .expect("valid end");
        FeedbackSession {
            course_id: "CS2103".to_string(),
            name: "Peer Review 1".to_string(),
            creator_email: "prof@example.com".to_string(),
            start_time: start,
            end_time: end,
            published: false,
        }
    }

    pub fn data(
        students: Vec<Student>,
        questions: Vec<Question>,
        responses: Vec<Response>,
    ) -> ResultsData {
        ResultsData {
            session: session(),
            questions,
            responses,
            roster: Roster {
                students,
                instructors: vec![Instructor {
                    email: "prof@example.com".to_string(),
                    name: "Prof Tan".to_string(),
                }],
            },
            is_complete: true,
            hidden_givers: BTreeSet::new(),
            hidden_recipients: BTreeSet::new(),
        }
    }

    /// Two sections: A holds T1 {alice, bob}, B holds T2 {carol, dan}.
    pub fn two_section_students() -> Vec<Student> {
        vec![
            student("alice@example.com", "Alice", "T1", "A"),
            student("bob@example.com", "Bob", "T1", "A"),
            student("carol@example.com", "Carol", "T2", "B"),
            student("dan@example.com", "Dan", "T2", "B"),
        ]
    }
}
