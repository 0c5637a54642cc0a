use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::questions::QuestionKind;

/// Section key for participants that are not in any section.
pub const DEFAULT_SECTION: &str = "None";
pub const DISPLAY_NAME_FOR_DEFAULT_SECTION: &str = "Not in a section";
/// Team every instructor is placed in.
pub const USER_TEAM_FOR_INSTRUCTOR: &str = "Instructors";
/// Recipient identifier of questions that are not about anyone in particular.
pub const GENERAL_RECIPIENT: &str = "%GENERAL%";
pub const GENERAL_RECIPIENT_DISPLAY_NAME: &str = "-";
/// Prefix used when a team response is shown against the submitting student.
pub const TEAM_OF_EMAIL_OWNER: &str = "Team of ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantType {
    /// The session creator as giver, the giver themselves as recipient.
    #[serde(rename = "SELF")]
    Myself,
    Students,
    Instructors,
    Teams,
    OwnTeam,
    OwnTeamMembers,
    OwnTeamMembersIncludingSelf,
    None,
}

impl ParticipantType {
    pub fn is_team(self) -> bool {
        matches!(self, ParticipantType::Teams | ParticipantType::OwnTeam)
    }
}

/// Which side of a response a grouped view is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Primary {
    Giver,
    Recipient,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub number: u32,
    pub text: String,
    pub giver_type: ParticipantType,
    pub recipient_type: ParticipantType,
    pub details: QuestionKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub question_id: String,
    pub giver: String,
    pub recipient: String,
    #[serde(default = "default_section")]
    pub giver_section: String,
    #[serde(default = "default_section")]
    pub recipient_section: String,
    pub answer: String,
}

impl Response {
    pub fn section_of(&self, primary: Primary) -> &str {
        match primary {
            Primary::Giver => &self.giver_section,
            Primary::Recipient => &self.recipient_section,
        }
    }

    pub fn participant(&self, primary: Primary) -> &str {
        match primary {
            Primary::Giver => &self.giver,
            Primary::Recipient => &self.recipient,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub email: String,
    pub name: String,
    pub team: String,
    #[serde(default = "default_section")]
    pub section: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instructor {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub instructors: Vec<Instructor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackSession {
    pub course_id: String,
    pub name: String,
    pub creator_email: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    #[serde(default)]
    pub published: bool,
}

/// Materialized results as they arrive from upstream, before indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsData {
    pub session: FeedbackSession,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub responses: Vec<Response>,
    #[serde(default)]
    pub roster: Roster,
    #[serde(default = "complete")]
    pub is_complete: bool,
    /// Responses whose giver the viewing instructor may not see.
    #[serde(default)]
    pub hidden_givers: BTreeSet<Uuid>,
    /// Responses whose recipient the viewing instructor may not see.
    #[serde(default)]
    pub hidden_recipients: BTreeSet<Uuid>,
}

pub fn default_section() -> String {
    DEFAULT_SECTION.to_string()
}

fn complete() -> bool {
    true
}
